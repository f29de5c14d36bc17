//! Tessera engine crate.
//!
//! A batched 2D renderer (quads, text, off-screen surfaces) plus the
//! platform and GPU runtime pieces needed to drive it from a window.

pub mod device;
pub mod window;

pub mod assets;
pub mod coords;
pub mod logging;
pub mod render;
pub mod text;
