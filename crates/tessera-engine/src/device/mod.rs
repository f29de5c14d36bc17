//! GPU device + swapchain management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the window surface (swapchain)
//! - acquiring and presenting swapchain images
//!
//! Command recording belongs to [`crate::render::WgpuBackend`].

mod gpu;
mod init;
mod swapchain;

pub use gpu::Gpu;
pub use swapchain::{GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
