use super::RenderError;

/// Hardware texture-unit limit the quad pipeline is built for.
pub const MAX_TEX_UNITS: usize = 16;

/// Largest slot count whose vertex indices still fit in `u16`.
pub const MAX_BATCH_SLOTS: usize = (u16::MAX as usize + 1) / 4;

/// Renderer capacities and garbage-collection policy.
///
/// Every limit is fixed for the renderer's lifetime; exceeding one during a
/// frame is reported as a capacity error rather than growing the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Number of reusable quad batches.
    pub batch_limit: usize,
    /// Quads per batch.
    pub batch_slot_limit: usize,
    /// Submission phases a batch may sit unused before its GPU resources are freed.
    pub batch_life_max: u32,
    /// Distinct textures one batch may reference.
    pub tex_unit_limit: usize,
    /// Instructions recordable per submission phase.
    pub instruction_limit: usize,
    /// Off-screen surfaces alive at once; also bounds surface nesting depth.
    pub surface_limit: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            batch_limit: 32,
            batch_slot_limit: 4096,
            batch_life_max: 60,
            tex_unit_limit: MAX_TEX_UNITS,
            instruction_limit: 2048,
            surface_limit: 32,
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        let invalid = |msg: String| Err(RenderError::InvalidConfig(msg));

        if self.batch_limit == 0 {
            return invalid("batch_limit must be at least 1".into());
        }
        if self.batch_slot_limit == 0 || self.batch_slot_limit > MAX_BATCH_SLOTS {
            return invalid(format!("batch_slot_limit must be in 1..={MAX_BATCH_SLOTS}"));
        }
        if self.batch_life_max == 0 {
            return invalid("batch_life_max must be at least 1".into());
        }
        if self.tex_unit_limit == 0 || self.tex_unit_limit > MAX_TEX_UNITS {
            return invalid(format!("tex_unit_limit must be in 1..={MAX_TEX_UNITS}"));
        }
        if self.instruction_limit == 0 {
            return invalid("instruction_limit must be at least 1".into());
        }
        Ok(())
    }
}
