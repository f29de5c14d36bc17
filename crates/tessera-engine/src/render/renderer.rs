use crate::assets::{Assets, ShaderProgramHandle, TextureHandle};
use crate::coords::{ColorRgba, Mat4, RectI, Vec2};
use crate::text::{FontArrangement, HorAlign, TextLayout, VerAlign};
use crate::window::DrawableSize;

use super::batch::{quad_indices, Batch, BatchFull, QuadParams};
use super::instr::InstructionStream;
use super::surface::SurfaceTable;
use super::{
    BatchDraw, GpuBackend, Instruction, RenderError, RendererConfig, StateInstruction, SurfaceId,
    UniformValue,
};

/// A textured quad request: a region of an asset texture drawn at `pos`.
///
/// `origin` is the normalised pivot inside the quad (0,0 = top-left,
/// 0.5,0.5 = centre); rotation and scale are applied around it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TexturedQuad {
    pub texture: usize,
    pub pos: Vec2,
    pub src_rect: RectI,
    pub origin: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub alpha: f32,
}

impl TexturedQuad {
    /// Unrotated, unscaled, opaque quad pivoting on its top-left corner.
    pub fn new(texture: usize, pos: Vec2, src_rect: RectI) -> Self {
        Self {
            texture,
            pos,
            src_rect,
            origin: Vec2::zero(),
            rotation: 0.0,
            scale: Vec2::one(),
            alpha: 1.0,
        }
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Ready,
    Submitting,
}

/// Batched 2D renderer.
///
/// Each frame runs `begin_submission`, any number of `submit_*` calls,
/// `end_submission`, then `render`. Calling an operation in the wrong phase
/// is a programming error and panics.
///
/// The renderer owns every batch and surface resource; the backend is
/// passed in per call and only borrowed for its duration.
pub struct Renderer<B: GpuBackend> {
    config: RendererConfig,
    phase: Phase,

    batches: Vec<Batch<B::Batch>>,
    cursor: usize,
    indices: Vec<u16>,

    instrs: InstructionStream,
    surfaces: SurfaceTable<B::Surface>,

    // Submission-side validation state.
    surface_depth: usize,
    program_selected: bool,
}

impl<B: GpuBackend> Renderer<B> {
    pub fn new(config: RendererConfig) -> Result<Self, RenderError> {
        config.validate()?;

        let batches = (0..config.batch_limit)
            .map(|_| Batch::new(config.batch_slot_limit, config.tex_unit_limit))
            .collect();

        log::debug!(
            "renderer: {} batches x {} slots, {} texture units, {} instructions, {} surfaces",
            config.batch_limit,
            config.batch_slot_limit,
            config.tex_unit_limit,
            config.instruction_limit,
            config.surface_limit
        );

        Ok(Self {
            indices: quad_indices(config.batch_slot_limit),
            instrs: InstructionStream::new(config.instruction_limit),
            surfaces: SurfaceTable::new(config.surface_limit),
            batches,
            cursor: 0,
            phase: Phase::Ready,
            surface_depth: 0,
            program_selected: false,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Instructions recorded by the current or most recent submission phase.
    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        self.instrs.as_slice()
    }

    /// Batches currently holding GPU resources.
    pub fn live_batch_count(&self) -> usize {
        self.batches.iter().filter(|b| b.gpu.is_some()).count()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    fn assert_phase(&self, expected: Phase, op: &str) {
        assert!(
            self.phase == expected,
            "Renderer::{op} called in {:?} phase (expected {:?})",
            self.phase,
            expected
        );
    }

    // ── submission ────────────────────────────────────────────────────────

    pub fn begin_submission(&mut self) {
        self.assert_phase(Phase::Ready, "begin_submission");

        for batch in &mut self.batches[..=self.cursor] {
            batch.clear_transient();
        }
        self.cursor = 0;
        self.instrs.clear();
        self.surface_depth = 0;
        self.program_selected = false;

        self.phase = Phase::Submitting;
    }

    /// Queues one textured quad.
    ///
    /// On error nothing of the quad is recorded.
    pub fn submit_quad(&mut self, assets: &impl Assets, quad: &TexturedQuad) -> Result<(), RenderError> {
        self.assert_phase(Phase::Submitting, "submit_quad");

        let tex_size = assets
            .texture_size(quad.texture)
            .ok_or(RenderError::UnknownTexture(quad.texture))?;
        let handle = assets
            .texture_handle(quad.texture)
            .ok_or(RenderError::UnknownTexture(quad.texture))?;

        let params = QuadParams {
            pos: quad.pos,
            size: quad.src_rect.size(),
            origin: quad.origin,
            scale: quad.scale,
            rot: quad.rotation,
            tex_coords: quad.src_rect.to_tex_coords(tex_size),
            alpha: quad.alpha,
        };
        self.submit_to_batch(handle, &params)
    }

    /// Lays out `text` with the font at `font` and queues one quad per
    /// visible character.
    ///
    /// `scratch` is reused between calls to avoid reallocating layout
    /// buffers. If a quad fails, the characters before it stay queued.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_string(
        &mut self,
        assets: &impl Assets,
        text: &str,
        font: usize,
        pos: Vec2,
        scratch: &mut TextLayout,
        hor_align: HorAlign,
        ver_align: VerAlign,
    ) -> Result<(), RenderError> {
        self.assert_phase(Phase::Submitting, "submit_string");

        let arrangement = assets.font_arrangement(font).ok_or(RenderError::UnknownFont(font))?;
        let handle = assets.font_texture_handle(font).ok_or(RenderError::UnknownFont(font))?;
        let tex_size = assets.font_texture_size(font).ok_or(RenderError::UnknownFont(font))?;

        scratch.layout(text, arrangement)?;

        let mut line = 0;
        for (i, c) in text.chars().enumerate() {
            match c {
                '\n' => {
                    line += 1;
                    continue;
                }
                ' ' => continue,
                _ => {}
            }
            let Some(glyph) = FontArrangement::glyph_index(c) else { continue };
            let src_rect = arrangement.glyph(glyph).src_rect;

            let params = QuadParams {
                pos: scratch.aligned_position(pos, i, line, hor_align, ver_align),
                size: src_rect.size(),
                origin: Vec2::zero(),
                scale: Vec2::one(),
                rot: 0.0,
                tex_coords: src_rect.to_tex_coords(tex_size),
                alpha: 1.0,
            };
            self.submit_to_batch(handle, &params)?;
        }
        Ok(())
    }

    /// Records a state change.
    ///
    /// If the current batch already holds quads, it is closed first so that
    /// the change applies between batches, never inside one.
    pub fn submit_state_instruction(&mut self, instr: StateInstruction) -> Result<(), RenderError> {
        self.assert_phase(Phase::Submitting, "submit_state_instruction");
        self.validate_state_instruction(&instr)?;

        if self.instrs.is_full() {
            return Err(RenderError::InstructionStreamFull { limit: self.config.instruction_limit });
        }
        if !self.batches[self.cursor].is_empty() {
            self.advance_batch()?;
        }

        match &instr {
            StateInstruction::SetSurface(_) => self.surface_depth += 1,
            StateInstruction::UnsetSurface => self.surface_depth -= 1,
            StateInstruction::SetSurfaceShaderProgram(_) => self.program_selected = true,
            StateInstruction::DrawSurface(_) => self.program_selected = false,
            _ => {}
        }

        self.instrs.push(instr.into())
    }

    fn validate_state_instruction(&self, instr: &StateInstruction) -> Result<(), RenderError> {
        match instr {
            StateInstruction::SetSurface(id) => {
                if !self.surfaces.contains(*id) {
                    return Err(RenderError::StaleSurface(*id));
                }
                if self.surface_depth >= self.surfaces.limit() {
                    return Err(RenderError::SurfaceStackOverflow { limit: self.surfaces.limit() });
                }
            }
            StateInstruction::UnsetSurface => {
                if self.surface_depth == 0 {
                    return Err(RenderError::SurfaceStackUnderflow);
                }
            }
            StateInstruction::SetSurfaceShaderUniform { .. } => {
                if !self.program_selected {
                    return Err(RenderError::SurfaceProgramUnset);
                }
            }
            StateInstruction::DrawSurface(id) => {
                if !self.program_selected {
                    return Err(RenderError::SurfaceProgramUnset);
                }
                if !self.surfaces.contains(*id) {
                    return Err(RenderError::StaleSurface(*id));
                }
            }
            StateInstruction::Clear(_)
            | StateInstruction::SetViewMatrix(_)
            | StateInstruction::SetSurfaceShaderProgram(_) => {}
        }
        Ok(())
    }

    pub fn clear(&mut self, color: ColorRgba) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::Clear(color))
    }

    pub fn set_view_matrix(&mut self, view: Mat4) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::SetViewMatrix(view))
    }

    /// Directs following draws at `surface` until the matching [`Self::pop_surface`].
    pub fn push_surface(&mut self, surface: SurfaceId) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::SetSurface(surface))
    }

    pub fn pop_surface(&mut self) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::UnsetSurface)
    }

    /// Selects the surface program (asset index) for the next [`Self::draw_surface`].
    pub fn set_surface_shader_program(&mut self, program: usize) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::SetSurfaceShaderProgram(program))
    }

    pub fn set_surface_shader_uniform(
        &mut self,
        name: impl Into<String>,
        value: UniformValue,
    ) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::SetSurfaceShaderUniform {
            name: name.into(),
            value,
        })
    }

    /// Draws `surface` full-screen through the selected program, then
    /// deselects the program.
    pub fn draw_surface(&mut self, surface: SurfaceId) -> Result<(), RenderError> {
        self.submit_state_instruction(StateInstruction::DrawSurface(surface))
    }

    fn submit_to_batch(&mut self, texture: TextureHandle, quad: &QuadParams) -> Result<(), RenderError> {
        // An empty batch accepts any quad, so one advance is enough in
        // practice; the bound keeps a full pool from looping.
        for _ in 0..self.batches.len() {
            let batch = &mut self.batches[self.cursor];
            match batch.push_quad(texture, quad) {
                Ok(()) => {
                    if batch.slots_used() == 1 {
                        if let Err(err) = self.instrs.push(Instruction::DrawBatch(self.cursor)) {
                            // First quad of the batch; dropping it empties the batch again.
                            self.batches[self.cursor].clear_transient();
                            return Err(err);
                        }
                    }
                    return Ok(());
                }
                Err(full) => {
                    log::trace!("batch {} full ({full:?}), moving on", self.cursor);
                    self.advance_batch()?;
                }
            }
        }
        Err(RenderError::BatchPoolExhausted { limit: self.config.batch_limit })
    }

    fn advance_batch(&mut self) -> Result<(), RenderError> {
        if self.cursor + 1 >= self.batches.len() {
            return Err(RenderError::BatchPoolExhausted { limit: self.config.batch_limit });
        }
        self.cursor += 1;
        debug_assert!(self.batches[self.cursor].is_empty());
        Ok(())
    }

    /// Uploads this frame's batches and ages out the unused ones.
    ///
    /// The phase always returns to Ready. A backend failure leaves the
    /// affected batch without resources (it is skipped at render) and is
    /// reported after every other batch has been processed.
    pub fn end_submission(&mut self, gpu: &mut B) -> Result<(), RenderError> {
        self.assert_phase(Phase::Submitting, "end_submission");
        self.phase = Phase::Ready;

        if self.surface_depth != 0 {
            log::warn!("submission ended with {} surface(s) still set", self.surface_depth);
        }

        let life_max = self.config.batch_life_max;
        let mut result = Ok(());

        for (index, batch) in self.batches.iter_mut().enumerate() {
            if index <= self.cursor {
                match &batch.gpu {
                    Some(res) => {
                        if !batch.is_empty() {
                            gpu.upload_vertices(res, bytemuck::cast_slice(batch.used_vertices()));
                        }
                    }
                    None => match gpu.create_batch(bytemuck::cast_slice(batch.all_vertices()), &self.indices) {
                        Ok(res) => {
                            log::debug!("batch {index}: gpu resources created");
                            batch.gpu = Some(res);
                        }
                        Err(err) => {
                            log::error!("batch {index}: {err}");
                            if result.is_ok() {
                                result = Err(err.into());
                            }
                            continue;
                        }
                    },
                }
                batch.life = life_max;
            } else if batch.life > 0 {
                batch.life -= 1;
                if batch.life == 0 {
                    if let Some(res) = batch.gpu.take() {
                        gpu.destroy_batch(res);
                        log::debug!("batch {index}: unused for {life_max} frames, released");
                    }
                }
            }
        }

        result
    }

    // ── render ────────────────────────────────────────────────────────────

    /// Replays the recorded instructions.
    ///
    /// The default target is bound and cleared to black first. Surface ids
    /// and program indices are checked before any GPU call, so an error
    /// leaves the frame untouched.
    pub fn render(
        &self,
        gpu: &mut B,
        assets: &impl Assets,
        window: &impl DrawableSize,
    ) -> Result<(), RenderError> {
        self.assert_phase(Phase::Ready, "render");
        self.validate_replay(assets)?;

        let size = window.drawable_size();
        let projection = Mat4::ortho(0.0, size.x as f32, size.y as f32, 0.0, -1.0, 1.0);
        let mut view = Mat4::IDENTITY;

        let mut stack: Vec<SurfaceId> = Vec::with_capacity(self.surfaces.limit());
        let mut program: Option<ShaderProgramHandle> = None;

        gpu.bind_target(None);
        gpu.clear(ColorRgba::black());

        for instr in self.instrs.as_slice() {
            match instr {
                Instruction::Clear(color) => gpu.clear(*color),

                Instruction::SetViewMatrix(m) => view = *m,

                Instruction::DrawBatch(index) => {
                    let batch = &self.batches[*index];
                    let Some(res) = batch.gpu.as_ref() else {
                        log::warn!("batch {index} has no gpu resources; skipped");
                        continue;
                    };
                    gpu.draw_batch(BatchDraw {
                        batch: res,
                        textures: batch.textures(),
                        quad_count: batch.slots_used(),
                        projection,
                        view,
                    });
                }

                Instruction::SetSurface(id) => {
                    stack.push(*id);
                    gpu.bind_target(self.surfaces.get(*id));
                }

                Instruction::UnsetSurface => {
                    stack.pop();
                    gpu.bind_target(stack.last().and_then(|id| self.surfaces.get(*id)));
                }

                Instruction::SetSurfaceShaderProgram(index) => program = assets.shader_program(*index),

                Instruction::SetSurfaceShaderUniform { name, value } => {
                    if let Some(program) = program {
                        gpu.set_surface_uniform(program, name, value);
                    }
                }

                Instruction::DrawSurface(id) => {
                    if let (Some(program), Some(surface)) = (program, self.surfaces.get(*id)) {
                        gpu.draw_surface(surface, program);
                    }
                    program = None;
                }
            }
        }

        // Unbalanced stack: leave the default target bound.
        if !stack.is_empty() {
            gpu.bind_target(None);
        }

        Ok(())
    }

    fn validate_replay(&self, assets: &impl Assets) -> Result<(), RenderError> {
        for instr in self.instrs.as_slice() {
            match instr {
                Instruction::SetSurface(id) | Instruction::DrawSurface(id) => {
                    if !self.surfaces.contains(*id) {
                        return Err(RenderError::StaleSurface(*id));
                    }
                }
                Instruction::SetSurfaceShaderProgram(index) => {
                    if assets.shader_program(*index).is_none() {
                        return Err(RenderError::UnknownShaderProgram(*index));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ── surfaces ──────────────────────────────────────────────────────────

    /// Creates an off-screen surface sized to the window.
    pub fn add_surface(&mut self, gpu: &mut B, window: &impl DrawableSize) -> Result<SurfaceId, RenderError> {
        self.assert_phase(Phase::Ready, "add_surface");
        if self.surfaces.is_full() {
            return Err(RenderError::SurfaceTableFull { limit: self.surfaces.limit() });
        }

        let size = window.drawable_size();
        let surface = gpu.create_surface(size)?;
        let id = self
            .surfaces
            .insert(surface)
            .ok_or(RenderError::SurfaceTableFull { limit: self.surfaces.limit() })?;

        log::debug!("surface {id:?} added ({}x{})", size.x, size.y);
        Ok(id)
    }

    pub fn remove_surface(&mut self, gpu: &mut B, id: SurfaceId) -> Result<(), RenderError> {
        self.assert_phase(Phase::Ready, "remove_surface");
        let surface = self.surfaces.remove(id).ok_or(RenderError::StaleSurface(id))?;
        gpu.destroy_surface(surface);
        log::debug!("surface {id:?} removed");
        Ok(())
    }

    /// Recreates every surface's backing texture at the window's size.
    ///
    /// A zero-area window (minimised) leaves the surfaces as they are.
    pub fn resize_surfaces(&mut self, gpu: &mut B, window: &impl DrawableSize) -> Result<(), RenderError> {
        self.assert_phase(Phase::Ready, "resize_surfaces");
        let size = window.drawable_size();
        if !size.is_positive() {
            log::debug!("resize_surfaces: ignoring {}x{}", size.x, size.y);
            return Ok(());
        }

        for surface in self.surfaces.iter_mut() {
            gpu.resize_surface(surface, size)?;
        }
        Ok(())
    }

    /// Releases every batch and surface resource.
    pub fn destroy(mut self, gpu: &mut B) {
        let mut released = 0;
        for batch in &mut self.batches {
            batch.life = 0;
            if let Some(res) = batch.gpu.take() {
                gpu.destroy_batch(res);
                released += 1;
            }
        }
        let surfaces = self.surfaces.drain();
        let surface_count = surfaces.len();
        for surface in surfaces {
            gpu.destroy_surface(surface);
        }
        log::debug!("renderer destroyed ({released} batches, {surface_count} surfaces)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRegistry;
    use crate::coords::Vec2I;
    use crate::render::testing::{Call, RecordingBackend};
    use crate::text::GlyphMetrics;

    const WINDOW: Vec2I = Vec2I::new(640, 480);

    fn config(batch_limit: usize, slot_limit: usize) -> RendererConfig {
        RendererConfig { batch_limit, batch_slot_limit: slot_limit, ..RendererConfig::default() }
    }

    fn assets_with_textures(n: u32) -> AssetRegistry {
        let mut assets = AssetRegistry::new();
        for i in 0..n {
            assets.add_texture(TextureHandle(100 + i), Vec2I::new(64, 64));
        }
        assets
    }

    fn quad(texture: usize) -> TexturedQuad {
        TexturedQuad::new(texture, Vec2::new(1.0, 2.0), RectI::new(0, 0, 16, 16))
    }

    fn renderer(cfg: RendererConfig) -> Renderer<RecordingBackend> {
        Renderer::new(cfg).unwrap()
    }

    fn total_quads(r: &Renderer<RecordingBackend>) -> usize {
        r.batches.iter().map(|b| b.slots_used()).sum()
    }

    #[test]
    fn rejects_invalid_config() {
        let result = Renderer::<RecordingBackend>::new(config(0, 16));
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn overflows_into_next_batch_then_exhausts_pool() {
        let assets = assets_with_textures(5);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(RendererConfig {
            batch_limit: 8,
            batch_slot_limit: 4096,
            tex_unit_limit: 16,
            ..RendererConfig::default()
        });

        r.begin_submission();
        for i in 0..4096 {
            r.submit_quad(&assets, &quad(i % 5)).unwrap();
        }
        assert_eq!(r.cursor, 0);

        r.submit_quad(&assets, &quad(4096 % 5)).unwrap();
        assert_eq!(r.cursor, 1);
        assert_eq!(r.batches[1].slots_used(), 1);

        for i in 4097..5000 {
            r.submit_quad(&assets, &quad(i % 5)).unwrap();
        }
        assert_eq!(total_quads(&r), 5000);

        let mut submitted = 5000;
        let err = loop {
            match r.submit_quad(&assets, &quad(submitted % 5)) {
                Ok(()) => submitted += 1,
                Err(err) => break err,
            }
        };
        assert_eq!(err, RenderError::BatchPoolExhausted { limit: 8 });
        assert!(err.is_capacity_exhaustion());
        assert_eq!(submitted, 8 * 4096);
        assert_eq!(total_quads(&r), submitted);

        r.end_submission(&mut gpu).unwrap();
        assert_eq!(r.live_batch_count(), 8);
    }

    #[test]
    fn texture_unit_limit_forces_rollover() {
        let assets = assets_with_textures(3);
        let mut r = renderer(RendererConfig { tex_unit_limit: 2, ..config(4, 64) });

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.submit_quad(&assets, &quad(1)).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();
        assert_eq!(r.cursor, 0);

        r.submit_quad(&assets, &quad(2)).unwrap();
        assert_eq!(r.cursor, 1);
        assert_eq!(r.batches[0].textures(), &[TextureHandle(100), TextureHandle(101)]);
        assert_eq!(r.batches[1].textures(), &[TextureHandle(102)]);
    }

    #[test]
    fn draw_batch_recorded_on_first_touch_only() {
        let assets = assets_with_textures(1);
        let mut r = renderer(config(4, 2));

        r.begin_submission();
        for _ in 0..5 {
            r.submit_quad(&assets, &quad(0)).unwrap();
        }
        assert_eq!(
            r.instructions(),
            &[Instruction::DrawBatch(0), Instruction::DrawBatch(1), Instruction::DrawBatch(2)]
        );
    }

    #[test]
    fn state_change_closes_pending_batch() {
        let assets = assets_with_textures(1);
        let mut r = renderer(config(4, 64));
        let view = Mat4::translation(Vec2::new(5.0, 0.0));

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.set_view_matrix(view).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();

        assert_eq!(
            r.instructions(),
            &[Instruction::DrawBatch(0), Instruction::SetViewMatrix(view), Instruction::DrawBatch(1)]
        );
        assert_eq!(r.batches[0].slots_used(), 1);
        assert_eq!(r.batches[1].slots_used(), 1);
    }

    #[test]
    fn state_change_on_empty_batch_keeps_cursor() {
        let assets = assets_with_textures(1);
        let mut r = renderer(config(4, 64));

        r.begin_submission();
        r.clear(ColorRgba::white()).unwrap();
        r.set_view_matrix(Mat4::IDENTITY).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();

        assert_eq!(r.cursor, 0);
        assert_eq!(r.instructions().last(), Some(&Instruction::DrawBatch(0)));
    }

    #[test]
    fn view_matrix_applies_to_following_batches() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));
        let view = Mat4::scale(Vec2::new(2.0, 2.0));

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.set_view_matrix(view).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.end_submission(&mut gpu).unwrap();
        gpu.take_calls();

        r.render(&mut gpu, &assets, &WINDOW).unwrap();
        let views: Vec<Mat4> = gpu
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawBatch { view, quads: 1, .. } => Some(*view),
                _ => None,
            })
            .collect();
        assert_eq!(views, vec![Mat4::IDENTITY, view]);
    }

    #[test]
    fn batch_released_after_life_max_idle_phases() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(RendererConfig { batch_life_max: 3, ..config(4, 1) });

        let frame = |r: &mut Renderer<RecordingBackend>, gpu: &mut RecordingBackend, quads: usize| {
            r.begin_submission();
            for _ in 0..quads {
                r.submit_quad(&assets, &quad(0)).unwrap();
            }
            r.end_submission(gpu).unwrap();
        };

        frame(&mut r, &mut gpu, 2);
        assert_eq!(r.batches[1].life, 3);
        assert_eq!(gpu.count(|c| matches!(c, Call::CreateBatch { .. })), 2);

        frame(&mut r, &mut gpu, 1);
        frame(&mut r, &mut gpu, 1);
        assert_eq!(r.batches[1].life, 1);
        assert!(r.batches[1].gpu.is_some());

        // Touched again before reaching zero: life resets, no new resources.
        frame(&mut r, &mut gpu, 2);
        assert_eq!(r.batches[1].life, 3);
        assert_eq!(gpu.count(|c| matches!(c, Call::CreateBatch { .. })), 2);

        for _ in 0..3 {
            frame(&mut r, &mut gpu, 1);
        }
        assert_eq!(r.batches[1].life, 0);
        assert!(r.batches[1].gpu.is_none());
        assert_eq!(gpu.count(|c| matches!(c, Call::DestroyBatch(_))), 1);
        assert_eq!(r.live_batch_count(), 1);

        // Reuse after release creates fresh resources.
        frame(&mut r, &mut gpu, 2);
        assert_eq!(gpu.count(|c| matches!(c, Call::CreateBatch { .. })), 3);
    }

    #[test]
    fn end_submission_uploads_only_used_vertices() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(2, 8));
        let vertex_size = std::mem::size_of::<super::super::QuadVertex>();

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.end_submission(&mut gpu).unwrap();
        assert_eq!(
            gpu.take_calls(),
            vec![Call::CreateBatch { id: 1, vertex_bytes: 8 * 4 * vertex_size, indices: 8 * 6 }]
        );

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.end_submission(&mut gpu).unwrap();
        assert_eq!(gpu.take_calls(), vec![Call::UploadVertices { id: 1, bytes: 2 * 4 * vertex_size }]);
    }

    #[test]
    fn backend_failure_is_reported_and_batch_skipped() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::failing();
        let mut r = renderer(config(2, 8));

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        let err = r.end_submission(&mut gpu).unwrap_err();
        assert!(matches!(err, RenderError::Backend(_)));
        assert!(!r.is_submitting());
        assert_eq!(r.batches[0].life, 0);

        r.render(&mut gpu, &assets, &WINDOW).unwrap();
        assert_eq!(gpu.count(|c| matches!(c, Call::DrawBatch { .. })), 0);
    }

    #[test]
    fn instruction_stream_full_rolls_back_quad() {
        let assets = assets_with_textures(1);
        let mut r = renderer(RendererConfig { instruction_limit: 2, ..config(4, 64) });

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.clear(ColorRgba::black()).unwrap();

        let err = r.submit_quad(&assets, &quad(0)).unwrap_err();
        assert_eq!(err, RenderError::InstructionStreamFull { limit: 2 });
        assert_eq!(total_quads(&r), 1);
        assert!(r.batches[r.cursor].is_empty());
    }

    #[test]
    fn unknown_assets_are_errors() {
        let assets = assets_with_textures(1);
        let mut r = renderer(config(2, 8));
        let mut layout = TextLayout::new();

        r.begin_submission();
        assert_eq!(r.submit_quad(&assets, &quad(3)), Err(RenderError::UnknownTexture(3)));
        assert_eq!(
            r.submit_string(&assets, "hi", 0, Vec2::zero(), &mut layout, HorAlign::Left, VerAlign::Top),
            Err(RenderError::UnknownFont(0))
        );
        assert!(r.instructions().is_empty());
    }

    #[test]
    fn surface_binds_follow_stack() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));

        let a = r.add_surface(&mut gpu, &WINDOW).unwrap();
        let b = r.add_surface(&mut gpu, &WINDOW).unwrap();
        assert_eq!(
            gpu.take_calls(),
            vec![Call::CreateSurface { id: 1, size: WINDOW }, Call::CreateSurface { id: 2, size: WINDOW }]
        );

        r.begin_submission();
        r.push_surface(a).unwrap();
        r.push_surface(b).unwrap();
        r.pop_surface().unwrap();
        r.pop_surface().unwrap();
        r.end_submission(&mut gpu).unwrap();

        r.render(&mut gpu, &assets, &WINDOW).unwrap();
        // Leading `None` is the default target bound at the start of render.
        assert_eq!(gpu.target_binds(), vec![None, Some(1), Some(2), Some(1), None]);
    }

    #[test]
    fn surface_stack_is_bounded() {
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(RendererConfig { surface_limit: 2, ..config(4, 64) });
        let a = r.add_surface(&mut gpu, &WINDOW).unwrap();

        r.begin_submission();
        assert_eq!(r.pop_surface(), Err(RenderError::SurfaceStackUnderflow));
        r.push_surface(a).unwrap();
        r.push_surface(a).unwrap();
        assert_eq!(r.push_surface(a), Err(RenderError::SurfaceStackOverflow { limit: 2 }));
    }

    #[test]
    fn surface_table_full() {
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(RendererConfig { surface_limit: 1, ..config(4, 64) });
        r.add_surface(&mut gpu, &WINDOW).unwrap();

        let err = r.add_surface(&mut gpu, &WINDOW).unwrap_err();
        assert_eq!(err, RenderError::SurfaceTableFull { limit: 1 });
        assert!(err.is_capacity_exhaustion());
    }

    #[test]
    fn removed_surface_is_stale() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));
        let a = r.add_surface(&mut gpu, &WINDOW).unwrap();

        r.begin_submission();
        r.push_surface(a).unwrap();
        r.pop_surface().unwrap();
        r.end_submission(&mut gpu).unwrap();

        r.remove_surface(&mut gpu, a).unwrap();
        assert_eq!(r.remove_surface(&mut gpu, a), Err(RenderError::StaleSurface(a)));

        gpu.take_calls();
        assert_eq!(r.render(&mut gpu, &assets, &WINDOW), Err(RenderError::StaleSurface(a)));
        assert!(gpu.calls.is_empty());

        r.begin_submission();
        assert_eq!(r.push_surface(a), Err(RenderError::StaleSurface(a)));
    }

    #[test]
    fn surface_draw_needs_program_each_time() {
        let mut assets = assets_with_textures(1);
        let program = assets.add_shader_program(ShaderProgramHandle(9));
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));
        let a = r.add_surface(&mut gpu, &WINDOW).unwrap();

        r.begin_submission();
        assert_eq!(
            r.set_surface_shader_uniform("u_time", UniformValue::Float(1.0)),
            Err(RenderError::SurfaceProgramUnset)
        );
        r.set_surface_shader_program(program).unwrap();
        r.set_surface_shader_uniform("u_time", UniformValue::Float(1.0)).unwrap();
        r.draw_surface(a).unwrap();
        assert_eq!(r.draw_surface(a), Err(RenderError::SurfaceProgramUnset));
        r.end_submission(&mut gpu).unwrap();
        gpu.take_calls();

        r.render(&mut gpu, &assets, &WINDOW).unwrap();
        assert_eq!(
            &gpu.calls[2..],
            &[
                Call::SetUniform {
                    program: ShaderProgramHandle(9),
                    name: "u_time".into(),
                    value: UniformValue::Float(1.0),
                },
                Call::DrawSurface { surface: 1, program: ShaderProgramHandle(9) },
            ]
        );
    }

    #[test]
    fn unknown_program_rejected_before_replay() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));

        r.begin_submission();
        r.set_surface_shader_program(4).unwrap();
        r.end_submission(&mut gpu).unwrap();

        assert_eq!(r.render(&mut gpu, &assets, &WINDOW), Err(RenderError::UnknownShaderProgram(4)));
    }

    #[test]
    fn render_clears_default_target_then_replays() {
        let assets = assets_with_textures(2);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);

        r.begin_submission();
        r.clear(red).unwrap();
        r.submit_quad(&assets, &quad(1)).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.end_submission(&mut gpu).unwrap();
        gpu.take_calls();

        r.render(&mut gpu, &assets, &WINDOW).unwrap();
        assert_eq!(
            gpu.calls,
            vec![
                Call::BindTarget(None),
                Call::Clear(ColorRgba::black()),
                Call::Clear(red),
                Call::DrawBatch {
                    id: 1,
                    textures: vec![TextureHandle(101), TextureHandle(100)],
                    quads: 2,
                    view: Mat4::IDENTITY,
                },
            ]
        );
    }

    #[test]
    fn resize_recreates_surfaces_at_window_size() {
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));
        r.add_surface(&mut gpu, &WINDOW).unwrap();
        gpu.take_calls();

        r.resize_surfaces(&mut gpu, &Vec2I::new(0, 0)).unwrap();
        assert!(gpu.calls.is_empty());

        let bigger = Vec2I::new(1024, 768);
        r.resize_surfaces(&mut gpu, &bigger).unwrap();
        assert_eq!(gpu.calls, vec![Call::ResizeSurface { id: 1, size: bigger }]);
    }

    #[test]
    fn destroy_releases_everything() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 1));
        r.add_surface(&mut gpu, &WINDOW).unwrap();

        r.begin_submission();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.end_submission(&mut gpu).unwrap();
        gpu.take_calls();

        r.destroy(&mut gpu);
        assert_eq!(gpu.count(|c| matches!(c, Call::DestroyBatch(_))), 2);
        assert_eq!(gpu.count(|c| matches!(c, Call::DestroySurface(_))), 1);
    }

    #[test]
    #[should_panic(expected = "submit_quad")]
    fn submit_outside_submission_panics() {
        let assets = assets_with_textures(1);
        let mut r = renderer(config(2, 8));
        let _ = r.submit_quad(&assets, &quad(0));
    }

    #[test]
    #[should_panic(expected = "render")]
    fn render_during_submission_panics() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(2, 8));
        r.begin_submission();
        let _ = r.render(&mut gpu, &assets, &WINDOW);
    }

    #[test]
    #[should_panic(expected = "remove_surface")]
    fn remove_surface_during_submission_panics() {
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(2, 8));
        let a = r.add_surface(&mut gpu, &WINDOW).unwrap();
        r.begin_submission();
        r.push_surface(a).unwrap();
        r.pop_surface().unwrap();
        let _ = r.remove_surface(&mut gpu, a);
    }

    #[test]
    #[should_panic(expected = "resize_surfaces")]
    fn resize_surfaces_during_submission_panics() {
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(2, 8));
        r.add_surface(&mut gpu, &WINDOW).unwrap();
        r.begin_submission();
        let _ = r.resize_surfaces(&mut gpu, &Vec2I::new(320, 200));
    }

    #[test]
    #[should_panic(expected = "add_surface")]
    fn add_surface_during_submission_panics() {
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(2, 8));
        r.begin_submission();
        let _ = r.add_surface(&mut gpu, &WINDOW);
    }

    #[test]
    fn unbalanced_surface_stack_ends_on_default_target() {
        let assets = assets_with_textures(1);
        let mut gpu = RecordingBackend::new();
        let mut r = renderer(config(4, 64));
        let a = r.add_surface(&mut gpu, &WINDOW).unwrap();

        r.begin_submission();
        r.push_surface(a).unwrap();
        r.submit_quad(&assets, &quad(0)).unwrap();
        r.end_submission(&mut gpu).unwrap();

        gpu.take_calls();
        r.render(&mut gpu, &assets, &WINDOW).unwrap();
        assert_eq!(gpu.target_binds(), vec![None, Some(1), None]);
    }

    fn test_font() -> (FontArrangement, Vec<GlyphMetrics>) {
        let mut font = FontArrangement::new(20);
        let metrics = vec![
            GlyphMetrics { hor_offset: 1, ver_offset: 4, hor_advance: 10, src_rect: RectI::new(0, 0, 8, 12) },
            GlyphMetrics { hor_offset: 2, ver_offset: 2, hor_advance: 12, src_rect: RectI::new(8, 0, 9, 14) },
        ];
        font.set_glyph('A', metrics[0]).unwrap();
        font.set_glyph('B', metrics[1]).unwrap();
        font.set_kerning('B', 'A', -1).unwrap();
        (font, metrics)
    }

    #[test]
    fn centred_string_starts_half_width_left() {
        let (font, metrics) = test_font();
        let mut assets = AssetRegistry::new();
        let font_index = assets.add_font(font, TextureHandle(7), Vec2I::new(64, 64));
        let mut r = renderer(config(2, 64));
        let mut layout = TextLayout::new();
        let pos = Vec2::new(100.0, 50.0);

        r.begin_submission();
        r.submit_string(&assets, "AB", font_index, pos, &mut layout, HorAlign::Center, VerAlign::Top)
            .unwrap();

        let width = layout.line_widths()[0] as f32;
        assert_eq!(width, 21.0);

        let verts = r.batches[0].used_vertices();
        assert_eq!(verts.len(), 8);
        assert_eq!(verts[0].pos[0], pos.x - width / 2.0 + metrics[0].hor_offset as f32);
        assert_eq!(verts[0].size, [8.0, 12.0]);
        assert_eq!(r.batches[0].textures(), &[TextureHandle(7)]);
    }

    #[test]
    fn string_skips_spaces_and_newlines() {
        let (font, _) = test_font();
        let mut assets = AssetRegistry::new();
        let font_index = assets.add_font(font, TextureHandle(7), Vec2I::new(64, 64));
        let mut r = renderer(config(2, 64));
        let mut layout = TextLayout::new();

        r.begin_submission();
        r.submit_string(&assets, "A B\nBA", font_index, Vec2::zero(), &mut layout, HorAlign::Left, VerAlign::Top)
            .unwrap();
        assert_eq!(total_quads(&r), 4);

        let second_line_y = r.batches[0].used_vertices()[8].pos[1];
        assert_eq!(second_line_y, 20.0 + 2.0);
    }

    #[test]
    fn unsupported_character_is_layout_error() {
        let (font, _) = test_font();
        let mut assets = AssetRegistry::new();
        let font_index = assets.add_font(font, TextureHandle(7), Vec2I::new(64, 64));
        let mut r = renderer(config(2, 64));
        let mut layout = TextLayout::new();

        r.begin_submission();
        let err = r
            .submit_string(&assets, "A\u{e9}", font_index, Vec2::zero(), &mut layout, HorAlign::Left, VerAlign::Top)
            .unwrap_err();
        assert!(matches!(err, RenderError::Layout(_)));
        assert_eq!(total_quads(&r), 0);
    }
}
