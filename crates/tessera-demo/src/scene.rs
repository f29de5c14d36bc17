use std::time::Instant;

use anyhow::{Context, Result};

use tessera_engine::assets::AssetRegistry;
use tessera_engine::coords::{Camera, ColorRgba, Mat4, RectI, Vec2, Vec2I};
use tessera_engine::device::Gpu;
use tessera_engine::render::{
    Renderer, RendererConfig, RenderError, SurfaceId, TexturedQuad, UniformKind, UniformValue,
    WgpuBackend,
};
use tessera_engine::text::{bake_font, HorAlign, TextLayout, VerAlign};
use tessera_engine::window::DrawableSize;

use crate::runtime::{App, AppControl};

const SPRITE_COLS: usize = 48;
const SPRITE_ROWS: usize = 32;
const SPRITE_SPACING: f32 = 40.0;
const CHECKER_SIZE: i32 = 32;
const FONT_PX: f32 = 22.0;

/// Post-processing pass: a slow scanline tint over the sprite field.
const POST_FRAGMENT: &str = r#"
struct Params {
    time: f32,
    intensity: f32,
};

@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(frag: SurfaceVsOut) -> @location(0) vec4<f32> {
    let colour = textureSample(surface_tex, surface_sampler, frag.uv);
    let wave = 0.5 + 0.5 * sin(frag.uv.y * 240.0 + params.time * 3.0);
    let tint = mix(vec3<f32>(1.0), vec3<f32>(0.75, 0.9, 1.0), wave * params.intensity);
    return vec4<f32>(colour.rgb * tint, colour.a);
}
"#;

/// Everything that needs a live GPU context.
struct SceneState {
    backend: WgpuBackend,
    renderer: Renderer<WgpuBackend>,
    assets: AssetRegistry,
    textures: Vec<usize>,
    font: Option<usize>,
    post_program: usize,
    surface: SurfaceId,
    layout_scratch: TextLayout,
}

/// Rotating sprite field drawn into a surface and post-processed.
pub struct DemoScene {
    state: Option<SceneState>,
    camera: Camera,
    started: Instant,
    frames: u64,
}

impl DemoScene {
    pub fn new() -> Self {
        Self {
            state: None,
            camera: Camera::default(),
            started: Instant::now(),
            frames: 0,
        }
    }
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new()
    }
}

impl App for DemoScene {
    fn init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let mut backend = WgpuBackend::new(gpu.device(), gpu.queue(), gpu.surface_format());
        let mut renderer = Renderer::new(RendererConfig::default())?;
        let mut assets = AssetRegistry::new();

        let palette = [
            ([230, 90, 70], [250, 200, 120]),
            ([60, 140, 220], [170, 220, 250]),
            ([90, 190, 110], [220, 245, 160]),
        ];
        let mut textures = Vec::with_capacity(palette.len());
        for (a, b) in palette {
            let size = Vec2I::new(CHECKER_SIZE, CHECKER_SIZE);
            let handle = backend.register_texture(size, &checker_rgba(CHECKER_SIZE, 8, a, b))?;
            textures.push(assets.add_texture(handle, size));
        }

        let font = load_font(&mut backend, &mut assets);

        let program = backend.register_surface_program(
            "post scanlines",
            POST_FRAGMENT,
            &[("time", UniformKind::Float), ("intensity", UniformKind::Float)],
        )?;
        let post_program = assets.add_shader_program(program);

        let surface = renderer.add_surface(&mut backend, gpu)?;

        let size = gpu.drawable_size();
        self.camera = Camera::new(
            Vec2::new(
                SPRITE_COLS as f32 * SPRITE_SPACING / 2.0,
                SPRITE_ROWS as f32 * SPRITE_SPACING / 2.0,
            ),
            fit_scale(size),
        );
        self.started = Instant::now();

        self.state = Some(SceneState {
            backend,
            renderer,
            assets,
            textures,
            font,
            post_program,
            surface,
            layout_scratch: TextLayout::new(),
        });
        Ok(())
    }

    fn resized(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let Some(state) = self.state.as_mut() else { return Ok(()) };
        state.renderer.resize_surfaces(&mut state.backend, gpu)?;
        self.camera.scale = fit_scale(gpu.drawable_size());
        Ok(())
    }

    fn frame(&mut self, gpu: &Gpu<'_>) -> Result<AppControl> {
        let Some(state) = self.state.as_mut() else { return Ok(AppControl::Continue) };
        let time = self.started.elapsed().as_secs_f32();
        let window_size = gpu.drawable_size();

        state.renderer.begin_submission();
        match submit_scene(state, &self.camera, window_size, time, self.frames) {
            Ok(()) => {}
            Err(e) if e.is_capacity_exhaustion() => log::warn!("frame truncated: {e}"),
            Err(e) => return Err(e.into()),
        }
        state.renderer.end_submission(&mut state.backend)?;

        let frame = gpu.begin_frame()?;
        state.backend.begin_frame(&frame.view);
        state.renderer.render(&mut state.backend, &state.assets, gpu)?;
        gpu.present(frame, state.backend.finish_frame());

        self.frames += 1;
        if self.frames % 600 == 0 {
            log::debug!(
                "frame {}: {} instructions, {} live batches",
                self.frames,
                state.renderer.instructions().len(),
                state.renderer.live_batch_count()
            );
        }
        Ok(AppControl::Continue)
    }
}

fn submit_scene(
    state: &mut SceneState,
    camera: &Camera,
    window_size: Vec2I,
    time: f32,
    frame: u64,
) -> Result<(), RenderError> {
    let renderer = &mut state.renderer;

    renderer.push_surface(state.surface)?;
    renderer.clear(ColorRgba::new(0.08, 0.09, 0.12, 1.0))?;
    renderer.set_view_matrix(camera.view_matrix(window_size))?;

    let src = RectI::new(0, 0, CHECKER_SIZE, CHECKER_SIZE);
    for row in 0..SPRITE_ROWS {
        for col in 0..SPRITE_COLS {
            let i = row * SPRITE_COLS + col;
            let texture = state.textures[i % state.textures.len()];
            let phase = (row + col) as f32 * 0.15;
            let pos = Vec2::new(
                (col as f32 + 0.5) * SPRITE_SPACING,
                (row as f32 + 0.5) * SPRITE_SPACING,
            );
            let quad = TexturedQuad::new(texture, pos, src)
                .with_origin(Vec2::new(0.5, 0.5))
                .with_rotation(time * 1.5 + phase)
                .with_scale(Vec2::one() * (0.75 + 0.25 * (time * 2.0 + phase).sin()))
                .with_alpha(0.85);
            renderer.submit_quad(&state.assets, &quad)?;
        }
    }

    renderer.set_view_matrix(Mat4::IDENTITY)?;
    renderer.pop_surface()?;

    renderer.set_surface_shader_program(state.post_program)?;
    renderer.set_surface_shader_uniform("time", UniformValue::Float(time))?;
    renderer.set_surface_shader_uniform("intensity", UniformValue::Float(0.6))?;
    renderer.draw_surface(state.surface)?;

    if let Some(font) = state.font {
        let caption = format!(
            "tessera\n{} sprites, frame {frame}",
            SPRITE_COLS * SPRITE_ROWS
        );
        let centre = Vec2::new(window_size.x as f32 / 2.0, window_size.y as f32 / 2.0);
        renderer.submit_string(
            &state.assets,
            &caption,
            font,
            centre,
            &mut state.layout_scratch,
            HorAlign::Center,
            VerAlign::Center,
        )?;
    }
    Ok(())
}

/// Loads the caption font from `TESSERA_FONT`, if set.
///
/// A missing or broken font only disables the caption.
fn load_font(backend: &mut WgpuBackend, assets: &mut AssetRegistry) -> Option<usize> {
    let path = std::env::var_os("TESSERA_FONT")?;

    let baked = std::fs::read(&path)
        .with_context(|| format!("reading {}", path.to_string_lossy()))
        .and_then(|bytes| bake_font(&bytes, FONT_PX).context("baking font"));
    let baked = match baked {
        Ok(baked) => baked,
        Err(e) => {
            log::warn!("caption disabled: {e:#}");
            return None;
        }
    };

    match backend.register_texture(baked.atlas_size, &baked.atlas_rgba) {
        Ok(handle) => Some(assets.add_font(baked.arrangement, handle, baked.atlas_size)),
        Err(e) => {
            log::warn!("caption disabled: {e}");
            None
        }
    }
}

/// Zoom that keeps the whole sprite field visible.
fn fit_scale(window_size: Vec2I) -> f32 {
    let field = Vec2::new(
        SPRITE_COLS as f32 * SPRITE_SPACING,
        SPRITE_ROWS as f32 * SPRITE_SPACING,
    );
    let sx = window_size.x.max(1) as f32 / field.x;
    let sy = window_size.y.max(1) as f32 / field.y;
    sx.min(sy)
}

fn checker_rgba(size: i32, cell: i32, a: [u8; 3], b: [u8; 3]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let [r, g, bl] = if (x / cell + y / cell) % 2 == 0 { a } else { b };
            rgba.extend_from_slice(&[r, g, bl, 255]);
        }
    }
    rgba
}
