use crate::assets::TextureHandle;
use crate::coords::Vec2I;
use crate::render::BackendError;

struct Entry {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Sampled textures registered with the backend, addressed by handle.
///
/// Handles are never reused; removing a texture leaves a hole.
pub(super) struct TextureRegistry {
    entries: Vec<Option<Entry>>,
    fallback: Entry,
}

impl TextureRegistry {
    pub(super) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let (texture, view) =
            upload_rgba(device, queue, "tessera fallback texture", Vec2I::new(1, 1), &[255; 4]);
        Self { entries: Vec::new(), fallback: Entry { _texture: texture, view } }
    }

    pub(super) fn insert(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: Vec2I,
        rgba: &[u8],
    ) -> Result<TextureHandle, BackendError> {
        validate_size(device, size, "texture")?;
        let expected = size.x as usize * size.y as usize * 4;
        if rgba.len() != expected {
            return Err(BackendError(format!(
                "texture data is {} bytes, expected {expected} for {}x{} RGBA",
                rgba.len(),
                size.x,
                size.y
            )));
        }

        let handle = TextureHandle(self.entries.len() as u32);
        let (texture, view) = upload_rgba(device, queue, "tessera texture", size, rgba);
        self.entries.push(Some(Entry { _texture: texture, view }));
        Ok(handle)
    }

    pub(super) fn remove(&mut self, handle: TextureHandle) -> bool {
        self.entries
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
            .is_some()
    }

    /// View for `handle`, or a 1x1 white texture if it is unknown.
    pub(super) fn view(&self, handle: TextureHandle) -> &wgpu::TextureView {
        match self.entries.get(handle.0 as usize).and_then(Option::as_ref) {
            Some(entry) => &entry.view,
            None => {
                log::warn!("unknown texture {handle:?}; drawing white");
                &self.fallback.view
            }
        }
    }

    #[inline]
    pub(super) fn fallback(&self) -> &wgpu::TextureView {
        &self.fallback.view
    }
}

pub(super) fn validate_size(device: &wgpu::Device, size: Vec2I, what: &str) -> Result<(), BackendError> {
    let max = device.limits().max_texture_dimension_2d;
    if !size.is_positive() || size.x as u32 > max || size.y as u32 > max {
        return Err(BackendError(format!(
            "{what} size {}x{} outside 1..={max}",
            size.x, size.y
        )));
    }
    Ok(())
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    size: Vec2I,
    rgba: &[u8],
) -> (wgpu::Texture, wgpu::TextureView) {
    let extent = wgpu::Extent3d {
        width: size.x as u32,
        height: size.y as u32,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(extent.width * 4),
            rows_per_image: Some(extent.height),
        },
        extent,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
