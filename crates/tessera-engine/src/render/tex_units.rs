use crate::assets::TextureHandle;

/// Texture handles bound to one batch, in unit order.
///
/// A handle's position in the list is the texture unit its quads sample.
#[derive(Debug, Clone)]
pub(crate) struct TexUnits {
    handles: Vec<TextureHandle>,
    limit: usize,
}

impl TexUnits {
    pub(crate) fn new(limit: usize) -> Self {
        Self { handles: Vec::with_capacity(limit), limit }
    }

    /// Returns the unit already holding `handle`, or claims the next free one.
    ///
    /// `None` means every unit is taken by other textures and the quad must
    /// go to another batch.
    pub(crate) fn assign(&mut self, handle: TextureHandle) -> Option<u32> {
        if let Some(unit) = self.handles.iter().position(|&h| h == handle) {
            return Some(unit as u32);
        }
        if self.handles.len() >= self.limit {
            return None;
        }
        self.handles.push(handle);
        Some((self.handles.len() - 1) as u32)
    }

    #[inline]
    pub(crate) fn handles(&self) -> &[TextureHandle] {
        &self.handles
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.handles.clear();
    }
}
