/// Handle to an off-screen surface.
///
/// The generation changes each time a slot is reused, so an id kept after
/// [`super::Renderer::remove_surface`] never aliases a newer surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId {
    index: u32,
    generation: u32,
}

impl SurfaceId {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
struct Slot<S> {
    generation: u32,
    surface: Option<S>,
}

/// Fixed-capacity slot map of live surfaces.
#[derive(Debug)]
pub(crate) struct SurfaceTable<S> {
    slots: Vec<Slot<S>>,
    free: Vec<u32>,
    limit: usize,
}

impl<S> SurfaceTable<S> {
    pub(crate) fn new(limit: usize) -> Self {
        Self { slots: Vec::with_capacity(limit), free: Vec::new(), limit }
    }

    #[inline]
    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.free.is_empty() && self.slots.len() >= self.limit
    }

    /// Stores `surface`; the caller checks [`Self::is_full`] first.
    pub(crate) fn insert(&mut self, surface: S) -> Option<SurfaceId> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.surface = Some(surface);
            return Some(SurfaceId { index, generation: slot.generation });
        }
        if self.slots.len() >= self.limit {
            return None;
        }
        self.slots.push(Slot { generation: 0, surface: Some(surface) });
        Some(SurfaceId { index: (self.slots.len() - 1) as u32, generation: 0 })
    }

    pub(crate) fn remove(&mut self, id: SurfaceId) -> Option<S> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let surface = slot.surface.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(surface)
    }

    pub(crate) fn get(&self, id: SurfaceId) -> Option<&S> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.surface.as_ref())
    }

    #[inline]
    pub(crate) fn contains(&self, id: SurfaceId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut S> {
        self.slots.iter_mut().filter_map(|slot| slot.surface.as_mut())
    }

    /// Removes every surface, invalidating all outstanding ids.
    pub(crate) fn drain(&mut self) -> Vec<S> {
        let mut out = Vec::with_capacity(self.len());
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(surface) = slot.surface.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                out.push(surface);
            }
        }
        out
    }
}
