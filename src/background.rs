use alloc::vec::Vec;

use crate::asset::tilemap::TileMap;
use crate::asset::TileMapId;
use crate::error::{Error, Result};
use crate::sys::fixed::Fix8;
use crate::sys::video::BgControl;

/// The number of regular hardware background layers.
pub const BG_LAYERS: usize = 4;

/// A tiled background layer showing one tile map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    tilemap: TileMapId,
    /// 0 (front) to 3 (back).
    pub priority: u8,
    pub hscroll: Fix8,
    pub vscroll: Fix8,
    loaded: bool,
}

impl Background {
    pub const fn new(tilemap: TileMapId, priority: u8) -> Self {
        Self { tilemap, priority, hscroll: Fix8::ZERO, vscroll: Fix8::ZERO, loaded: false }
    }

    #[inline]
    pub fn tilemap(&self) -> TileMapId {
        self.tilemap
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    /// Move the view by `(dx, dy)` pixels.
    pub fn scroll(&mut self, dx: Fix8, dy: Fix8) {
        self.hscroll += dx;
        self.vscroll += dy;
    }

    /// Scroll register values: the integer part of each offset, modulo 2^16.
    #[inline]
    pub fn offsets(&self) -> (u16, u16) {
        (self.hscroll.int_u16(), self.vscroll.int_u16())
    }

    /// The control register value that shows `map`, if it is loaded.
    pub fn control(&self, map: &TileMap) -> Option<BgControl> {
        let base = map.screen_base_block()?;
        Some(BgControl::ZEROED.with_priority(self.priority).with_screen_base(base).with_size(map.size()))
    }
}

/// A handle to a background owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundId {
    index: u16,
    generation: u16,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u16,
    background: Option<Background>,
}

/// Background storage and the assignment of backgrounds to the four hardware layers.
#[derive(Debug, Clone, Default)]
pub struct Backgrounds {
    slots: Vec<Slot>,
    layers: [Option<BackgroundId>; BG_LAYERS],
}

impl Backgrounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, background: Background) -> BackgroundId {
        if let Some(index) = self.slots.iter().position(|s| s.background.is_none()) {
            let slot = &mut self.slots[index];
            slot.background = Some(background);
            return BackgroundId { index: index as u16, generation: slot.generation };
        }
        self.slots.push(Slot { generation: 0, background: Some(background) });
        BackgroundId { index: (self.slots.len() - 1) as u16, generation: 0 }
    }

    pub fn get(&self, id: BackgroundId) -> Result<&Background> {
        match self.slots.get(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot.background.as_ref().ok_or(Error::StaleHandle),
            _ => Err(Error::StaleHandle),
        }
    }

    pub fn get_mut(&mut self, id: BackgroundId) -> Result<&mut Background> {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot.background.as_mut().ok_or(Error::StaleHandle),
            _ => Err(Error::StaleHandle),
        }
    }

    /// Take a background out of storage. It must already be unloaded.
    pub fn remove(&mut self, id: BackgroundId) -> Result<Background> {
        self.get(id)?;
        self.detach(id);
        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.background.take().ok_or(Error::StaleHandle)
    }

    /// Backgrounds in storage.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.background.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The hardware layer `id` is shown on.
    pub fn layer_of(&self, id: BackgroundId) -> Option<usize> {
        self.layers.iter().position(|&l| l == Some(id))
    }

    /// Put a background on the lowest free layer. A background already shown keeps its layer.
    pub fn attach(&mut self, id: BackgroundId) -> Result<usize> {
        self.get(id)?;
        if let Some(layer) = self.layer_of(id) {
            return Ok(layer);
        }
        let layer = self
            .layers
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyActive { what: "backgrounds", limit: BG_LAYERS })?;
        self.layers[layer] = Some(id);
        Ok(layer)
    }

    /// Take a background off its layer. Returns the layer it was on.
    pub fn detach(&mut self, id: BackgroundId) -> Option<usize> {
        let layer = self.layer_of(id)?;
        self.layers[layer] = None;
        Some(layer)
    }

    /// Backgrounds by hardware layer.
    pub fn layers(&self) -> impl Iterator<Item = (usize, &Background)> + '_ {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(layer, id)| Some((layer, self.get((*id)?).ok()?)))
    }

    pub fn clear_layers(&mut self) {
        self.layers = [None; BG_LAYERS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::TileSetId;
    use crate::error::Pool;
    use crate::sys::alloc::VramAlloc;
    use crate::sys::host::HostIo;
    use crate::sys::video::{BgSize, MAP_BLOCK_CELLS};

    #[test]
    fn scroll_accumulates_and_wraps_to_sixteen_bits() {
        let mut bg = Background::new(TileMapId(0), 0);
        bg.scroll(Fix8::HALF, Fix8::ONE);
        bg.scroll(Fix8::HALF, -Fix8::ONE * 3);
        assert_eq!(bg.offsets(), (1, 0xFFFE));
        bg.hscroll = Fix8::from_int(0x1_0005);
        assert_eq!(bg.offsets().0, 5);
    }

    #[test]
    fn control_word_points_at_the_map() {
        let mut hw = HostIo::new();
        let mut alloc = VramAlloc::<MAP_BLOCK_CELLS>::new(Pool::ScreenBlocks);
        alloc.alloc(3).unwrap();
        let mut map = TileMap::blank(BgSize::Wide, TileSetId(0));
        let bg = Background::new(TileMapId(0), 2);
        assert_eq!(bg.control(&map), None);

        map.load(&mut hw, &mut alloc, 0, 0).unwrap();
        let ctl = bg.control(&map).unwrap();
        assert_eq!(ctl.bits(), 2 | 19 << 8 | 1 << 14);
    }

    #[test]
    fn removed_background_frees_its_slot_and_layer() {
        let mut bgs = Backgrounds::new();
        let a = bgs.insert(Background::new(TileMapId(0), 0));
        assert_eq!(bgs.attach(a), Ok(0));
        assert_eq!(bgs.remove(a).map(|bg| bg.tilemap()), Ok(TileMapId(0)));
        assert_eq!(bgs.layer_of(a), None);
        assert_eq!(bgs.get(a), Err(Error::StaleHandle));
        assert_eq!(bgs.remove(a).map(|_| ()), Err(Error::StaleHandle));

        let b = bgs.insert(Background::new(TileMapId(1), 0));
        assert_ne!(a, b);
        assert_eq!(bgs.get(a), Err(Error::StaleHandle));
        assert_eq!(bgs.attach(a), Err(Error::StaleHandle));
        assert_eq!(bgs.len(), 1);
    }

    #[test]
    fn four_layers_at_most() {
        let mut bgs = Backgrounds::new();
        let ids: Vec<_> = (0..5).map(|i| bgs.insert(Background::new(TileMapId(i), 0))).collect();
        for (i, &id) in ids[..4].iter().enumerate() {
            assert_eq!(bgs.attach(id), Ok(i));
        }
        assert_eq!(bgs.attach(ids[1]), Ok(1));
        assert_eq!(bgs.attach(ids[4]), Err(Error::TooManyActive { what: "backgrounds", limit: 4 }));
        assert_eq!(bgs.detach(ids[2]), Some(2));
        assert_eq!(bgs.attach(ids[4]), Ok(2));
        assert_eq!(bgs.layers().map(|(l, _)| l).collect::<Vec<_>>(), [0, 1, 2, 3]);
    }
}
