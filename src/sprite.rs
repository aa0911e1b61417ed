//! Logical sprites and how they become OAM attribute words.

use alloc::vec::Vec;

use log::warn;

use crate::asset::{Binding, TileSetId};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::sys::fixed::{Fix8, V2};
use crate::sys::hw::HardwareIo;
use crate::sys::video::{ObjAttrs, ObjMode};

/// Upper bound on the active sprite limit an engine can be configured with.
pub const MAX_ACTIVE: usize = 512;

/// One step of a sprite animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// Tile index within the sprite's tileset.
    pub index: u16,
    pub hflip: bool,
    pub vflip: bool,
    /// Draw offset added to the sprite position while this frame shows.
    pub offset: V2,
    /// How many updates the frame stays up. Zero is treated as one.
    pub len: u16,
}

impl Frame {
    pub const fn new(index: u16, len: u16) -> Self {
        Self { index, hflip: false, vflip: false, offset: V2::ZERO, len }
    }
}

/// A looping sequence of frames and the cursor into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    frames: &'static [Frame],
    cursor: usize,
    counter: u16,
}

impl Animation {
    pub const fn new(frames: &'static [Frame]) -> Self {
        Self { frames, cursor: 0, counter: 0 }
    }

    #[inline]
    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.cursor)
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Count one update. Returns the new frame when the current one has run its length.
    pub fn advance(&mut self) -> Option<&Frame> {
        let len = self.current()?.len.max(1);
        self.counter += 1;
        if self.counter < len {
            return None;
        }
        self.counter = 0;
        self.cursor = (self.cursor + 1) % self.frames.len();
        self.current()
    }
}

/// A game sprite.
///
/// Everything here is logical state; hardware attributes are derived from it, together with
/// where its tileset is loaded, once per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub pos: V2,
    pub offset: V2,
    pub tile_index: u16,
    pub hide: bool,
    pub hflip: bool,
    pub vflip: bool,
    /// 0 (front) to 3 (back).
    pub priority: u8,
    tileset: TileSetId,
    animation: Option<Animation>,
}

impl Sprite {
    pub const fn new(tileset: TileSetId) -> Self {
        Self {
            pos: V2::ZERO,
            offset: V2::ZERO,
            tile_index: 0,
            hide: false,
            hflip: false,
            vflip: false,
            priority: 0,
            tileset,
            animation: None,
        }
    }

    #[inline]
    pub fn tileset(&self) -> TileSetId {
        self.tileset
    }

    #[inline]
    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    /// Start an animation from its first frame.
    pub fn play(&mut self, frames: &'static [Frame]) {
        let animation = Animation::new(frames);
        if let Some(&frame) = animation.current() {
            self.apply(frame);
        }
        self.animation = Some(animation);
    }

    /// Stop animating. The sprite keeps showing whatever frame it was on.
    pub fn stop(&mut self) {
        self.animation = None;
    }

    fn apply(&mut self, frame: Frame) {
        self.tile_index = frame.index;
        self.hflip = frame.hflip;
        self.vflip = frame.vflip;
        self.offset = frame.offset;
    }

    /// Per-frame update: step the animation, if any.
    pub fn update(&mut self) {
        let next = self.animation.as_mut().and_then(|a| a.advance().copied());
        if let Some(frame) = next {
            self.apply(frame);
        }
    }

    /// Derive the three OAM attribute words for this sprite drawn with `binding`.
    pub fn attrs(&self, binding: &Binding) -> ObjAttrs {
        let at = self.pos + self.offset;
        let mut x = at.x.int();
        let mut y = at.y.int();
        if x < 0 {
            x += 512;
        }
        if y < 0 {
            y += 256;
        }
        let mode = if self.hide { ObjMode::Hide } else { ObjMode::Normal };
        ObjAttrs::ZEROED
            .with_y(y as u16)
            .with_mode(mode)
            .with_shape(binding.shape)
            .with_x(x as u16)
            .with_flip(self.hflip, self.vflip)
            .with_size(binding.size)
            .with_tile_index(self.tile_index.wrapping_add(binding.offset))
            .with_priority(self.priority)
            .with_palette(binding.palette)
    }
}

/// A handle to a sprite owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId {
    index: u16,
    generation: u16,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u16,
    sprite: Option<Sprite>,
    loaded: bool,
}

/// Sprite storage plus the list of sprites drawn each frame.
#[derive(Debug, Clone)]
pub struct Sprites {
    slots: Vec<Slot>,
    active: heapless::Vec<SpriteId, MAX_ACTIVE>,
    limit: usize,
}

impl Sprites {
    pub fn new(limit: usize) -> Self {
        Self { slots: Vec::new(), active: heapless::Vec::new(), limit: limit.min(MAX_ACTIVE) }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn insert(&mut self, sprite: Sprite) -> SpriteId {
        if let Some(index) = self.slots.iter().position(|s| s.sprite.is_none()) {
            let slot = &mut self.slots[index];
            slot.sprite = Some(sprite);
            slot.loaded = false;
            return SpriteId { index: index as u16, generation: slot.generation };
        }
        self.slots.push(Slot { generation: 0, sprite: Some(sprite), loaded: false });
        SpriteId { index: (self.slots.len() - 1) as u16, generation: 0 }
    }

    fn slot(&self, id: SpriteId) -> Result<&Slot> {
        match self.slots.get(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.sprite.is_some() => Ok(slot),
            _ => Err(Error::StaleHandle),
        }
    }

    fn slot_mut(&mut self, id: SpriteId) -> Result<&mut Slot> {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.sprite.is_some() => Ok(slot),
            _ => Err(Error::StaleHandle),
        }
    }

    pub fn get(&self, id: SpriteId) -> Result<&Sprite> {
        self.slot(id)?.sprite.as_ref().ok_or(Error::StaleHandle)
    }

    pub fn get_mut(&mut self, id: SpriteId) -> Result<&mut Sprite> {
        self.slot_mut(id)?.sprite.as_mut().ok_or(Error::StaleHandle)
    }

    /// Take a sprite out of storage. It must already be hidden and unloaded.
    pub fn remove(&mut self, id: SpriteId) -> Result<Sprite> {
        self.deactivate(id);
        let slot = self.slot_mut(id)?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.loaded = false;
        slot.sprite.take().ok_or(Error::StaleHandle)
    }

    pub fn is_loaded(&self, id: SpriteId) -> Result<bool> {
        Ok(self.slot(id)?.loaded)
    }

    pub(crate) fn set_loaded(&mut self, id: SpriteId, loaded: bool) -> Result<()> {
        self.slot_mut(id)?.loaded = loaded;
        Ok(())
    }

    #[inline]
    pub fn is_active(&self, id: SpriteId) -> bool {
        self.active.contains(&id)
    }

    /// Add a sprite to the draw list. Adding an active sprite again does nothing.
    pub fn activate(&mut self, id: SpriteId) -> Result<()> {
        self.slot(id)?;
        if self.is_active(id) {
            return Ok(());
        }
        let too_many = Error::TooManyActive { what: "sprites", limit: self.limit };
        if self.active.len() >= self.limit {
            warn!("sprite limit of {} reached", self.limit);
            return Err(too_many);
        }
        self.active.push(id).map_err(|_| too_many)
    }

    pub fn deactivate(&mut self, id: SpriteId) {
        if let Some(i) = self.active.iter().position(|&a| a == id) {
            self.active.remove(i);
        }
    }

    /// Drop every sprite from the draw list.
    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    #[inline]
    pub fn active(&self) -> &[SpriteId] {
        &self.active
    }

    /// Step the animation of every active sprite.
    pub fn update(&mut self) {
        for i in 0..self.active.len() {
            let id = self.active[i];
            if let Ok(sprite) = self.get_mut(id) {
                sprite.update();
            }
        }
    }
}

/// A group of sprites on one tileset moved as a unit, each part drawn at the group position
/// plus its own offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaSprite {
    pos: V2,
    parts: Vec<(SpriteId, V2)>,
}

impl MetaSprite {
    /// Create one sprite per `(offset, tile index)` pair.
    pub fn new<H: HardwareIo>(engine: &mut Engine<H>, tileset: TileSetId, parts: &[(V2, u16)]) -> Self {
        let parts = parts
            .iter()
            .map(|&(offset, index)| {
                let mut sprite = Sprite::new(tileset);
                sprite.tile_index = index;
                sprite.pos = offset;
                (engine.sprites_mut().insert(sprite), offset)
            })
            .collect();
        Self { pos: V2::ZERO, parts }
    }

    #[inline]
    pub fn pos(&self) -> V2 {
        self.pos
    }

    pub fn parts(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.parts.iter().map(|&(id, _)| id)
    }

    pub fn set<H: HardwareIo>(&mut self, engine: &mut Engine<H>, pos: V2) -> Result<()> {
        self.pos = pos;
        for &(id, offset) in &self.parts {
            engine.sprites_mut().get_mut(id)?.pos = pos + offset;
        }
        Ok(())
    }

    pub fn move_by<H: HardwareIo>(&mut self, engine: &mut Engine<H>, dx: Fix8, dy: Fix8) -> Result<()> {
        self.set(engine, self.pos + V2::new(dx, dy))
    }

    pub fn load<H: HardwareIo>(&self, engine: &mut Engine<H>) -> Result<()> {
        self.parts().try_for_each(|id| engine.load_sprite(id))
    }

    pub fn unload<H: HardwareIo>(&self, engine: &mut Engine<H>) -> Result<()> {
        self.parts().try_for_each(|id| engine.unload_sprite(id))
    }

    pub fn show<H: HardwareIo>(&self, engine: &mut Engine<H>) -> Result<()> {
        self.parts().try_for_each(|id| engine.show_sprite(id))
    }

    pub fn hide<H: HardwareIo>(&self, engine: &mut Engine<H>) {
        for id in self.parts() {
            engine.hide_sprite(id);
        }
    }
}
