//! The frame engine: owns the hardware, every asset and object, and drives the
//! poll / update / vsync / draw loop.

use alloc::boxed::Box;

use const_default::ConstDefault;
use log::{error, info, trace, warn};

use crate::asset::{Assets, TileMapId, TileSetId};
use crate::background::{Background, BackgroundId, Backgrounds, BG_LAYERS};
use crate::error::{Bank, Error, Result};
use crate::sprite::{Sprite, SpriteId, Sprites, MAX_ACTIVE};
use crate::sys::fixed::Fix8;
use crate::sys::hw::{vsync_wait, HardwareIo};
use crate::sys::io::{Key, Keypad, SaveRam, SAVE_SIZE};
use crate::sys::video::{
    BgControl, DisplayControl, DisplayMode, ObjAttrs, Reg, Rgb15, OAM_ENTRIES, OAM_ENTRY_WORDS, SCREEN_HEIGHT,
    SCREEN_WIDTH,
};

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many sprites may be active at once. Past 128, sprites take turns in OAM.
    pub max_sprites: usize,
    /// Frames between checks of the save image for changes.
    pub save_interval: u32,
    /// One-dimensional sprite tile mapping.
    pub sprite_1d_mapping: bool,
    /// Seed for picking which sprites make it into OAM when there are too many.
    pub rng_seed: u32,
}

impl ConstDefault for EngineConfig {
    const DEFAULT: Self = Self { max_sprites: OAM_ENTRIES, save_interval: 10, sprite_1d_mapping: true, rng_seed: 0x2545_F491 };
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_sprites == 0 || self.max_sprites > MAX_ACTIVE {
            return Err(Error::Config("max_sprites must be between 1 and 512"));
        }
        if self.save_interval == 0 {
            return Err(Error::Config("save_interval must be at least 1"));
        }
        if self.rng_seed == 0 {
            return Err(Error::Config("rng_seed must be nonzero"));
        }
        Ok(())
    }
}

/// One screen of the game: a title screen, a level, a game over screen.
pub trait Scene<H: HardwareIo> {
    /// Load assets and create the objects this scene needs.
    fn init(&mut self, engine: &mut Engine<H>) -> Result<()>;

    /// Advance the scene by one frame. Returning a scene switches to it once this frame is drawn.
    fn update(&mut self, engine: &mut Engine<H>, frame: u64) -> Result<Option<Box<dyn Scene<H>>>>;

    /// Release what `init` acquired.
    fn unload(&mut self, _engine: &mut Engine<H>) -> Result<()> {
        Ok(())
    }
}

pub struct Engine<H: HardwareIo> {
    hw: H,
    config: EngineConfig,
    assets: Assets,
    sprites: Sprites,
    backgrounds: Backgrounds,
    keys: Keypad,
    frame: u64,
    oam: [ObjAttrs; OAM_ENTRIES],
    save: SaveRam,
    rng: u32,
}

impl<H: HardwareIo> Engine<H> {
    pub fn new(mut hw: H, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut saved = [0; SAVE_SIZE];
        hw.read_saved_bytes(&mut saved);

        let display = DisplayControl::new(DisplayMode::Mode0)
            .with_sprite_1d(config.sprite_1d_mapping)
            .with_force_blank(true);
        hw.write_reg(Reg::DISPCNT, display.bits());

        Ok(Self {
            hw,
            config,
            assets: Assets::new(),
            sprites: Sprites::new(config.max_sprites),
            backgrounds: Backgrounds::new(),
            keys: Keypad::new(),
            frame: 0,
            oam: [ObjAttrs::HIDDEN; OAM_ENTRIES],
            save: SaveRam::from_saved(saved),
            rng: config.rng_seed,
        })
    }

    #[inline]
    pub fn hw(&self) -> &H {
        &self.hw
    }

    #[inline]
    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    #[inline]
    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    #[inline]
    pub fn sprites(&self) -> &Sprites {
        &self.sprites
    }

    #[inline]
    pub fn sprites_mut(&mut self) -> &mut Sprites {
        &mut self.sprites
    }

    #[inline]
    pub fn backgrounds(&self) -> &Backgrounds {
        &self.backgrounds
    }

    #[inline]
    pub fn keys(&self) -> &Keypad {
        &self.keys
    }

    /// Frames completed since the engine started.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn oam(&self) -> &[ObjAttrs; OAM_ENTRIES] {
        &self.oam
    }

    #[inline]
    pub fn save(&self) -> &[u8; SAVE_SIZE] {
        self.save.bytes()
    }

    /// The save image. Changes are written to the save area a few frames later.
    #[inline]
    pub fn save_mut(&mut self) -> &mut [u8; SAVE_SIZE] {
        self.save.bytes_mut()
    }

    // Keys

    /// Latch the key input register. The frame loop does this before every update.
    pub fn poll_keys(&mut self) {
        let raw = self.hw.read_keys();
        self.keys.latch(raw);
    }

    #[inline]
    pub fn pressed(&self, keys: Key) -> bool {
        self.keys.pressed(keys)
    }

    #[inline]
    pub fn just_pressed(&self, keys: Key) -> bool {
        self.keys.just_pressed(keys)
    }

    #[inline]
    pub fn just_released(&self, keys: Key) -> bool {
        self.keys.just_released(keys)
    }

    // Sprites

    pub fn new_sprite(&mut self, tileset: TileSetId) -> SpriteId {
        self.sprites.insert(Sprite::new(tileset))
    }

    pub fn sprite(&self, id: SpriteId) -> Result<&Sprite> {
        self.sprites.get(id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Result<&mut Sprite> {
        self.sprites.get_mut(id)
    }

    /// Make sure the sprite's tileset is in video memory. The tileset must be in the sprite bank.
    pub fn load_sprite(&mut self, id: SpriteId) -> Result<()> {
        if self.sprites.is_loaded(id)? {
            return Ok(());
        }
        let tileset = self.sprites.get(id)?.tileset();
        if self.assets.tileset(tileset)?.bank() != Bank::Sprite {
            return Err(Error::InvalidAsset("sprites need a sprite tileset"));
        }
        self.assets.load_tileset(&mut self.hw, tileset)?;
        self.sprites.set_loaded(id, true)
    }

    /// Let go of the sprite's tileset. The sprite is hidden first.
    pub fn unload_sprite(&mut self, id: SpriteId) -> Result<()> {
        if !self.sprites.is_loaded(id)? {
            return Ok(());
        }
        self.sprites.deactivate(id);
        let tileset = self.sprites.get(id)?.tileset();
        self.assets.free_tileset(tileset)?;
        self.sprites.set_loaded(id, false)
    }

    /// Load the sprite if needed and start drawing it every frame.
    pub fn show_sprite(&mut self, id: SpriteId) -> Result<()> {
        self.load_sprite(id)?;
        self.sprites.activate(id)?;
        if self.sprites.active().len() == OAM_ENTRIES + 1 {
            warn!("more than {} sprites active, rotating OAM", OAM_ENTRIES);
        }
        Ok(())
    }

    /// Stop drawing the sprite. Its tileset stays loaded.
    pub fn hide_sprite(&mut self, id: SpriteId) {
        self.sprites.deactivate(id);
    }

    /// Hide, unload and drop a sprite.
    pub fn remove_sprite(&mut self, id: SpriteId) -> Result<Sprite> {
        self.unload_sprite(id)?;
        self.sprites.remove(id)
    }

    // Backgrounds

    pub fn new_background(&mut self, tilemap: TileMapId, priority: u8) -> BackgroundId {
        self.backgrounds.insert(Background::new(tilemap, priority))
    }

    pub fn background(&self, id: BackgroundId) -> Result<&Background> {
        self.backgrounds.get(id)
    }

    pub fn background_mut(&mut self, id: BackgroundId) -> Result<&mut Background> {
        self.backgrounds.get_mut(id)
    }

    /// Make sure the background's tile map is in video memory.
    pub fn load_background(&mut self, id: BackgroundId) -> Result<()> {
        let bg = self.backgrounds.get(id)?;
        if bg.is_loaded() {
            return Ok(());
        }
        let tilemap = bg.tilemap();
        self.assets.load_tilemap(&mut self.hw, tilemap)?;
        self.backgrounds.get_mut(id)?.set_loaded(true);
        Ok(())
    }

    /// Load the background if needed and show it on the lowest free layer.
    pub fn add_background(&mut self, id: BackgroundId) -> Result<usize> {
        self.load_background(id)?;
        self.backgrounds.attach(id)
    }

    /// Stop showing the background. Its tile map stays loaded.
    pub fn remove_background(&mut self, id: BackgroundId) {
        self.backgrounds.detach(id);
    }

    /// Take the background off screen and let go of its tile map.
    pub fn unload_background(&mut self, id: BackgroundId) -> Result<()> {
        self.backgrounds.detach(id);
        let bg = self.backgrounds.get(id)?;
        if !bg.is_loaded() {
            return Ok(());
        }
        let tilemap = bg.tilemap();
        self.assets.free_tilemap(tilemap)?;
        self.backgrounds.get_mut(id)?.set_loaded(false);
        Ok(())
    }

    /// Unload a background and drop it. The handle goes stale.
    pub fn delete_background(&mut self, id: BackgroundId) -> Result<Background> {
        self.unload_background(id)?;
        self.backgrounds.remove(id)
    }

    /// Change a tile of the background's map. Off-map coordinates are ignored and return
    /// `false`.
    pub fn set_tile(&mut self, id: BackgroundId, x: usize, y: usize, raw: u16) -> Result<bool> {
        let tilemap = self.backgrounds.get(id)?.tilemap();
        self.assets.set_tile(tilemap, x, y, raw)
    }

    pub fn scroll_background(&mut self, id: BackgroundId, dx: Fix8, dy: Fix8) -> Result<()> {
        self.backgrounds.get_mut(id)?.scroll(dx, dy);
        Ok(())
    }

    // Frame loop

    fn next_random(&mut self) -> u32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        x
    }

    /// Rebuild the OAM mirror from the active sprites.
    ///
    /// With more active sprites than OAM entries a random window of them is drawn, so every
    /// sprite still shows up on most frames.
    pub fn build_oam(&mut self) {
        let count = self.sprites.active().len();
        let start = if count > OAM_ENTRIES { self.next_random() as usize % count } else { 0 };
        let shown = count.min(OAM_ENTRIES);

        for i in 0..OAM_ENTRIES {
            self.oam[i] = if i < shown {
                let id = self.sprites.active()[(start + i) % count];
                self.sprites
                    .get(id)
                    .and_then(|s| Ok(s.attrs(&self.assets.binding(s.tileset())?)))
                    .unwrap_or(ObjAttrs::HIDDEN)
            } else {
                ObjAttrs::HIDDEN
            };
        }
    }

    /// Push everything to the hardware: pending tile changes, background registers, the display
    /// control enables and the OAM mirror. Call during the vertical blank.
    pub fn draw(&mut self) {
        self.assets.flush_tilemaps(&mut self.hw);

        let mut display = DisplayControl::new(DisplayMode::Mode0)
            .with_sprite_1d(self.config.sprite_1d_mapping)
            .with_sprites(true);
        for layer in 0..BG_LAYERS {
            self.hw.write_reg(Reg::bg_control(layer), BgControl::ZEROED.bits());
        }
        for (layer, bg) in self.backgrounds.layers() {
            let Some(control) = self.assets.tilemap(bg.tilemap()).ok().and_then(|m| bg.control(m)) else {
                continue;
            };
            let (hofs, vofs) = bg.offsets();
            self.hw.write_reg(Reg::bg_control(layer), control.bits());
            self.hw.write_reg(Reg::bg_hscroll(layer), hofs);
            self.hw.write_reg(Reg::bg_vscroll(layer), vofs);
            display = display.with_bg(layer, true);
        }
        self.hw.write_reg(Reg::DISPCNT, display.bits());

        self.build_oam();
        for (i, attrs) in self.oam.iter().enumerate() {
            for (k, word) in attrs.words().into_iter().enumerate() {
                self.hw.write_oam(i * OAM_ENTRY_WORDS + k, word);
            }
        }
    }

    fn check_save(&mut self) {
        if self.frame % u64::from(self.config.save_interval) != 0 {
            return;
        }
        if let Some(bytes) = self.save.take_changed() {
            trace!("writing save image");
            self.hw.write_saved_bytes(bytes);
        }
    }

    /// Run a scene's `init`.
    pub fn start(&mut self, scene: &mut dyn Scene<H>) -> Result<()> {
        scene.init(self)
    }

    /// Run one frame: poll keys, update the scene and sprites, wait for the vertical blank,
    /// draw, and switch scenes if the update asked for it.
    pub fn step(&mut self, scene: &mut Box<dyn Scene<H>>) -> Result<()> {
        self.poll_keys();
        let frame = self.frame;
        let next = scene.update(self, frame)?;
        self.sprites.update();
        self.frame = self.frame.wrapping_add(1);

        vsync_wait(&mut self.hw);
        self.draw();
        self.check_save();

        if let Some(next) = next {
            scene.unload(self)?;
            self.sprites.clear_active();
            *scene = next;
            info!("scene change at frame {}", self.frame);
            scene.init(self)?;
        }
        Ok(())
    }

    /// Run the game until an error, then show the error screen and stop.
    pub fn run(mut self, mut scene: Box<dyn Scene<H>>) -> ! {
        let err = match self.start(scene.as_mut()) {
            Ok(()) => loop {
                if let Err(err) = self.step(&mut scene) {
                    break err;
                }
            },
            Err(err) => err,
        };
        self.fatal(&err);
        loop {
            self.hw.halt();
        }
    }

    /// Switch to the bitmap mode and paint the screen red.
    pub fn fatal(&mut self, err: &Error) {
        error!("fatal: {}", err);
        let display = DisplayControl::new(DisplayMode::Mode3).with_bg(2, true);
        self.hw.write_reg(Reg::DISPCNT, display.bits());
        let red = Rgb15::RED.0;
        self.hw.write_vram_words(0, core::iter::repeat(red).take(SCREEN_WIDTH * SCREEN_HEIGHT));
    }
}

impl<H: HardwareIo + core::fmt::Debug> core::fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("hw", &self.hw)
            .field("config", &self.config)
            .field("frame", &self.frame)
            .field("active_sprites", &self.sprites.active().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::*;
    use crate::asset::blob::tests::build;
    use crate::sys::fixed::V2;
    use crate::sys::host::HostIo;
    use crate::sys::video::{MAP_BASE_BLOCK, SCREEN_BLOCK_WORDS};

    fn engine(config: EngineConfig) -> Engine<HostIo> {
        Engine::new(HostIo::new(), config).unwrap()
    }

    fn sprite_tiles(engine: &mut Engine<HostIo>) -> TileSetId {
        let blob = build(0x0808, 8, 8, &[[0x33; 32]; 4], &[0x10; 16], &[]);
        engine.assets_mut().add_tileset(blob, Bank::Sprite, None).unwrap()
    }

    /// Counts lifecycle calls and switches to `next` on the given frame.
    struct Recorder {
        log: Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
        switch_at: Option<u64>,
    }

    impl Scene<HostIo> for Recorder {
        fn init(&mut self, _engine: &mut Engine<HostIo>) -> Result<()> {
            self.log.borrow_mut().push(self.name);
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine<HostIo>, frame: u64) -> Result<Option<Box<dyn Scene<HostIo>>>> {
            if Some(frame) == self.switch_at {
                let ts = sprite_tiles(engine);
                let id = engine.new_sprite(ts);
                engine.show_sprite(id)?;
                return Ok(Some(Box::new(Recorder { log: self.log.clone(), name: "next", switch_at: None })));
            }
            if engine.pressed(Key::START) {
                return Err(Error::InvalidAsset("start pressed"));
            }
            Ok(None)
        }

        fn unload(&mut self, _engine: &mut Engine<HostIo>) -> Result<()> {
            self.log.borrow_mut().push("unload");
            Ok(())
        }
    }

    fn recorder(switch_at: Option<u64>) -> (Box<dyn Scene<HostIo>>, Rc<RefCell<Vec<&'static str>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Box::new(Recorder { log: log.clone(), name: "first", switch_at }), log)
    }

    #[test]
    fn config_defaults_and_validation() {
        let config = EngineConfig::default();
        assert_eq!(config.max_sprites, 128);
        assert_eq!(config.save_interval, 10);
        assert!(config.validate().is_ok());
        assert!(EngineConfig { max_sprites: 513, ..config }.validate().is_err());
        assert!(EngineConfig { save_interval: 0, ..config }.validate().is_err());
        assert!(Engine::new(HostIo::new(), EngineConfig { rng_seed: 0, ..config }).is_err());
    }

    #[test]
    fn new_engine_blanks_the_display() {
        let e = engine(EngineConfig::DEFAULT);
        assert_eq!(e.hw().reg(Reg::DISPCNT), 0x0040 | 0x0080);
    }

    #[test]
    fn shown_sprite_lands_in_oam_and_the_rest_is_hidden() {
        let mut e = engine(EngineConfig::DEFAULT);
        let ts = sprite_tiles(&mut e);
        let id = e.new_sprite(ts);
        e.sprite_mut(id).unwrap().pos = V2::from_ints(12, 34);
        e.sprite_mut(id).unwrap().tile_index = 2;
        e.show_sprite(id).unwrap();
        e.draw();

        let oam = e.hw().oam();
        assert_eq!(oam[0], 34);
        assert_eq!(oam[1], 12);
        assert_eq!(oam[2], 2);
        for i in 1..OAM_ENTRIES {
            assert_eq!(&oam[i * 4..i * 4 + 3], &ObjAttrs::HIDDEN.words());
        }
        assert_eq!(e.hw().reg(Reg::DISPCNT), 0x1000 | 0x0040);
    }

    #[test]
    fn hidden_sprite_keeps_its_tileset() {
        let mut e = engine(EngineConfig::DEFAULT);
        let ts = sprite_tiles(&mut e);
        let id = e.new_sprite(ts);
        e.show_sprite(id).unwrap();
        e.hide_sprite(id);
        e.draw();
        assert_eq!(e.oam()[0], ObjAttrs::HIDDEN);
        assert!(e.assets().tileset(ts).unwrap().is_loaded());

        e.remove_sprite(id).unwrap();
        assert!(!e.assets().tileset(ts).unwrap().is_loaded());
        assert_eq!(e.sprite(id), Err(Error::StaleHandle));
    }

    #[test]
    fn default_limit_rejects_the_129th_sprite() {
        let mut e = engine(EngineConfig::DEFAULT);
        let ts = sprite_tiles(&mut e);
        for _ in 0..128 {
            let id = e.new_sprite(ts);
            e.show_sprite(id).unwrap();
        }
        let extra = e.new_sprite(ts);
        assert_eq!(e.show_sprite(extra), Err(Error::TooManyActive { what: "sprites", limit: 128 }));
        assert_eq!(e.assets().tileset_users(ts), Ok(129));
    }

    #[test]
    fn oversubscribed_oam_rotates_through_every_sprite() {
        let mut e = engine(EngineConfig { max_sprites: 200, ..EngineConfig::DEFAULT });
        let ts = sprite_tiles(&mut e);
        for i in 0..200 {
            let id = e.new_sprite(ts);
            e.sprite_mut(id).unwrap().tile_index = i;
            e.show_sprite(id).unwrap();
        }

        let mut seen = [false; 200];
        for _ in 0..60 {
            e.build_oam();
            let mut frame: Vec<u16> = e.oam().iter().map(|a| a.tile_index()).collect();
            frame.sort_unstable();
            frame.dedup();
            assert_eq!(frame.len(), OAM_ENTRIES);
            for t in frame {
                seen[t as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn background_tileset_cannot_back_a_sprite() {
        let mut e = engine(EngineConfig::DEFAULT);
        let blob = build(0x0808, 8, 8, &[[0x77; 32]], &[0x10; 16], &[]);
        let ts = e.assets_mut().add_tileset(blob, Bank::Background, None).unwrap();
        let id = e.new_sprite(ts);
        assert_eq!(e.show_sprite(id), Err(Error::InvalidAsset("sprites need a sprite tileset")));
        assert!(!e.sprites().is_active(id));
        assert_eq!(e.sprites().is_loaded(id), Ok(false));
        assert_eq!(e.assets().tileset_users(ts), Ok(0));
        assert_eq!(e.assets().vram().bg_tiles.free_cells(), crate::sys::video::BG_TILE_CELLS);
    }

    #[test]
    fn background_registers_and_tiles_are_written_on_draw() {
        let mut e = engine(EngineConfig::DEFAULT);
        let blob = build(0x0808, 512, 160, &[[0x44; 32]; 2], &[0x20; 16], &[0, 1]);
        let map = e.assets_mut().add_tilemap(blob, None).unwrap();
        let bg = e.new_background(map, 1);
        assert_eq!(e.add_background(bg), Ok(0));
        e.scroll_background(bg, Fix8::new(3, 0x80), -Fix8::ONE).unwrap();
        assert_eq!(e.set_tile(bg, 32, 0, 2), Ok(true));
        e.draw();

        assert_eq!(e.hw().reg(Reg::bg_control(0)), 1 | 16 << 8 | 1 << 14);
        assert_eq!(e.hw().reg(Reg::bg_hscroll(0)), 3);
        assert_eq!(e.hw().reg(Reg::bg_vscroll(0)), 0xFFFF);
        assert_eq!(e.hw().reg(Reg::DISPCNT), 0x0100 | 0x1000 | 0x0040);
        let base = MAP_BASE_BLOCK * SCREEN_BLOCK_WORDS;
        assert_eq!(e.hw().vram()[base + 1], 1);
        assert_eq!(e.hw().vram()[base + 1024], 2);

        e.unload_background(bg).unwrap();
        e.draw();
        assert_eq!(e.hw().reg(Reg::DISPCNT), 0x1000 | 0x0040);
        assert_eq!(e.assets().vram().bg_palettes.used_slots(), 0);
    }

    #[test]
    fn scene_change_unloads_clears_sprites_and_inits() {
        let mut e = engine(EngineConfig::DEFAULT);
        let (mut scene, log) = recorder(Some(1));
        e.start(scene.as_mut()).unwrap();
        e.step(&mut scene).unwrap();
        assert_eq!(*log.borrow(), ["first"]);

        e.step(&mut scene).unwrap();
        assert_eq!(*log.borrow(), ["first", "unload", "next"]);
        assert!(e.sprites().active().is_empty());
        assert_eq!(e.frame(), 2);
    }

    /// Registers its map every time it starts and deletes its background on the way out.
    struct Level {
        blob: &'static [u8],
        bg: Option<BackgroundId>,
    }

    impl Scene<HostIo> for Level {
        fn init(&mut self, engine: &mut Engine<HostIo>) -> Result<()> {
            let map = engine.assets_mut().add_tilemap(self.blob, None)?;
            let bg = engine.new_background(map, 0);
            engine.add_background(bg)?;
            engine.set_tile(bg, 5, 5, 1)?;
            self.bg = Some(bg);
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine<HostIo>, _frame: u64) -> Result<Option<Box<dyn Scene<HostIo>>>> {
            if let Some(bg) = self.bg {
                engine.set_tile(bg, 7, 5, 2)?;
            }
            Ok(Some(Box::new(Level { blob: self.blob, bg: None })))
        }

        fn unload(&mut self, engine: &mut Engine<HostIo>) -> Result<()> {
            if let Some(bg) = self.bg.take() {
                engine.delete_background(bg)?;
            }
            Ok(())
        }
    }

    #[test]
    fn cycling_scenes_keeps_the_tables_bounded() {
        let mut e = engine(EngineConfig::DEFAULT);
        let blob = build(0x0808, 512, 512, &[[0x55; 32]; 2], &[0x30; 16], &[1; 64]);
        let mut scene: Box<dyn Scene<HostIo>> = Box::new(Level { blob, bg: None });
        e.start(scene.as_mut()).unwrap();
        for _ in 0..100 {
            e.step(&mut scene).unwrap();
        }
        assert_eq!(e.assets().counts(), (1, 1, 1));
        assert_eq!(e.backgrounds().len(), 1);
        assert_eq!(e.backgrounds().layers().count(), 1);

        // the map was reset from its blob on re-entry before the new edit
        let map = e.backgrounds().layers().map(|(_, bg)| bg.tilemap()).next().unwrap();
        assert_eq!(e.assets().tilemap_users(map), Ok(1));
        assert_eq!(e.assets().tilemap(map).unwrap().tile(5, 5), Some(1));
        assert_eq!(e.assets().tilemap(map).unwrap().tile(7, 5), Some(0));
        assert_eq!(e.assets().tilemap(map).unwrap().tile(1, 0), Some(1));
        assert_eq!(e.assets().vram().screen_blocks.free_cells(), crate::sys::video::MAP_BLOCK_CELLS - 4);
    }

    #[test]
    fn keys_are_latched_before_update() {
        let mut e = engine(EngineConfig::DEFAULT);
        let (mut scene, _log) = recorder(None);
        e.start(scene.as_mut()).unwrap();
        e.hw_mut().set_keys(0x3FF & !Key::A.bits());
        e.step(&mut scene).unwrap();
        assert!(e.pressed(Key::A));
        assert!(e.just_pressed(Key::A));

        e.hw_mut().set_keys(0x3FF & !Key::START.bits());
        assert_eq!(e.step(&mut scene), Err(Error::InvalidAsset("start pressed")));
        assert!(e.just_released(Key::A));
    }

    #[test]
    fn save_is_written_only_on_interval_frames_when_changed() {
        let mut e = engine(EngineConfig::DEFAULT);
        let (mut scene, _log) = recorder(None);
        e.start(scene.as_mut()).unwrap();
        for _ in 0..10 {
            e.step(&mut scene).unwrap();
        }
        assert_eq!(e.hw().save_writes(), 0);

        e.save_mut()[0] = 7;
        for _ in 0..9 {
            e.step(&mut scene).unwrap();
        }
        assert_eq!(e.hw().save_writes(), 0);
        e.step(&mut scene).unwrap();
        assert_eq!(e.hw().save_writes(), 1);
        assert_eq!(e.hw().saved()[0], 7);

        for _ in 0..10 {
            e.step(&mut scene).unwrap();
        }
        assert_eq!(e.hw().save_writes(), 1);
    }

    #[test]
    fn frame_counter_runs_past_32_bits() {
        let mut e = engine(EngineConfig::DEFAULT);
        let (mut scene, log) = recorder(Some(u64::from(u32::MAX) + 1));
        e.start(scene.as_mut()).unwrap();
        e.frame = u64::from(u32::MAX);
        e.step(&mut scene).unwrap();
        assert_eq!(e.frame(), 1 << 32);
        e.step(&mut scene).unwrap();
        assert_eq!(e.frame(), (1 << 32) + 1);
        assert_eq!(e.sprites().active().len(), 0);
        assert_eq!(*log.borrow(), ["first", "unload", "next"]);
    }

    #[test]
    fn fatal_paints_the_screen_red() {
        let mut e = engine(EngineConfig::DEFAULT);
        e.fatal(&Error::StaleHandle);
        assert_eq!(e.hw().reg(Reg::DISPCNT), 3 | 0x0400);
        let pixels = &e.hw().vram()[..SCREEN_WIDTH * SCREEN_HEIGHT];
        assert!(pixels.iter().all(|&p| p == 0x001F));
    }
}
