//! Graphics assets and the table that tracks which of them are resident in video memory.
//!
//! Assets are registered once from static blobs and named by small copyable handles. Each entry
//! counts its users: a sprite, background, tile map or tileset acquires its dependency once when
//! it loads and releases it once when it unloads, and video memory is only handed back when the
//! last user is gone. Loads that fail part way release whatever they acquired, so an error never
//! leaves half an asset behind.
//!
//! Registering the same blob again returns the existing handle, so a scene that registers its
//! assets every time it starts does not grow the table. Blank tile maps have no blob to match on
//! and are given back with [`Assets::remove_tilemap`].

pub mod blob;
pub mod palette;
pub mod tilemap;
pub mod tileset;

use alloc::vec::Vec;

use crate::error::{Bank, Error, Pool, Result};
use crate::sys::alloc::{PalAlloc, VramAlloc};
use crate::sys::hw::HardwareIo;
use crate::sys::video::{BgSize, Rgb15, Shape, SpriteSize, BG_TILE_CELLS, MAP_BLOCK_CELLS, SPRITE_TILE_CELLS};

use self::blob::{PaletteBlob, TileMapBlob, TileSetBlob};
use self::palette::Palette;
use self::tilemap::TileMap;
use self::tileset::TileSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaletteId(pub(crate) u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSetId(pub(crate) u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileMapId(pub(crate) u16);

/// The five video memory allocators.
#[derive(Debug, Clone)]
pub struct Vram {
    pub bg_tiles: VramAlloc<BG_TILE_CELLS>,
    pub sprite_tiles: VramAlloc<SPRITE_TILE_CELLS>,
    pub screen_blocks: VramAlloc<MAP_BLOCK_CELLS>,
    pub bg_palettes: PalAlloc,
    pub sprite_palettes: PalAlloc,
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

impl Vram {
    pub const fn new() -> Self {
        Self {
            bg_tiles: VramAlloc::new(Pool::BgTiles),
            sprite_tiles: VramAlloc::new(Pool::SpriteTiles),
            screen_blocks: VramAlloc::new(Pool::ScreenBlocks),
            bg_palettes: PalAlloc::new(Bank::Background),
            sprite_palettes: PalAlloc::new(Bank::Sprite),
        }
    }

    #[inline]
    pub fn tiles(&mut self, bank: Bank) -> &mut VramAlloc<BG_TILE_CELLS> {
        match bank {
            Bank::Background => &mut self.bg_tiles,
            Bank::Sprite => &mut self.sprite_tiles,
        }
    }

    #[inline]
    pub fn palettes(&mut self, bank: Bank) -> &mut PalAlloc {
        match bank {
            Bank::Background => &mut self.bg_palettes,
            Bank::Sprite => &mut self.sprite_palettes,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    asset: T,
    users: u16,
}

impl<T> Entry<T> {
    const fn new(asset: T) -> Self {
        Self { asset, users: 0 }
    }
}

fn entry<T>(entries: &[Entry<T>], index: u16) -> Result<&Entry<T>> {
    entries.get(index as usize).ok_or(Error::StaleHandle)
}

fn entry_mut<T>(entries: &mut [Entry<T>], index: u16) -> Result<&mut Entry<T>> {
    entries.get_mut(index as usize).ok_or(Error::StaleHandle)
}

fn slot<T>(entries: &[Option<Entry<T>>], index: u16) -> Result<&Entry<T>> {
    entries.get(index as usize).and_then(Option::as_ref).ok_or(Error::StaleHandle)
}

fn slot_mut<T>(entries: &mut [Option<Entry<T>>], index: u16) -> Result<&mut Entry<T>> {
    entries.get_mut(index as usize).and_then(Option::as_mut).ok_or(Error::StaleHandle)
}

/// Where a loaded tileset sits, as needed to build map entries and sprite attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Cell offset of the first tile.
    pub offset: u16,
    /// Palette slot within the bank.
    pub palette: u8,
    pub shape: Shape,
    pub size: SpriteSize,
}

/// The asset table.
#[derive(Debug, Default)]
pub struct Assets {
    palettes: Vec<Entry<Palette>>,
    tilesets: Vec<Entry<TileSet>>,
    tilemaps: Vec<Option<Entry<TileMap>>>,
    vram: Vram,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vram(&self) -> &Vram {
        &self.vram
    }

    fn intern_palette(&mut self, blob: PaletteBlob, bank: Bank, transparent: Option<Rgb15>) -> PaletteId {
        if let Some(i) = self.palettes.iter().position(|e| e.asset.is_interned(&blob, bank, transparent)) {
            return PaletteId(i as u16);
        }
        self.palettes.push(Entry::new(Palette::new(blob, bank, transparent)));
        PaletteId((self.palettes.len() - 1) as u16)
    }

    /// Register a `.p4` palette. Registering the same bytes twice for one bank gives the same
    /// handle.
    pub fn add_palette(&mut self, bytes: &'static [u8], bank: Bank, transparent: Option<Rgb15>) -> Result<PaletteId> {
        Ok(self.intern_palette(PaletteBlob::parse(bytes)?, bank, transparent))
    }

    /// Register a `.ts4` tileset and its embedded palette.
    pub fn add_tileset(&mut self, bytes: &'static [u8], bank: Bank, transparent: Option<Rgb15>) -> Result<TileSetId> {
        let blob = TileSetBlob::parse(bytes)?;
        Ok(self.push_tileset(blob, bank, transparent))
    }

    fn push_tileset(&mut self, blob: TileSetBlob, bank: Bank, transparent: Option<Rgb15>) -> TileSetId {
        let palette = self.intern_palette(blob.palette(), bank, transparent);
        if let Some(i) = self.tilesets.iter().position(|e| e.asset.is_interned(&blob, bank, palette)) {
            return TileSetId(i as u16);
        }
        self.tilesets.push(Entry::new(TileSet::new(blob, bank, palette)));
        TileSetId((self.tilesets.len() - 1) as u16)
    }

    fn insert_tilemap(&mut self, map: TileMap) -> TileMapId {
        if let Some(i) = self.tilemaps.iter().position(Option::is_none) {
            self.tilemaps[i] = Some(Entry::new(map));
            return TileMapId(i as u16);
        }
        self.tilemaps.push(Some(Entry::new(map)));
        TileMapId((self.tilemaps.len() - 1) as u16)
    }

    /// Register a `.tm4` tile map along with the background tileset it embeds.
    ///
    /// Registering a blob again gives the same handle. If nothing is using the map at that point
    /// its grid is reset to the blob's contents.
    pub fn add_tilemap(&mut self, bytes: &'static [u8], transparent: Option<Rgb15>) -> Result<TileMapId> {
        let blob = TileMapBlob::parse(bytes)?;
        let tileset = self.push_tileset(blob.tileset(), Bank::Background, transparent);
        let existing = self
            .tilemaps
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.asset.is_interned(&blob) && e.asset.tileset() == tileset));
        let Some(i) = existing else {
            return Ok(self.insert_tilemap(TileMap::new(&blob, tileset)));
        };
        let e = slot_mut(&mut self.tilemaps, i as u16)?;
        if e.users == 0 {
            e.asset = TileMap::new(&blob, tileset);
        }
        Ok(TileMapId(i as u16))
    }

    /// Register an empty map drawn with an existing background tileset.
    pub fn add_blank_tilemap(&mut self, size: BgSize, tileset: TileSetId) -> Result<TileMapId> {
        if self.tileset(tileset)?.bank() != Bank::Background {
            return Err(Error::InvalidAsset("tile maps need a background tileset"));
        }
        Ok(self.insert_tilemap(TileMap::blank(size, tileset)))
    }

    /// Drop a tile map from the table. The handle must not be used afterwards; its slot goes to
    /// the next map registered.
    pub fn remove_tilemap(&mut self, id: TileMapId) -> Result<()> {
        if slot(&self.tilemaps, id.0)?.users > 0 {
            return Err(Error::InUse { what: "tile map" });
        }
        self.tilemaps[id.0 as usize] = None;
        Ok(())
    }

    /// Registered palettes, tilesets and tile maps.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.palettes.len(), self.tilesets.len(), self.tilemaps.iter().flatten().count())
    }

    pub fn palette(&self, id: PaletteId) -> Result<&Palette> {
        entry(&self.palettes, id.0).map(|e| &e.asset)
    }

    pub fn tileset(&self, id: TileSetId) -> Result<&TileSet> {
        entry(&self.tilesets, id.0).map(|e| &e.asset)
    }

    pub fn tilemap(&self, id: TileMapId) -> Result<&TileMap> {
        slot(&self.tilemaps, id.0).map(|e| &e.asset)
    }

    pub fn palette_users(&self, id: PaletteId) -> Result<u16> {
        entry(&self.palettes, id.0).map(|e| e.users)
    }

    pub fn tileset_users(&self, id: TileSetId) -> Result<u16> {
        entry(&self.tilesets, id.0).map(|e| e.users)
    }

    pub fn tilemap_users(&self, id: TileMapId) -> Result<u16> {
        slot(&self.tilemaps, id.0).map(|e| e.users)
    }

    /// Acquire a palette, writing it to palette memory on first use. Returns its slot.
    pub fn load_palette<H: HardwareIo>(&mut self, hw: &mut H, id: PaletteId) -> Result<u8> {
        let e = entry_mut(&mut self.palettes, id.0)?;
        let bank = e.asset.bank();
        let slot = e.asset.load(hw, self.vram.palettes(bank))?;
        e.users += 1;
        Ok(slot)
    }

    /// Release a palette. Its slot is freed when the last user lets go.
    pub fn free_palette(&mut self, id: PaletteId) -> Result<()> {
        let e = entry_mut(&mut self.palettes, id.0)?;
        if e.users == 0 {
            return Ok(());
        }
        e.users -= 1;
        if e.users == 0 {
            let bank = e.asset.bank();
            e.asset.free(self.vram.palettes(bank));
        }
        Ok(())
    }

    /// Acquire a tileset and its palette, copying its tiles in on first use. Returns the cell
    /// offset of the first tile.
    pub fn load_tileset<H: HardwareIo>(&mut self, hw: &mut H, id: TileSetId) -> Result<usize> {
        let palette = self.tileset(id)?.palette();
        self.load_palette(hw, palette)?;

        let e = entry_mut(&mut self.tilesets, id.0)?;
        let bank = e.asset.bank();
        match e.asset.load(hw, self.vram.tiles(bank)) {
            Ok(offset) => {
                e.users += 1;
                Ok(offset)
            }
            Err(err) => {
                self.free_palette(palette)?;
                Err(err)
            }
        }
    }

    pub fn free_tileset(&mut self, id: TileSetId) -> Result<()> {
        let e = entry_mut(&mut self.tilesets, id.0)?;
        if e.users == 0 {
            return Ok(());
        }
        e.users -= 1;
        if e.users == 0 {
            let bank = e.asset.bank();
            e.asset.free(self.vram.tiles(bank));
        }
        let palette = e.asset.palette();
        self.free_palette(palette)
    }

    /// Where a loaded tileset sits in video memory.
    pub fn binding(&self, id: TileSetId) -> Result<Binding> {
        let tileset = self.tileset(id)?;
        let slot = self.palette(tileset.palette())?.slot();
        let (shape, size) = tileset.shape();
        match (tileset.offset(), slot) {
            (Some(offset), Some(palette)) => Ok(Binding { offset: offset as u16, palette, shape, size }),
            _ => Err(Error::StaleHandle),
        }
    }

    /// Acquire a tile map and everything under it, writing it to its screen-blocks on first use.
    /// Later loads flush the entries changed since the last flush. Returns the first
    /// screen-block of the map pool the map occupies.
    pub fn load_tilemap<H: HardwareIo>(&mut self, hw: &mut H, id: TileMapId) -> Result<usize> {
        let tileset = self.tilemap(id)?.tileset();
        let first_use = self.tilemap_users(id)? == 0;
        if first_use {
            self.load_tileset(hw, tileset)?;
        }
        let result = self.binding(tileset).and_then(|b| {
            let e = slot_mut(&mut self.tilemaps, id.0)?;
            e.asset.load(hw, &mut self.vram.screen_blocks, b.offset, b.palette)
        });
        match result {
            Ok(block) => {
                slot_mut(&mut self.tilemaps, id.0)?.users += 1;
                Ok(block)
            }
            Err(err) => {
                if first_use {
                    self.free_tileset(tileset)?;
                }
                Err(err)
            }
        }
    }

    pub fn free_tilemap(&mut self, id: TileMapId) -> Result<()> {
        let e = slot_mut(&mut self.tilemaps, id.0)?;
        if e.users == 0 {
            return Ok(());
        }
        e.users -= 1;
        if e.users > 0 {
            return Ok(());
        }
        e.asset.free(&mut self.vram.screen_blocks);
        let tileset = e.asset.tileset();
        self.free_tileset(tileset)
    }

    /// Change one entry of a tile map. See [`TileMap::set_tile`].
    pub fn set_tile(&mut self, id: TileMapId, x: usize, y: usize, raw: u16) -> Result<bool> {
        Ok(slot_mut(&mut self.tilemaps, id.0)?.asset.set_tile(x, y, raw))
    }

    /// Write the pending changes of every loaded tile map.
    pub fn flush_tilemaps<H: HardwareIo>(&mut self, hw: &mut H) {
        for i in 0..self.tilemaps.len() {
            let tileset = match &self.tilemaps[i] {
                Some(e) if e.asset.is_loaded() && e.asset.pending() > 0 => e.asset.tileset(),
                _ => continue,
            };
            let Ok(b) = self.binding(tileset) else {
                continue;
            };
            if let Some(e) = &mut self.tilemaps[i] {
                e.asset.flush(hw, b.offset, b.palette);
            }
        }
    }
}
