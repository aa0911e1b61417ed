use log::debug;

use crate::asset::blob::TileSetBlob;
use crate::asset::PaletteId;
use crate::error::{Bank, Result};
use crate::sys::alloc::VramAlloc;
use crate::sys::hw::HardwareIo;
use crate::sys::video::{Shape, SpriteSize, BG_TILE_BASE, SPRITE_TILE_BASE, TILE_WORDS};

/// A run of 8×8 4bpp tiles sharing one palette.
///
/// Loading a tileset copies its pixels into the tile pool of its bank and records the cell
/// offset they landed at; tile map entries and sprite tile indices are rebased by that offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSet {
    blob: TileSetBlob,
    bank: Bank,
    palette: PaletteId,
    offset: Option<usize>,
}

impl TileSet {
    pub(crate) fn new(blob: TileSetBlob, bank: Bank, palette: PaletteId) -> Self {
        Self { blob, bank, palette, offset: None }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.blob.tile_count()
    }

    /// Whether this tileset was registered from `blob` for `bank` with `palette`.
    pub(crate) fn is_interned(&self, blob: &TileSetBlob, bank: Bank, palette: PaletteId) -> bool {
        self.blob.source() == blob.source() && self.bank == bank && self.palette == palette
    }

    #[inline]
    pub fn bank(&self) -> Bank {
        self.bank
    }

    #[inline]
    pub fn palette(&self) -> PaletteId {
        self.palette
    }

    /// Sprite shape and size of one frame of this tileset.
    #[inline]
    pub fn shape(&self) -> (Shape, SpriteSize) {
        self.blob.shape()
    }

    /// Cell offset of the first tile in its pool, while loaded.
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.offset.is_some()
    }

    /// Claim cells and copy the pixels in, one 16-bit word at a time. Loading twice is a no-op.
    ///
    /// The palette is not touched here; the asset table loads it first.
    pub fn load<H: HardwareIo, const N: usize>(&mut self, hw: &mut H, alloc: &mut VramAlloc<N>) -> Result<usize> {
        if let Some(offset) = self.offset {
            return Ok(offset);
        }
        let offset = alloc.alloc(self.count())?;
        let base = match self.bank {
            Bank::Background => BG_TILE_BASE,
            Bank::Sprite => SPRITE_TILE_BASE,
        };
        hw.write_vram_words(base + offset * TILE_WORDS, self.blob.pixel_words());
        debug!("loaded {} {} tiles at cell {}", self.count(), self.bank, offset);
        self.offset = Some(offset);
        Ok(offset)
    }

    pub fn free<const N: usize>(&mut self, alloc: &mut VramAlloc<N>) {
        if let Some(offset) = self.offset.take() {
            alloc.free(offset);
            debug!("freed {} {} tiles at cell {}", self.count(), self.bank, offset);
        }
    }
}
