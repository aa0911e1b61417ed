use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::asset::blob::TileMapBlob;
use crate::asset::TileSetId;
use crate::error::Result;
use crate::sys::alloc::VramAlloc;
use crate::sys::hw::HardwareIo;
use crate::sys::video::{BgSize, TileEntry, MAP_BASE_BLOCK, SCREEN_BLOCK_WORDS};

/// Entries a tile map remembers between flushes before falling back to a full rewrite.
pub const DIRTY_CAPACITY: usize = 64;

/// The tile grid of one background.
///
/// The grid holds tileset-relative entries. While loaded the map owns `size.screens()`
/// consecutive screen-blocks, holding the same grid rebased onto where its tileset and palette
/// landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    tileset: TileSetId,
    size: BgSize,
    grid: Vec<u16>,
    dirty: heapless::Vec<u16, DIRTY_CAPACITY>,
    rewrite: bool,
    block: Option<usize>,
    source: Option<*const u8>,
}

impl TileMap {
    pub(crate) fn new(blob: &TileMapBlob, tileset: TileSetId) -> Self {
        let size = blob.size();
        let mut grid = Vec::with_capacity(size.entries());
        grid.extend(blob.words());
        grid.resize(size.entries(), 0);
        Self {
            tileset,
            size,
            grid,
            dirty: heapless::Vec::new(),
            rewrite: false,
            block: None,
            source: Some(blob.source()),
        }
    }

    /// An all-transparent map of the given size.
    pub(crate) fn blank(size: BgSize, tileset: TileSetId) -> Self {
        Self {
            tileset,
            size,
            grid: alloc::vec![0; size.entries()],
            dirty: heapless::Vec::new(),
            rewrite: false,
            block: None,
            source: None,
        }
    }

    /// Whether this map was registered from `blob`. Blank maps match nothing.
    pub(crate) fn is_interned(&self, blob: &TileMapBlob) -> bool {
        self.source == Some(blob.source())
    }

    #[inline]
    pub fn size(&self) -> BgSize {
        self.size
    }

    #[inline]
    pub fn tileset(&self) -> TileSetId {
        self.tileset
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.block.is_some()
    }

    /// First screen-block index in the map pool, while loaded.
    #[inline]
    pub fn block(&self) -> Option<usize> {
        self.block
    }

    /// The screen base block a background control register needs to show this map.
    #[inline]
    pub fn screen_base_block(&self) -> Option<u8> {
        self.block.map(|b| (b + MAP_BASE_BLOCK) as u8)
    }

    /// The raw, tileset-relative entry at `(x, y)`.
    pub fn tile(&self, x: usize, y: usize) -> Option<u16> {
        self.size.linear_index(x, y).map(|i| self.grid[i])
    }

    /// Number of entries waiting for the next flush.
    #[inline]
    pub fn pending(&self) -> usize {
        if self.rewrite {
            self.grid.len()
        } else {
            self.dirty.len()
        }
    }

    /// Change the entry at `(x, y)`. Returns `false` if the coordinates are off the map.
    ///
    /// The change reaches video memory on the next flush.
    pub fn set_tile(&mut self, x: usize, y: usize, raw: u16) -> bool {
        let Some(index) = self.size.linear_index(x, y) else {
            return false;
        };
        if self.grid[index] == raw {
            return true;
        }
        self.grid[index] = raw;
        if !self.rewrite && !self.dirty.contains(&(index as u16)) && self.dirty.push(index as u16).is_err() {
            warn!("tile map dirty list overflowed, rewriting the whole map on next flush");
            self.rewrite = true;
        }
        true
    }

    #[inline]
    fn vram_word(block: usize, index: usize) -> usize {
        (MAP_BASE_BLOCK + block) * SCREEN_BLOCK_WORDS + index
    }

    /// Claim screen-blocks and write the rebased grid. If the map is already loaded, only the
    /// entries changed since the last flush are written.
    pub fn load<H: HardwareIo, const N: usize>(
        &mut self,
        hw: &mut H,
        alloc: &mut VramAlloc<N>,
        tile_offset: u16,
        palette: u8,
    ) -> Result<usize> {
        if let Some(block) = self.block {
            self.flush(hw, tile_offset, palette);
            return Ok(block);
        }
        let block = alloc.alloc(self.size.screens())?;
        self.block = Some(block);
        self.rewrite = true;
        self.flush(hw, tile_offset, palette);
        debug!("loaded {:?} tile map at screen-block {}", self.size, block + MAP_BASE_BLOCK);
        Ok(block)
    }

    /// Write pending changes to video memory. Does nothing while unloaded.
    pub fn flush<H: HardwareIo>(&mut self, hw: &mut H, tile_offset: u16, palette: u8) {
        let Some(block) = self.block else {
            return;
        };
        let rebase = |raw: u16| TileEntry::from_bits(raw).rebase(tile_offset, palette).bits();
        if self.rewrite {
            hw.write_vram_words(Self::vram_word(block, 0), self.grid.iter().map(|&raw| rebase(raw)));
        } else {
            for &index in self.dirty.iter() {
                let index = index as usize;
                hw.write_vram(Self::vram_word(block, index), rebase(self.grid[index]));
            }
        }
        if !self.dirty.is_empty() || self.rewrite {
            trace!("flushed {} tile map entries", self.pending());
        }
        self.dirty.clear();
        self.rewrite = false;
    }

    pub fn free<const N: usize>(&mut self, alloc: &mut VramAlloc<N>) {
        if let Some(block) = self.block.take() {
            alloc.free(block);
            self.dirty.clear();
            self.rewrite = false;
            debug!("freed {:?} tile map at screen-block {}", self.size, block + MAP_BASE_BLOCK);
        }
    }
}
