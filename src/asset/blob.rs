//! Zero-copy views over the packed asset blobs produced by the offline image builder.
//!
//! All multi-byte fields are little-endian. Nothing is copied out of the blob: pixel, colour
//! and map words are decoded on the fly as they are streamed into video memory.

use crate::error::{Error, Result};
use crate::sys::video::{sprite_shape_for, BgSize, Rgb15, Shape, SpriteSize, PALETTE_COLORS, TILE_BYTES};

/// Bytes in a packed 16 colour palette.
pub const PALETTE_BYTES: usize = PALETTE_COLORS * 2;
/// Bytes in the shared tileset/tilemap header.
pub const HEADER_BYTES: usize = 16;

#[inline]
fn word_at(bytes: &[u8], index: usize) -> u16 {
    u16::from_le_bytes([bytes[2 * index], bytes[2 * index + 1]])
}

#[inline]
fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

/// A `.p4` palette: 16 little-endian colour words, entry 0 transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteBlob(&'static [u8]);

impl PaletteBlob {
    pub fn parse(bytes: &'static [u8]) -> Result<Self> {
        if bytes.len() != PALETTE_BYTES {
            return Err(Error::InvalidAsset("palette blob must be exactly 32 bytes"));
        }
        Ok(Self(bytes))
    }

    #[inline]
    pub fn color(&self, index: usize) -> Rgb15 {
        Rgb15(word_at(self.0, index))
    }

    pub fn colors(&self) -> [Rgb15; PALETTE_COLORS] {
        core::array::from_fn(|i| self.color(i))
    }

    /// The address of the backing bytes. Two blobs with the same address are the same palette.
    #[inline]
    pub fn source(&self) -> *const u8 {
        self.0.as_ptr()
    }
}

/// The 16 byte header shared by `.ts4` and `.tm4` blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// `width_px << 8 | height_px` of one sprite frame, or 0x0808 for background tiles.
    pub size_code: u16,
    pub width_px: u32,
    pub height_px: u32,
    pub tile_count: u32,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_BYTES {
            return Err(Error::InvalidAsset("blob shorter than its header"));
        }
        Ok(Self {
            size_code: word_at(bytes, 0),
            width_px: u32_at(bytes, 4),
            height_px: u32_at(bytes, 8),
            tile_count: u32_at(bytes, 12),
        })
    }

    /// Frame width and height in pixels, from the size code.
    #[inline]
    pub const fn frame_size(&self) -> (u8, u8) {
        ((self.size_code >> 8) as u8, self.size_code as u8)
    }
}

/// A `.ts4` tileset: header, `tile_count` packed 4bpp tiles, then the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSetBlob {
    header: Header,
    pixels: &'static [u8],
    palette: PaletteBlob,
}

impl TileSetBlob {
    pub fn parse(bytes: &'static [u8]) -> Result<Self> {
        let (blob, rest) = Self::parse_prefix(bytes)?;
        if !rest.is_empty() {
            return Err(Error::InvalidAsset("trailing bytes after tileset palette"));
        }
        Ok(blob)
    }

    /// Parse the tileset at the start of `bytes`, returning whatever follows it.
    fn parse_prefix(bytes: &'static [u8]) -> Result<(Self, &'static [u8])> {
        let header = Header::parse(bytes)?;
        let pixel_len = (header.tile_count as usize)
            .checked_mul(TILE_BYTES)
            .ok_or(Error::InvalidAsset("tile count overflows"))?;
        let pixel_end = HEADER_BYTES + pixel_len;
        let palette_end = pixel_end + PALETTE_BYTES;
        if bytes.len() < palette_end {
            return Err(Error::InvalidAsset("tile count larger than the pixel data"));
        }
        if sprite_shape_for(header.frame_size().0, header.frame_size().1).is_none() {
            return Err(Error::InvalidAsset("unknown tile size code"));
        }
        let blob = Self {
            header,
            pixels: &bytes[HEADER_BYTES..pixel_end],
            palette: PaletteBlob::parse(&bytes[pixel_end..palette_end])?,
        };
        Ok((blob, &bytes[palette_end..]))
    }

    #[inline]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub const fn tile_count(&self) -> usize {
        self.header.tile_count as usize
    }

    #[inline]
    pub const fn palette(&self) -> PaletteBlob {
        self.palette
    }

    /// Sprite shape and size of one frame.
    #[inline]
    pub fn shape(&self) -> (Shape, SpriteSize) {
        let (w, h) = self.header.frame_size();
        sprite_shape_for(w, h).unwrap_or_default()
    }

    /// The address of the pixel data. Two blobs with the same address are the same tileset.
    #[inline]
    pub fn source(&self) -> *const u8 {
        self.pixels.as_ptr()
    }

    /// Pixel data as 16-bit words, in VRAM order.
    pub fn pixel_words(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.pixels.len() / 2).map(move |i| word_at(self.pixels, i))
    }
}

/// A `.tm4` tilemap: a complete tileset followed by tileset-relative map words in screen-block
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMapBlob {
    tileset: TileSetBlob,
    size: BgSize,
    words: &'static [u8],
}

impl TileMapBlob {
    pub fn parse(bytes: &'static [u8]) -> Result<Self> {
        let (tileset, words) = TileSetBlob::parse_prefix(bytes)?;
        let header = tileset.header();
        let size = BgSize::for_pixels(header.width_px, header.height_px)
            .ok_or(Error::InvalidAsset("tilemap larger than 512x512 pixels"))?;
        if words.len() % 2 != 0 {
            return Err(Error::InvalidAsset("odd number of tilemap bytes"));
        }
        if words.len() / 2 > size.entries() {
            return Err(Error::InvalidAsset("more map words than the background holds"));
        }
        Ok(Self { tileset, size, words })
    }

    #[inline]
    pub const fn tileset(&self) -> TileSetBlob {
        self.tileset
    }

    #[inline]
    pub const fn size(&self) -> BgSize {
        self.size
    }

    #[inline]
    pub fn source(&self) -> *const u8 {
        self.tileset.source()
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.words.len() / 2
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len()).map(move |i| word_at(self.words, i))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;

    /// Build a blob and leak it, standing in for an `include_bytes!` asset.
    pub(crate) fn build(size_code: u16, w: u32, h: u32, tiles: &[[u8; 32]], palette: &[u16; 16], map: &[u16]) -> &'static [u8] {
        let mut out = Vec::new();
        out.extend_from_slice(&size_code.to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&w.to_le_bytes());
        out.extend_from_slice(&h.to_le_bytes());
        out.extend_from_slice(&(tiles.len() as u32).to_le_bytes());
        for t in tiles {
            out.extend_from_slice(t);
        }
        for c in palette {
            out.extend_from_slice(&c.to_le_bytes());
        }
        for m in map {
            out.extend_from_slice(&m.to_le_bytes());
        }
        out.leak()
    }

    pub(crate) fn palette_bytes(colors: &[u16; 16]) -> &'static [u8] {
        colors.iter().flat_map(|c| c.to_le_bytes()).collect::<Vec<_>>().leak()
    }

    #[test]
    fn palette_words_are_little_endian() {
        let mut colors = [0u16; 16];
        colors[1] = 0x7C1F;
        let pal = PaletteBlob::parse(palette_bytes(&colors)).unwrap();
        assert_eq!(pal.color(1), Rgb15(0x7C1F));
        assert!(PaletteBlob::parse(&[0; 30]).is_err());
    }

    #[test]
    fn tileset_header_and_pixels() {
        let mut tile = [0u8; 32];
        tile[0] = 0x21;
        tile[1] = 0x43;
        let bytes = build(0x1010, 16, 16, &[tile; 4], &[1; 16], &[]);
        let ts = TileSetBlob::parse(bytes).unwrap();
        assert_eq!(ts.tile_count(), 4);
        assert_eq!(ts.shape(), (Shape::Square, SpriteSize::Medium));
        assert_eq!(ts.pixel_words().count(), 64);
        assert_eq!(ts.pixel_words().next(), Some(0x4321));
        assert_eq!(ts.palette().color(15), Rgb15(1));
    }

    #[test]
    fn tileset_rejects_inconsistent_lengths() {
        let bytes = build(0x0808, 8, 8, &[[0; 32]; 2], &[0; 16], &[]);
        assert!(TileSetBlob::parse(&bytes[..bytes.len() - 1]).is_err());
        assert!(TileSetBlob::parse(&bytes[..10]).is_err());
        let bad_code = build(0x0909, 8, 8, &[[0; 32]], &[0; 16], &[]);
        assert_eq!(TileSetBlob::parse(bad_code), Err(Error::InvalidAsset("unknown tile size code")));
    }

    #[test]
    fn tilemap_size_follows_pixel_dimensions() {
        let map = build(0x0808, 512, 160, &[[0; 32]], &[0; 16], &[1, 2, 3]);
        let tm = TileMapBlob::parse(map).unwrap();
        assert_eq!(tm.size(), BgSize::Wide);
        assert_eq!(tm.words().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(tm.tileset().tile_count(), 1);
    }

    #[test]
    fn tilemap_rejects_too_many_words() {
        let words = [0u16; 1025];
        let map = build(0x0808, 240, 160, &[[0; 32]], &[0; 16], &words);
        assert!(TileMapBlob::parse(map).is_err());
    }
}
