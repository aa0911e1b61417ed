//! Tile deduplication for the asset builder.
//!
//! Tiles that are mirror images of each other are stored once. Each tile is hashed in all four
//! flip orientations and the orientation whose MD5 has the largest byte sum (ties going to the
//! lexicographically greater digest) is kept as the stored form. Map entries then point at the
//! stored tile with the flip bits that turn it back into the original.

use alloc::vec::Vec;

use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::sys::video::{Rgb15, TileEntry};

/// Pixels in an 8x8 tile, row-major.
pub const TILE_PIXELS: usize = 64;

pub type Tile = [Rgb15; TILE_PIXELS];

/// Highest index a map entry can hold once the transparent tile 0 is reserved.
const MAX_UNIQUE: usize = 0x3FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Identity,
    HFlip,
    VFlip,
    HVFlip,
}

impl Orientation {
    pub const ALL: [Self; 4] = [Self::Identity, Self::HFlip, Self::VFlip, Self::HVFlip];

    #[inline]
    pub const fn flips(self) -> (bool, bool) {
        match self {
            Self::Identity => (false, false),
            Self::HFlip => (true, false),
            Self::VFlip => (false, true),
            Self::HVFlip => (true, true),
        }
    }

    /// Mirror `tile`. Every orientation is its own inverse.
    pub fn apply(self, tile: &Tile) -> Tile {
        let (h, v) = self.flips();
        core::array::from_fn(|i| {
            let (x, y) = (i % 8, i / 8);
            let x = if h { 7 - x } else { x };
            let y = if v { 7 - y } else { y };
            tile[y * 8 + x]
        })
    }
}

/// MD5 of a tile's little-endian colour stream.
///
/// Ordered by byte sum first, then by the digest bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileHash(pub [u8; 16]);

impl TileHash {
    pub fn of(tile: &Tile) -> Self {
        let mut hasher = Md5::new();
        for px in tile {
            hasher.update(px.to_le_bytes());
        }
        Self(hasher.finalize().into())
    }

    #[inline]
    pub fn byte_sum(&self) -> u32 {
        self.0.iter().map(|&b| b as u32).sum()
    }
}

impl Ord for TileHash {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.byte_sum().cmp(&other.byte_sum()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for TileHash {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The orientation a tile is stored in, and that orientation's hash.
pub fn canonical(tile: &Tile) -> (Orientation, TileHash) {
    let mut best = (Orientation::Identity, TileHash::of(tile));
    for o in &Orientation::ALL[1..] {
        let hash = TileHash::of(&o.apply(tile));
        if hash > best.1 {
            best = (*o, hash);
        }
    }
    best
}

/// A deduplicated tile set and the map that rebuilds the input from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduped {
    /// Unique tiles in stored orientation, greatest hash first.
    pub tiles: Vec<Tile>,
    /// One entry per input tile: stored index + 1 with flip bits, or 0 for a transparent tile.
    pub map: Vec<u16>,
}

/// Deduplicate `tiles`.
///
/// Tiles made only of `transparent` map to entry 0 and are not stored.
pub fn dedup(tiles: &[Tile], transparent: Option<Rgb15>) -> Result<Deduped> {
    let is_clear = |t: &Tile| transparent.is_some_and(|c| t.iter().all(|&p| p == c));

    let mut unique: Vec<(TileHash, Tile)> = Vec::new();
    let mut placed = Vec::with_capacity(tiles.len());
    for tile in tiles {
        if is_clear(tile) {
            placed.push(None);
            continue;
        }
        let (o, hash) = canonical(tile);
        if !unique.iter().any(|(h, _)| *h == hash) {
            unique.push((hash, o.apply(tile)));
        }
        placed.push(Some((o, hash)));
    }
    if unique.len() > MAX_UNIQUE {
        return Err(Error::Config("more unique tiles than a map entry can index"));
    }

    unique.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    let map = placed
        .into_iter()
        .map(|p| {
            let Some((o, hash)) = p else {
                return Ok(0);
            };
            let index = unique
                .iter()
                .position(|(h, _)| *h == hash)
                .ok_or(Error::Config("tile missing from its own set"))?;
            let (h, v) = o.flips();
            Ok(TileEntry::for_tile(index as u16 + 1, 0).with_flip_h(h).with_flip_v(v).bits())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Deduped { tiles: unique.into_iter().map(|(_, t)| t).collect(), map })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(seed: u16) -> Tile {
        core::array::from_fn(|i| Rgb15(seed.wrapping_mul(31).wrapping_add(i as u16 * 7) & 0x7FFF))
    }

    #[test]
    fn canonical_hash_has_the_largest_byte_sum() {
        for seed in 0..32 {
            let tile = gradient(seed);
            let (o, hash) = canonical(&tile);
            assert_eq!(TileHash::of(&o.apply(&tile)), hash);
            for other in Orientation::ALL {
                assert!(TileHash::of(&other.apply(&tile)).byte_sum() <= hash.byte_sum());
            }
        }
    }

    #[test]
    fn flips_are_involutions() {
        let tile = gradient(3);
        for o in Orientation::ALL {
            assert_eq!(o.apply(&o.apply(&tile)), tile);
        }
        assert_eq!(Orientation::HFlip.apply(&tile)[0], tile[7]);
        assert_eq!(Orientation::VFlip.apply(&tile)[0], tile[56]);
    }

    #[test]
    fn mirrored_tiles_share_one_stored_tile() {
        let a = gradient(1);
        let b = gradient(2);
        let input = [a, Orientation::HFlip.apply(&a), b, Orientation::HVFlip.apply(&a), Orientation::VFlip.apply(&b)];
        let out = dedup(&input, None).unwrap();
        assert_eq!(out.tiles.len(), 2);

        // every entry redraws its input tile
        for (tile, &raw) in input.iter().zip(&out.map) {
            let entry = TileEntry::from_bits(raw);
            let stored = &out.tiles[entry.tile_index() as usize - 1];
            let o = match (entry.flip_h(), entry.flip_v()) {
                (false, false) => Orientation::Identity,
                (true, false) => Orientation::HFlip,
                (false, true) => Orientation::VFlip,
                (true, true) => Orientation::HVFlip,
            };
            assert_eq!(&o.apply(stored), tile);
        }
    }

    #[test]
    fn unique_tiles_are_sorted_by_descending_hash() {
        let input: Vec<Tile> = (0..12).map(gradient).collect();
        let out = dedup(&input, None).unwrap();
        let hashes: Vec<_> = out.tiles.iter().map(TileHash::of).collect();
        assert!(hashes.windows(2).all(|w| w[0] >= w[1]));
        assert!(hashes.windows(2).all(|w| w[0].byte_sum() >= w[1].byte_sum()));
    }

    #[test]
    fn transparent_tiles_map_to_zero() {
        let clear = [Rgb15::BLACK; TILE_PIXELS];
        let out = dedup(&[clear, gradient(5), clear], Some(Rgb15::BLACK)).unwrap();
        assert_eq!(out.tiles.len(), 1);
        assert_eq!(out.map[0], 0);
        assert_eq!(out.map[2], 0);
        assert_eq!(TileEntry::from_bits(out.map[1]).tile_index(), 1);

        let kept = dedup(&[clear], None).unwrap();
        assert_eq!(kept.map, [1]);
    }
}
