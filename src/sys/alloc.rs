use crate::error::{Bank, Error, Pool, Result};

/// A first-fit, coalescing cell allocator over a fixed pool of `N` equally sized cells.
///
/// Video memory is tiny and asset lifetimes are scene scoped, so rather than a general purpose
/// heap, VRAM is carved up into cells (one 4bpp tile, or one screen-block) and handed out in
/// contiguous runs. The metadata array has one word per cell: the word at the start of a block is
/// its header, every other word inside the block is zero. A header holds the block size in cells,
/// with [`VramAlloc::USED`] or'd in while the block is handed out.
#[derive(Clone, PartialEq, Eq)]
pub struct VramAlloc<const N: usize> {
    meta: [u32; N],
    pool: Pool,
}

impl<const N: usize> VramAlloc<N> {
    /// The in-use marker. Any header `>= USED` belongs to an allocated block.
    pub const USED: u32 = 0x7000_0000;

    pub const fn new(pool: Pool) -> Self {
        const { assert!(N > 0 && N < Self::USED as usize) };
        let mut meta = [0u32; N];
        meta[0] = N as u32;
        Self { meta, pool }
    }

    /// Rebuild an allocator from raw metadata. Used to restore a known state.
    pub const fn from_meta(meta: [u32; N], pool: Pool) -> Self {
        Self { meta, pool }
    }

    #[inline]
    pub const fn pool(&self) -> Pool {
        self.pool
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn meta(&self) -> &[u32; N] {
        &self.meta
    }

    #[inline]
    const fn block_size(header: u32) -> usize {
        (header & !Self::USED) as usize
    }

    /// A block is free if its header exists, is nonzero and does not carry the used marker.
    #[inline]
    fn is_free(&self, index: Option<usize>) -> bool {
        match index.and_then(|i| self.meta.get(i)) {
            Some(&header) => header != 0 && header < Self::USED,
            None => false,
        }
    }

    /// Allocate `size` contiguous cells, returning the index of the first one.
    pub fn alloc(&mut self, size: usize) -> Result<usize> {
        if size == 0 || size > N {
            return Err(Error::OutOfMemory { pool: self.pool });
        }

        let mut i = 0usize;
        while i < N {
            let header = self.meta[i];
            let cells = Self::block_size(header);
            if cells == 0 {
                // Corrupt metadata; a zero header can never start a block.
                break;
            }

            if header >= Self::USED || cells < size {
                i += cells;
                continue;
            }

            self.meta[i] = Self::USED | size as u32;
            if cells > size {
                self.meta[i + size] = (cells - size) as u32;
            }
            log::debug!("{} pool: allocated {} cells at {}", self.pool, size, i);
            return Ok(i);
        }

        log::debug!("{} pool: no block of {} cells", self.pool, size);
        Err(Error::OutOfMemory { pool: self.pool })
    }

    /// Return the block starting at `offset` to the pool, merging it with free neighbours.
    ///
    /// `offset` must have been returned by [`VramAlloc::alloc`] and not freed since.
    pub fn free(&mut self, offset: usize) {
        debug_assert!(offset < N && self.meta[offset] >= Self::USED, "freeing a block that is not in use");
        if offset >= N || self.meta[offset] < Self::USED {
            return;
        }

        let size = Self::block_size(self.meta[offset]);
        let prev = (0..offset).rev().find(|&i| self.meta[i] != 0);
        let next = offset + size;
        let next = (next < N).then_some(next);

        match (self.is_free(prev), self.is_free(next)) {
            (true, true) => {
                let (p, n) = (prev.unwrap_or_default(), next.unwrap_or_default());
                self.meta[p] += size as u32 + self.meta[n];
                self.meta[offset] = 0;
                self.meta[n] = 0;
            }
            (false, true) => {
                let n = next.unwrap_or_default();
                self.meta[offset] = size as u32 + self.meta[n];
                self.meta[n] = 0;
            }
            (true, false) => {
                let p = prev.unwrap_or_default();
                self.meta[p] += size as u32;
                self.meta[offset] = 0;
            }
            (false, false) => {
                self.meta[offset] = size as u32;
            }
        }
        log::debug!("{} pool: freed {} cells at {}", self.pool, size, offset);
    }

    /// Iterate over `(offset, cells, in_use)` for every block in address order.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, usize, bool)> + '_ {
        self.meta
            .iter()
            .enumerate()
            .filter(|(_, header)| **header != 0)
            .map(|(i, &header)| (i, Self::block_size(header), header >= Self::USED))
    }

    /// The total number of cells not handed out.
    pub fn free_cells(&self) -> usize {
        self.blocks().filter(|b| !b.2).map(|b| b.1).sum()
    }

    /// The size of the largest block `alloc` could currently satisfy.
    pub fn largest_free(&self) -> usize {
        self.blocks().filter(|b| !b.2).map(|b| b.1).max().unwrap_or(0)
    }
}

impl<const N: usize> core::fmt::Debug for VramAlloc<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VramAlloc")
            .field("pool", &self.pool)
            .field("cells", &N)
            .field("free", &self.free_cells())
            .finish()
    }
}

/// The number of 16 colour palettes in each palette bank.
pub const PALETTE_SLOTS: usize = 8;

/// A slot allocator for the 16 colour palettes of one palette bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalAlloc {
    meta: [bool; PALETTE_SLOTS],
    bank: Bank,
}

impl PalAlloc {
    pub const fn new(bank: Bank) -> Self {
        Self { meta: [false; PALETTE_SLOTS], bank }
    }

    #[inline]
    pub const fn bank(&self) -> Bank {
        self.bank
    }

    /// Claim the lowest free slot.
    pub fn alloc(&mut self) -> Result<u8> {
        match self.meta.iter().position(|used| !used) {
            Some(slot) => {
                self.meta[slot] = true;
                log::debug!("{} palettes: allocated slot {}", self.bank, slot);
                Ok(slot as u8)
            }
            None => Err(Error::PaletteFull { bank: self.bank }),
        }
    }

    pub fn free(&mut self, slot: u8) {
        debug_assert!(self.is_used(slot), "freeing an unused palette slot");
        if let Some(used) = self.meta.get_mut(slot as usize) {
            *used = false;
            log::debug!("{} palettes: freed slot {}", self.bank, slot);
        }
    }

    #[inline]
    pub fn is_used(&self, slot: u8) -> bool {
        self.meta.get(slot as usize).copied().unwrap_or(false)
    }

    pub fn used_slots(&self) -> usize {
        self.meta.iter().filter(|&&used| used).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U: u32 = VramAlloc::<1>::USED;

    fn pool<const N: usize>(meta: [u32; N]) -> VramAlloc<N> {
        VramAlloc::from_meta(meta, Pool::BgTiles)
    }

    fn header_sum<const N: usize>(a: &VramAlloc<N>) -> usize {
        a.meta().iter().filter(|&&m| m != 0).map(|&m| (m & !U) as usize).sum()
    }

    fn no_adjacent_free<const N: usize>(a: &VramAlloc<N>) -> bool {
        let blocks: heapless::Vec<_, 64> = a.blocks().collect();
        blocks.windows(2).all(|w| w[0].2 || w[1].2)
    }

    #[test]
    fn single_allocation_splits_the_pool() {
        let mut a = VramAlloc::<5>::new(Pool::BgTiles);
        assert_eq!(a.alloc(3), Ok(0));
        assert_eq!(a.meta(), &[U | 3, 0, 0, 2, 0]);
    }

    #[test]
    fn sequential_fill() {
        let mut a = VramAlloc::<10>::new(Pool::BgTiles);
        assert_eq!(a.alloc(3), Ok(0));
        assert_eq!(a.alloc(2), Ok(3));
        assert_eq!(a.alloc(3), Ok(5));
        assert_eq!(a.alloc(1), Ok(8));
        assert_eq!(a.meta(), &[U | 3, 0, 0, U | 2, 0, U | 3, 0, 0, U | 1, 1]);
    }

    #[test]
    fn out_of_memory_leaves_state_untouched() {
        let mut a = VramAlloc::<10>::new(Pool::SpriteTiles);
        assert_eq!(a.alloc(5), Ok(0));
        assert_eq!(a.alloc(4), Ok(5));
        assert_eq!(a.alloc(5), Err(Error::OutOfMemory { pool: Pool::SpriteTiles }));
        assert_eq!(a.meta(), &[U | 5, 0, 0, 0, 0, U | 4, 0, 0, 0, 1]);
    }

    #[test]
    fn whole_pool_allocates_exactly_once() {
        let mut a = VramAlloc::<16>::new(Pool::ScreenBlocks);
        assert!(a.alloc(17).is_err());
        assert_eq!(a.alloc(16), Ok(0));
        assert!(a.alloc(16).is_err());
        assert!(a.alloc(1).is_err());
    }

    #[test]
    fn zero_sized_requests_are_rejected() {
        let mut a = VramAlloc::<4>::new(Pool::BgTiles);
        assert!(a.alloc(0).is_err());
        assert_eq!(a.meta(), &[4, 0, 0, 0]);
    }

    #[test]
    fn free_first_block_merges_with_next() {
        let mut a = pool([U | 3, 0, 0, 2, 0]);
        a.free(0);
        assert_eq!(a.meta(), &[5, 0, 0, 0, 0]);
    }

    #[test]
    fn free_last_block_merges_with_previous() {
        let mut a = pool([3, 0, 0, U | 2, 0]);
        a.free(3);
        assert_eq!(a.meta(), &[5, 0, 0, 0, 0]);
    }

    #[test]
    fn free_between_used_blocks_only_clears_the_mark() {
        let mut a = pool([U | 3, 0, 0, U | 2, 0, U | 3, 0, 0, U | 1, 1]);
        a.free(3);
        assert_eq!(a.meta(), &[U | 3, 0, 0, 2, 0, U | 3, 0, 0, U | 1, 1]);
    }

    #[test]
    fn free_coalesces_both_sides() {
        let mut a = pool([3, 0, 0, U | 2, 0, U | 3, 0, 0, 1, U | 1]);
        a.free(5);
        a.free(3);
        assert_eq!(a.meta(), &[9, 0, 0, 0, 0, 0, 0, 0, 0, U | 1]);
    }

    #[test]
    fn realloc_after_free_reuses_offset() {
        let mut a = VramAlloc::<32>::new(Pool::BgTiles);
        let first = a.alloc(7).unwrap();
        a.free(first);
        assert_eq!(a.alloc(7), Ok(first));
    }

    #[test]
    fn first_fit_reuses_holes() {
        let mut a = VramAlloc::<12>::new(Pool::BgTiles);
        let x = a.alloc(4).unwrap();
        let _y = a.alloc(4).unwrap();
        a.free(x);
        assert_eq!(a.alloc(2), Ok(0));
        assert_eq!(a.alloc(2), Ok(2));
        assert_eq!(a.alloc(3), Ok(8));
        assert_eq!(a.largest_free(), 1);
    }

    #[test]
    fn headers_always_cover_the_pool() {
        let mut a = VramAlloc::<64>::new(Pool::BgTiles);
        let mut live: heapless::Vec<usize, 64> = heapless::Vec::new();
        // A fixed pseudo-random walk of allocs and frees.
        let mut seed = 0x1234_5678u32;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 != 0 || live.is_empty() {
                if let Ok(off) = a.alloc((seed % 9 + 1) as usize) {
                    live.push(off).unwrap();
                }
            } else {
                let idx = (seed as usize / 3) % live.len();
                a.free(live.swap_remove(idx));
                assert!(no_adjacent_free(&a), "adjacent free blocks after free: {:?}", a.meta());
            }
            assert_eq!(header_sum(&a), 64);
        }

        for off in live {
            a.free(off);
        }
        assert_eq!(a.meta()[0], 64);
        assert_eq!(a.free_cells(), 64);
    }

    #[test]
    fn palette_slots_fill_then_fail() {
        let mut p = PalAlloc::new(Bank::Background);
        for expected in 0..8u8 {
            assert_eq!(p.alloc(), Ok(expected));
        }
        assert_eq!(p.alloc(), Err(Error::PaletteFull { bank: Bank::Background }));
        p.free(2);
        assert!(!p.is_used(2));
        assert_eq!(p.alloc(), Ok(2));
        assert_eq!(p.used_slots(), 8);
    }
}
