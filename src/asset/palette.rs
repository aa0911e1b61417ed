use log::debug;

use crate::asset::blob::PaletteBlob;
use crate::error::{Bank, Result};
use crate::sys::alloc::PalAlloc;
use crate::sys::hw::HardwareIo;
use crate::sys::video::{Rgb15, PALETTE_BANK_WORDS, PALETTE_COLORS};

/// A 16 colour palette, and the slot it occupies in palette memory while loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb15; PALETTE_COLORS],
    bank: Bank,
    source: *const u8,
    transparent: Option<Rgb15>,
    slot: Option<u8>,
}

impl Palette {
    /// Build a palette from its blob.
    ///
    /// If `transparent` is given, that colour is moved to index 0, trading places with whatever
    /// colour held index 0. A transparent colour missing from the palette replaces entry 0.
    pub fn new(blob: PaletteBlob, bank: Bank, transparent: Option<Rgb15>) -> Self {
        let mut colors = blob.colors();
        if let Some(t) = transparent {
            match colors.iter().position(|&c| c == t) {
                Some(i) => colors.swap(0, i),
                None => colors[0] = t,
            }
        }
        Self { colors, bank, source: blob.source(), transparent, slot: None }
    }

    #[inline]
    pub fn colors(&self) -> &[Rgb15; PALETTE_COLORS] {
        &self.colors
    }

    #[inline]
    pub fn bank(&self) -> Bank {
        self.bank
    }

    #[inline]
    pub fn slot(&self) -> Option<u8> {
        self.slot
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether this palette was built from `blob` for `bank` with the same transparent colour.
    pub(crate) fn is_interned(&self, blob: &PaletteBlob, bank: Bank, transparent: Option<Rgb15>) -> bool {
        self.source == blob.source() && self.bank == bank && self.transparent == transparent
    }

    /// Claim a slot and write the colours into palette memory. Loading twice is a no-op.
    pub fn load<H: HardwareIo>(&mut self, hw: &mut H, alloc: &mut PalAlloc) -> Result<u8> {
        if let Some(slot) = self.slot {
            return Ok(slot);
        }
        let slot = alloc.alloc()?;
        let bank_base = match self.bank {
            Bank::Background => 0,
            Bank::Sprite => PALETTE_BANK_WORDS,
        };
        hw.write_palette_words(bank_base + slot as usize * PALETTE_COLORS, self.colors.iter().map(|c| c.0));
        debug!("loaded {} palette into slot {}", self.bank, slot);
        self.slot = Some(slot);
        Ok(slot)
    }

    /// Give the slot back. Palette memory is left as is.
    pub fn free(&mut self, alloc: &mut PalAlloc) {
        if let Some(slot) = self.slot.take() {
            alloc.free(slot);
            debug!("freed {} palette slot {}", self.bank, slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::blob::tests::palette_bytes;
    use crate::error::Error;
    use crate::sys::host::HostIo;

    fn colors() -> [u16; 16] {
        core::array::from_fn(|i| 0x100 + i as u16)
    }

    #[test]
    fn transparent_colour_moves_to_index_zero() {
        let mut raw = colors();
        raw[4] = 0x7FFF;
        let blob = PaletteBlob::parse(palette_bytes(&raw)).unwrap();
        let mut pal = Palette::new(blob, Bank::Background, Some(Rgb15(0x7FFF)));

        let mut hw = HostIo::new();
        let mut alloc = PalAlloc::new(Bank::Background);
        let slot = pal.load(&mut hw, &mut alloc).unwrap();

        let base = slot as usize * 16;
        assert_eq!(hw.palette()[base], 0x7FFF);
        assert_eq!(hw.palette()[base + 4], 0x100);
        assert_eq!(hw.palette()[base + 5], 0x105);
    }

    #[test]
    fn missing_transparent_colour_replaces_entry_zero() {
        let blob = PaletteBlob::parse(palette_bytes(&colors())).unwrap();
        let pal = Palette::new(blob, Bank::Sprite, Some(Rgb15(0x1234)));
        assert_eq!(pal.colors()[0], Rgb15(0x1234));
        assert_eq!(pal.colors()[1], Rgb15(0x101));
    }

    #[test]
    fn sprite_palettes_land_in_the_upper_bank() {
        let blob = PaletteBlob::parse(palette_bytes(&colors())).unwrap();
        let mut hw = HostIo::new();
        let mut alloc = PalAlloc::new(Bank::Sprite);
        alloc.alloc().unwrap();

        let mut pal = Palette::new(blob, Bank::Sprite, None);
        assert_eq!(pal.load(&mut hw, &mut alloc), Ok(1));
        assert_eq!(pal.load(&mut hw, &mut alloc), Ok(1));
        assert_eq!(&hw.palette()[256 + 16..256 + 32], &colors());

        pal.free(&mut alloc);
        assert!(!pal.is_loaded());
        assert!(!alloc.is_used(1));
    }

    #[test]
    fn interning_compares_the_transparent_colour_exactly() {
        let mut raw = colors();
        raw[3] = 0x7FFF;
        let blob = PaletteBlob::parse(palette_bytes(&raw)).unwrap();
        let swapped = Palette::new(blob, Bank::Sprite, Some(Rgb15(0x7FFF)));
        assert!(swapped.is_interned(&blob, Bank::Sprite, Some(Rgb15(0x7FFF))));
        assert!(!swapped.is_interned(&blob, Bank::Sprite, None));
        assert!(!swapped.is_interned(&blob, Bank::Sprite, Some(Rgb15(0x100))));
        assert!(!swapped.is_interned(&blob, Bank::Background, Some(Rgb15(0x7FFF))));

        let plain = Palette::new(blob, Bank::Sprite, None);
        assert!(plain.is_interned(&blob, Bank::Sprite, None));
        assert!(!plain.is_interned(&blob, Bank::Sprite, Some(Rgb15(0x100))));
    }

    #[test]
    fn ninth_palette_does_not_fit() {
        let blob = PaletteBlob::parse(palette_bytes(&colors())).unwrap();
        let mut hw = HostIo::new();
        let mut alloc = PalAlloc::new(Bank::Background);
        for _ in 0..8 {
            Palette::new(blob, Bank::Background, None).load(&mut hw, &mut alloc).unwrap();
        }
        let mut extra = Palette::new(blob, Bank::Background, None);
        assert_eq!(extra.load(&mut hw, &mut alloc), Err(Error::PaletteFull { bank: Bank::Background }));
        assert!(!extra.is_loaded());
    }
}
