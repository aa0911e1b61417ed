use alloc::boxed::Box;
use alloc::vec;
use core::cell::Cell;

use crate::sys::hw::HardwareIo;
use crate::sys::io::{SAVE_ERASED, SAVE_SIZE};
use crate::sys::video::{Reg, OAM_WORDS, PALETTE_WORDS, SCANLINES, VRAM_WORDS};

const IO_WORDS: usize = 0x100;

/// A [`HardwareIo`] backed by plain memory, for running the engine off the device.
///
/// The scanline counter is simulated: every read of `VCOUNT` advances it by one line, so vsync
/// loops terminate. Nothing is ever drawn; tests inspect the buffers instead.
pub struct HostIo {
    io: [u16; IO_WORDS],
    vram: Box<[u16]>,
    palette: Box<[u16]>,
    oam: Box<[u16]>,
    save: [u8; SAVE_SIZE],
    save_writes: usize,
    vcount: Cell<u16>,
    scanlines: Cell<u64>,
    halts: usize,
    halt_hook: Option<fn()>,
}

impl Default for HostIo {
    fn default() -> Self {
        Self::new()
    }
}

impl HostIo {
    pub fn new() -> Self {
        let mut io = [0; IO_WORDS];
        io[Reg::KEYINPUT.word_index()] = 0x03FF;
        Self {
            io,
            vram: vec![0; VRAM_WORDS].into_boxed_slice(),
            palette: vec![0; PALETTE_WORDS].into_boxed_slice(),
            oam: vec![0; OAM_WORDS].into_boxed_slice(),
            save: [SAVE_ERASED; SAVE_SIZE],
            save_writes: 0,
            vcount: Cell::new(0),
            scanlines: Cell::new(0),
            halts: 0,
            halt_hook: None,
        }
    }

    /// Set the raw (active-low) key input register.
    pub fn set_keys(&mut self, raw: u16) {
        self.io[Reg::KEYINPUT.word_index()] = raw;
    }

    pub fn set_vcount(&mut self, line: u16) {
        self.vcount.set(line % SCANLINES);
    }

    /// The simulated scanline, without advancing it.
    pub fn current_vcount(&self) -> u16 {
        self.vcount.get()
    }

    /// Scanlines the simulated display has advanced through so far.
    pub fn scanlines_elapsed(&self) -> u64 {
        self.scanlines.get()
    }

    /// Run `hook` every time the engine halts, standing in for an interrupt.
    pub fn on_halt(&mut self, hook: fn()) {
        self.halt_hook = Some(hook);
    }

    pub fn halts(&self) -> usize {
        self.halts
    }

    pub fn reg(&self, reg: Reg) -> u16 {
        self.io[reg.word_index()]
    }

    pub fn vram(&self) -> &[u16] {
        &self.vram
    }

    pub fn palette(&self) -> &[u16] {
        &self.palette
    }

    pub fn oam(&self) -> &[u16] {
        &self.oam
    }

    pub fn saved(&self) -> &[u8; SAVE_SIZE] {
        &self.save
    }

    pub fn save_writes(&self) -> usize {
        self.save_writes
    }
}

impl HardwareIo for HostIo {
    fn read_reg(&self, reg: Reg) -> u16 {
        if reg == Reg::VCOUNT {
            let line = self.vcount.get();
            self.vcount.set((line + 1) % SCANLINES);
            self.scanlines.set(self.scanlines.get() + 1);
            return line;
        }
        self.io[reg.word_index()]
    }

    fn write_reg(&mut self, reg: Reg, value: u16) {
        // VCOUNT is read only.
        if reg != Reg::VCOUNT {
            self.io[reg.word_index()] = value;
        }
    }

    fn read_vram(&self, word: usize) -> u16 {
        self.vram[word]
    }

    fn write_vram(&mut self, word: usize, value: u16) {
        self.vram[word] = value;
    }

    fn write_palette(&mut self, word: usize, value: u16) {
        self.palette[word] = value;
    }

    fn write_oam(&mut self, word: usize, value: u16) {
        self.oam[word] = value;
    }

    fn read_saved_bytes(&mut self, buf: &mut [u8; SAVE_SIZE]) {
        *buf = self.save;
    }

    fn write_saved_bytes(&mut self, bytes: &[u8; SAVE_SIZE]) {
        self.save = *bytes;
        self.save_writes += 1;
    }

    fn halt(&mut self) {
        self.halts += 1;
        if let Some(hook) = self.halt_hook {
            hook();
        }
    }
}

impl core::fmt::Debug for HostIo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostIo")
            .field("vcount", &self.vcount.get())
            .field("halts", &self.halts)
            .field("save_writes", &self.save_writes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcount_advances_and_wraps() {
        let hw = HostIo::new();
        for expected in 0..SCANLINES {
            assert_eq!(hw.vcount(), expected);
        }
        assert_eq!(hw.vcount(), 0);
        assert_eq!(hw.scanlines_elapsed(), SCANLINES as u64 + 1);
    }

    #[test]
    fn keys_start_released_and_save_starts_erased() {
        let mut hw = HostIo::new();
        assert_eq!(hw.read_keys(), 0x03FF);
        let mut buf = [0; SAVE_SIZE];
        hw.read_saved_bytes(&mut buf);
        assert!(buf.iter().all(|&b| b == SAVE_ERASED));
    }
}
