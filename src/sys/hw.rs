use core::cell::Cell;
use core::ptr;

use critical_section as cs;

use crate::sys::io::SAVE_SIZE;
use crate::sys::video::{Reg, OAM_WORDS, PALETTE_WORDS, VBLANK_LINE, VRAM_WORDS};

/// Everything the engine needs from the machine.
///
/// Memory is addressed in 16-bit words from the start of each region; registers by their byte
/// offset from the I/O base. The engine owns one implementor and threads it through every call
/// that touches hardware, so the same code drives the device ([`Gba`]) and desktop tests
/// ([`HostIo`](crate::sys::host::HostIo)).
pub trait HardwareIo {
    fn read_reg(&self, reg: Reg) -> u16;
    fn write_reg(&mut self, reg: Reg, value: u16);

    fn read_vram(&self, word: usize) -> u16;
    fn write_vram(&mut self, word: usize, value: u16);

    fn write_palette(&mut self, word: usize, value: u16);
    fn write_oam(&mut self, word: usize, value: u16);

    fn read_saved_bytes(&mut self, buf: &mut [u8; SAVE_SIZE]);
    fn write_saved_bytes(&mut self, bytes: &[u8; SAVE_SIZE]);

    /// Sleep until the next interrupt. The default just spins once.
    #[inline]
    fn halt(&mut self) {
        core::hint::spin_loop();
    }

    /// The scanline currently being drawn, 0 - 227.
    #[inline]
    fn vcount(&self) -> u16 {
        self.read_reg(Reg::VCOUNT) & 0xFF
    }

    /// The raw, active-low key input register.
    #[inline]
    fn read_keys(&self) -> u16 {
        self.read_reg(Reg::KEYINPUT)
    }

    /// Write consecutive words to VRAM starting at `word`.
    fn write_vram_words<I: IntoIterator<Item = u16>>(&mut self, word: usize, words: I)
    where
        Self: Sized,
    {
        for (i, w) in words.into_iter().enumerate() {
            self.write_vram(word + i, w);
        }
    }

    /// Write consecutive words to palette memory starting at `word`.
    fn write_palette_words<I: IntoIterator<Item = u16>>(&mut self, word: usize, words: I)
    where
        Self: Sized,
    {
        for (i, w) in words.into_iter().enumerate() {
            self.write_palette(word + i, w);
        }
    }
}

/// Block until the start of the next vertical blank.
///
/// If the display is already inside a blank, that blank is let run out first, so a full frame
/// always passes between two calls.
pub fn vsync_wait<H: HardwareIo>(hw: &mut H) {
    while hw.vcount() >= VBLANK_LINE {
        core::hint::spin_loop();
    }
    while hw.vcount() < VBLANK_LINE {
        core::hint::spin_loop();
    }
}

static VBLANK_PENDING: cs::Mutex<Cell<bool>> = cs::Mutex::new(Cell::new(false));

/// Record a vertical blank. Call this from the vblank interrupt handler.
#[inline]
pub fn on_vblank_irq() {
    cs::with(|cs| VBLANK_PENDING.borrow(cs).set(true));
}

/// Interrupt driven alternative to [`vsync_wait`]: halt until [`on_vblank_irq`] has run.
pub fn wait_vblank_irq<H: HardwareIo>(hw: &mut H) {
    cs::with(|cs| VBLANK_PENDING.borrow(cs).set(false));
    while !cs::with(|cs| VBLANK_PENDING.borrow(cs).replace(false)) {
        hw.halt();
    }
}

/// The real machine, accessed through volatile reads and writes to its memory map.
#[derive(Debug)]
pub struct Gba(());

impl Gba {
    const IO_BASE: usize = 0x0400_0000;
    const PALETTE_BASE: *mut u16 = 0x0500_0000 as *mut _;
    const VRAM_BASE: *mut u16 = 0x0600_0000 as *mut _;
    const OAM_BASE: *mut u16 = 0x0700_0000 as *mut _;
    const SRAM_BASE: *mut u8 = 0x0E00_0000 as *mut _;

    /// # Safety
    ///
    /// Must only be called on the device, and only once: the returned value assumes exclusive
    /// ownership of video memory and the display registers.
    pub const unsafe fn steal() -> Self {
        Self(())
    }

    #[inline]
    const fn reg_ptr(reg: Reg) -> *mut u16 {
        (Self::IO_BASE + reg.0 as usize) as *mut u16
    }
}

impl HardwareIo for Gba {
    #[inline]
    fn read_reg(&self, reg: Reg) -> u16 {
        unsafe { ptr::read_volatile(Self::reg_ptr(reg)) }
    }

    #[inline]
    fn write_reg(&mut self, reg: Reg, value: u16) {
        unsafe { ptr::write_volatile(Self::reg_ptr(reg), value) }
    }

    #[inline]
    fn read_vram(&self, word: usize) -> u16 {
        debug_assert!(word < VRAM_WORDS);
        unsafe { ptr::read_volatile(Self::VRAM_BASE.add(word)) }
    }

    #[inline]
    fn write_vram(&mut self, word: usize, value: u16) {
        debug_assert!(word < VRAM_WORDS);
        unsafe { ptr::write_volatile(Self::VRAM_BASE.add(word), value) }
    }

    #[inline]
    fn write_palette(&mut self, word: usize, value: u16) {
        debug_assert!(word < PALETTE_WORDS);
        unsafe { ptr::write_volatile(Self::PALETTE_BASE.add(word), value) }
    }

    #[inline]
    fn write_oam(&mut self, word: usize, value: u16) {
        debug_assert!(word < OAM_WORDS);
        unsafe { ptr::write_volatile(Self::OAM_BASE.add(word), value) }
    }

    // SRAM sits on an 8-bit bus.
    fn read_saved_bytes(&mut self, buf: &mut [u8; SAVE_SIZE]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = unsafe { ptr::read_volatile(Self::SRAM_BASE.add(i)) };
        }
    }

    fn write_saved_bytes(&mut self, bytes: &[u8; SAVE_SIZE]) {
        for (i, &b) in bytes.iter().enumerate() {
            unsafe { ptr::write_volatile(Self::SRAM_BASE.add(i), b) };
        }
    }

    #[cfg(target_arch = "arm")]
    #[inline]
    fn halt(&mut self) {
        // BIOS Halt
        unsafe { core::arch::asm!("swi 0x02", out("r0") _, out("r1") _, out("r3") _) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::host::HostIo;

    #[test]
    fn vsync_returns_at_the_start_of_the_blank() {
        let mut hw = HostIo::new();
        hw.set_vcount(10);
        vsync_wait(&mut hw);
        // the read that saw line 160 moved the counter on by one
        assert_eq!(hw.current_vcount(), VBLANK_LINE + 1);
    }

    #[test]
    fn vsync_inside_a_blank_waits_for_the_next_one() {
        let mut hw = HostIo::new();
        hw.set_vcount(200);
        vsync_wait(&mut hw);
        assert_eq!(hw.current_vcount(), VBLANK_LINE + 1);
        assert!(hw.scanlines_elapsed() > 160);
    }

    #[test]
    fn irq_wait_consumes_the_flag() {
        let mut hw = HostIo::new();
        hw.on_halt(on_vblank_irq);
        wait_vblank_irq(&mut hw);
        assert_eq!(hw.halts(), 1);
    }
}
