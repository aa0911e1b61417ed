use core::ops;

/// A set of keypad buttons, as bits of the key input register.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(u16);

impl Key {
    pub const A: Self = Self(0x001);
    pub const B: Self = Self(0x002);
    pub const SELECT: Self = Self(0x004);
    pub const START: Self = Self(0x008);
    pub const RIGHT: Self = Self(0x010);
    pub const LEFT: Self = Self(0x020);
    pub const UP: Self = Self(0x040);
    pub const DOWN: Self = Self(0x080);
    pub const R: Self = Self(0x100);
    pub const L: Self = Self(0x200);

    pub const NONE: Self = Self(0x000);
    pub const ALL: Self = Self(0x3FF);

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl ops::BitOr for Key {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Keypad state latched once per frame.
///
/// The key input register is active-low: a 0 bit means the button is down. Both the current and
/// the previous frame's raw values are kept so edge transitions can be queried. Every predicate
/// taking a [`Key`] set requires *all* keys in the set to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    curr: u16,
    prev: u16,
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Keypad {
    /// A keypad with nothing pressed in either frame.
    pub const fn new() -> Self {
        Self { curr: Key::ALL.0, prev: Key::ALL.0 }
    }

    /// Shift the current raw value into the previous slot and latch a new one.
    #[inline]
    pub fn latch(&mut self, raw: u16) {
        self.prev = self.curr;
        self.curr = raw & Key::ALL.0;
    }

    #[inline]
    pub const fn raw(&self) -> u16 {
        self.curr
    }

    #[inline]
    pub const fn raw_prev(&self) -> u16 {
        self.prev
    }

    /// All of `keys` are down this frame.
    #[inline]
    pub const fn pressed(&self, keys: Key) -> bool {
        (!self.curr & keys.0) == keys.0
    }

    /// All of `keys` are up this frame.
    #[inline]
    pub const fn released(&self, keys: Key) -> bool {
        (self.curr & keys.0) == keys.0
    }

    /// All of `keys` were down last frame and still are.
    #[inline]
    pub const fn held(&self, keys: Key) -> bool {
        (!self.prev & !self.curr & keys.0) == keys.0
    }

    /// All of `keys` went from up to down this frame.
    #[inline]
    pub const fn just_pressed(&self, keys: Key) -> bool {
        (self.prev & !self.curr & keys.0) == keys.0
    }

    /// All of `keys` went from down to up this frame.
    #[inline]
    pub const fn just_released(&self, keys: Key) -> bool {
        (!self.prev & self.curr & keys.0) == keys.0
    }
}

/// Size of the battery-backed save area, in bytes.
pub const SAVE_SIZE: usize = 255;

/// Value of an erased save byte.
pub const SAVE_ERASED: u8 = 0xFF;

/// The working copy of the save area.
///
/// Games mutate [`SaveRam::bytes_mut`] freely; the engine periodically asks for the image with
/// [`SaveRam::take_changed`], which hands it out only when it differs from the last written copy.
#[derive(Clone, PartialEq, Eq)]
pub struct SaveRam {
    image: [u8; SAVE_SIZE],
    written: [u8; SAVE_SIZE],
}

impl Default for SaveRam {
    fn default() -> Self {
        Self::erased()
    }
}

impl SaveRam {
    pub const fn erased() -> Self {
        Self { image: [SAVE_ERASED; SAVE_SIZE], written: [SAVE_ERASED; SAVE_SIZE] }
    }

    /// Start from bytes read back out of the save area.
    pub const fn from_saved(bytes: [u8; SAVE_SIZE]) -> Self {
        Self { image: bytes, written: bytes }
    }

    #[inline]
    pub const fn bytes(&self) -> &[u8; SAVE_SIZE] {
        &self.image
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8; SAVE_SIZE] {
        &mut self.image
    }

    #[inline]
    pub fn is_changed(&self) -> bool {
        self.image != self.written
    }

    /// Return the image if it changed since the last call, recording it as written.
    pub fn take_changed(&mut self) -> Option<&[u8; SAVE_SIZE]> {
        if !self.is_changed() {
            return None;
        }
        self.written = self.image;
        Some(&self.image)
    }
}

impl core::fmt::Debug for SaveRam {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SaveRam").field("changed", &self.is_changed()).finish_non_exhaustive()
    }
}
