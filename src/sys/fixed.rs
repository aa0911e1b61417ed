use core::fmt;
use core::ops;

use fixed::types::I24F8;

/// A 24.8 signed fixed-point number.
///
/// All positional math in the engine runs on this type. Arithmetic is performed on the raw
/// 32-bit representation and wraps modulo 2^32, which is what the hardware's 32-bit ALU does.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fix8(I24F8);

impl Fix8 {
    pub const ZERO: Self = Self::from_bits(0x0000);
    pub const ONE: Self = Self::from_bits(0x0100);
    pub const HALF: Self = Self::from_bits(0x0080);
    pub const QUARTER: Self = Self::from_bits(0x0040);
    pub const EIGHTH: Self = Self::from_bits(0x0020);
    pub const SIXTEENTH: Self = Self::from_bits(0x0010);
    pub const THIRD: Self = Self::from_bits(0x0056);

    const FRAC_BITS: u32 = 8;

    /// Build a value from its integer part and its fractional byte: `(int << 8) | frac`.
    #[inline]
    pub const fn new(int: i32, frac: u8) -> Self {
        Self::from_bits(int.wrapping_shl(Self::FRAC_BITS) | frac as i32)
    }

    #[inline]
    pub const fn from_int(int: i32) -> Self {
        Self::new(int, 0)
    }

    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(I24F8::from_bits(bits))
    }

    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0.to_bits()
    }

    /// The integer part, rounded toward negative infinity (arithmetic shift).
    #[inline]
    pub const fn int(self) -> i32 {
        self.to_bits() >> Self::FRAC_BITS
    }

    /// The fractional byte.
    #[inline]
    pub const fn frac(self) -> u8 {
        self.to_bits() as u8
    }

    /// The integer part truncated to 16 bits, as written to scroll registers.
    #[inline]
    pub const fn int_u16(self) -> u16 {
        self.int() as u16
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.to_bits() < 0
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        clamp(self, min, max)
    }
}

impl fmt::Debug for Fix8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fix8({} = {:#x})", self.0, self.to_bits())
    }
}

impl fmt::Display for Fix8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ops::Add for Fix8 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.to_bits().wrapping_add(rhs.to_bits()))
    }
}

impl ops::AddAssign for Fix8 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ops::Sub for Fix8 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.to_bits().wrapping_sub(rhs.to_bits()))
    }
}

impl ops::SubAssign for Fix8 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Fixed-point product: the raw 32-bit product is taken first (wrapping), then shifted down.
impl ops::Mul for Fix8 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.to_bits().wrapping_mul(rhs.to_bits()) >> Self::FRAC_BITS)
    }
}

impl ops::MulAssign for Fix8 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Scale by a plain integer.
impl ops::Mul<i32> for Fix8 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: i32) -> Self::Output {
        Self::from_bits(self.to_bits().wrapping_mul(rhs))
    }
}

impl ops::Neg for Fix8 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self::from_bits(self.to_bits().wrapping_neg())
    }
}

impl From<i32> for Fix8 {
    #[inline]
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

/// Linearly interpolate from `a` to `b` by `t`. `t` is not clamped to `[0, ONE]`.
#[inline]
pub fn lerp(a: Fix8, b: Fix8, t: Fix8) -> Fix8 {
    a + t * (b - a)
}

#[inline]
pub fn clamp(value: Fix8, min: Fix8, max: Fix8) -> Fix8 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// A two element fixed-point vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct V2 {
    pub x: Fix8,
    pub y: Fix8,
}

impl V2 {
    pub const ZERO: Self = Self::new(Fix8::ZERO, Fix8::ZERO);

    #[inline]
    pub const fn new(x: Fix8, y: Fix8) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fix8::from_int(x), Fix8::from_int(y))
    }
}

impl ops::Add for V2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl ops::AddAssign for V2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ops::Sub for V2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An integer rectangle given by two opposite corners, used for hit boxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A `w` × `h` rectangle with its top left corner at `pos`.
    #[inline]
    pub const fn at(pos: V2, w: i32, h: i32) -> Self {
        let x = pos.x.int();
        let y = pos.y.int();
        Self::new(x, y, x + w, y + h)
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Returns true if the two rectangles overlap. Touching edges do not count.
    #[inline]
    pub const fn intersects(&self, other: &Rect) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    #[inline]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}
