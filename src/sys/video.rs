//! Video hardware: memory layout, register formats and the word formats stored in VRAM and OAM.

use const_default::ConstDefault;

pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;

/// The first scanline of the vertical blank.
pub const VBLANK_LINE: u16 = 160;
/// Scanlines per frame, including the vertical blank.
pub const SCANLINES: u16 = 228;

/// Size of VRAM in 16-bit words (96 KiB).
pub const VRAM_WORDS: usize = 0xC000;
/// A 16 KiB character block, in words.
pub const CHAR_BLOCK_WORDS: usize = 0x2000;
/// A 2 KiB screen-block (32×32 map entries), in words.
pub const SCREEN_BLOCK_WORDS: usize = 0x400;
/// One 4bpp 8×8 tile, in words.
pub const TILE_WORDS: usize = 16;
/// One 4bpp 8×8 tile, in bytes.
pub const TILE_BYTES: usize = 32;

/// Background tiles live in character blocks 0 and 1: 1024 tiles, all addressable by the 10-bit
/// tile index of a map entry.
pub const BG_TILE_BASE: usize = 0;
pub const BG_TILE_CELLS: usize = 1024;

/// Tile maps live in the upper half of background VRAM, screen-blocks 16 to 31.
pub const MAP_BASE_BLOCK: usize = 16;
pub const MAP_BLOCK_CELLS: usize = 16;

/// Sprite tiles live in character blocks 4 and 5.
pub const SPRITE_TILE_BASE: usize = 4 * CHAR_BLOCK_WORDS;
pub const SPRITE_TILE_CELLS: usize = 1024;

/// Palette memory, in words: 256 background colours followed by 256 sprite colours.
pub const PALETTE_WORDS: usize = 0x200;
pub const PALETTE_BANK_WORDS: usize = 0x100;
pub const PALETTE_COLORS: usize = 16;

/// OAM in words: 128 entries of `[attr0, attr1, attr2, affine]`.
pub const OAM_WORDS: usize = 0x200;
pub const OAM_ENTRIES: usize = 128;
pub const OAM_ENTRY_WORDS: usize = 4;

/// A memory mapped 16-bit I/O register, named by its byte offset from the I/O base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u16);

impl Reg {
    pub const DISPCNT: Self = Self(0x000);
    pub const DISPSTAT: Self = Self(0x004);
    pub const VCOUNT: Self = Self(0x006);
    pub const KEYINPUT: Self = Self(0x130);

    #[inline]
    pub const fn bg_control(bg: usize) -> Self {
        Self(0x008 + 2 * (bg as u16 & 3))
    }

    #[inline]
    pub const fn bg_hscroll(bg: usize) -> Self {
        Self(0x010 + 4 * (bg as u16 & 3))
    }

    #[inline]
    pub const fn bg_vscroll(bg: usize) -> Self {
        Self(0x012 + 4 * (bg as u16 & 3))
    }

    /// Index of the register in a word-addressed mirror of the I/O block.
    #[inline]
    pub const fn word_index(self) -> usize {
        (self.0 >> 1) as usize
    }
}

/// Display modes selectable through the display control register.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Four regular tiled backgrounds.
    #[default]
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
    /// 240×160 16-bit bitmap on background 2.
    Mode3 = 3,
    Mode4 = 4,
    Mode5 = 5,
}

/// The display control register.
///
/// ```text
/// [0 - 2] display mode
/// [4]     frame page (bitmap modes 4 and 5)
/// [5]     allow OAM access during hblank
/// [6]     1-D sprite tile mapping
/// [7]     force blank
/// [8 - B] background 0 - 3 enable
/// [C]     sprite enable
/// [D - F] window 0, window 1, sprite window enable
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ConstDefault)]
pub struct DisplayControl(u16);

impl DisplayControl {
    const MODE_MASK: u16 = 0x0007;
    const PAGE: u16 = 0x0010;
    const OAM_HBLANK: u16 = 0x0020;
    const SPRITE_1D: u16 = 0x0040;
    const FORCE_BLANK: u16 = 0x0080;
    const BG0: u16 = 0x0100;
    const SPRITES: u16 = 0x1000;
    const WIN0: u16 = 0x2000;
    const WIN1: u16 = 0x4000;
    const WIN_SPRITE: u16 = 0x8000;

    #[inline]
    pub const fn new(mode: DisplayMode) -> Self {
        Self(mode as u16)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    const fn with_flag(self, flag: u16, on: bool) -> Self {
        Self(if on { self.0 | flag } else { self.0 & !flag })
    }

    #[inline]
    pub const fn mode(self) -> u16 {
        self.0 & Self::MODE_MASK
    }

    #[inline]
    pub const fn with_page(self, second: bool) -> Self {
        self.with_flag(Self::PAGE, second)
    }

    #[inline]
    pub const fn with_oam_hblank(self, on: bool) -> Self {
        self.with_flag(Self::OAM_HBLANK, on)
    }

    #[inline]
    pub const fn with_sprite_1d(self, on: bool) -> Self {
        self.with_flag(Self::SPRITE_1D, on)
    }

    #[inline]
    pub const fn with_force_blank(self, on: bool) -> Self {
        self.with_flag(Self::FORCE_BLANK, on)
    }

    #[inline]
    pub const fn with_bg(self, bg: usize, on: bool) -> Self {
        self.with_flag(Self::BG0 << (bg & 3), on)
    }

    #[inline]
    pub const fn with_sprites(self, on: bool) -> Self {
        self.with_flag(Self::SPRITES, on)
    }

    #[inline]
    pub const fn with_windows(self, win0: bool, win1: bool, sprite_win: bool) -> Self {
        self.with_flag(Self::WIN0, win0)
            .with_flag(Self::WIN1, win1)
            .with_flag(Self::WIN_SPRITE, sprite_win)
    }

    #[inline]
    pub const fn bg_enabled(self, bg: usize) -> bool {
        self.0 & (Self::BG0 << (bg & 3)) != 0
    }

    #[inline]
    pub const fn sprites_enabled(self) -> bool {
        self.0 & Self::SPRITES != 0
    }

    #[inline]
    pub const fn sprite_1d(self) -> bool {
        self.0 & Self::SPRITE_1D != 0
    }

    #[inline]
    pub const fn force_blank(self) -> bool {
        self.0 & Self::FORCE_BLANK != 0
    }
}

/// The display status register. Bits 0 to 2 are read only.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ConstDefault)]
pub struct DisplayStatus(pub u16);

impl DisplayStatus {
    #[inline]
    pub const fn in_vblank(self) -> bool {
        self.0 & 0x1 != 0
    }

    #[inline]
    pub const fn in_hblank(self) -> bool {
        self.0 & 0x2 != 0
    }

    #[inline]
    pub const fn vcount_match(self) -> bool {
        self.0 & 0x4 != 0
    }

    #[inline]
    pub const fn with_irqs(self, vblank: bool, hblank: bool, vcount: bool) -> Self {
        let irqs = (vblank as u16) << 3 | (hblank as u16) << 4 | (vcount as u16) << 5;
        Self((self.0 & !0x38) | irqs)
    }

    #[inline]
    pub const fn with_vcount_compare(self, line: u8) -> Self {
        Self((self.0 & 0x00FF) | (line as u16) << 8)
    }

    #[inline]
    pub const fn vcount_compare(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

/// An enumeration of regular background sizes, in 8×8 tiles.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BgSize {
    /// 32×32 tiles, one screen-block.
    #[default]
    Small = 0,
    /// 64×32 tiles, two screen-blocks side by side.
    Wide = 1,
    /// 32×64 tiles, two screen-blocks stacked.
    Tall = 2,
    /// 64×64 tiles, a 2×2 grid of screen-blocks.
    Large = 3,
}

impl BgSize {
    /// The background size that fits an image of the given pixel dimensions, if any.
    pub const fn for_pixels(width: u32, height: u32) -> Option<Self> {
        match (width.div_ceil(256), height.div_ceil(256)) {
            (0 | 1, 0 | 1) => Some(BgSize::Small),
            (2, 0 | 1) => Some(BgSize::Wide),
            (0 | 1, 2) => Some(BgSize::Tall),
            (2, 2) => Some(BgSize::Large),
            _ => None,
        }
    }

    #[inline]
    pub const fn screens(self) -> usize {
        match self {
            BgSize::Small => 1,
            BgSize::Wide | BgSize::Tall => 2,
            BgSize::Large => 4,
        }
    }

    #[inline]
    pub const fn width_tiles(self) -> usize {
        match self {
            BgSize::Small | BgSize::Tall => 32,
            BgSize::Wide | BgSize::Large => 64,
        }
    }

    #[inline]
    pub const fn height_tiles(self) -> usize {
        match self {
            BgSize::Small | BgSize::Wide => 32,
            BgSize::Tall | BgSize::Large => 64,
        }
    }

    /// Map entries in the whole background.
    #[inline]
    pub const fn entries(self) -> usize {
        self.screens() * SCREEN_BLOCK_WORDS
    }

    /// Pitch of the background in screen-blocks.
    #[inline]
    pub const fn pitch(self) -> usize {
        self.width_tiles() / 32
    }

    /// The linear map index of tile `(x, y)`, following the screen-block layout of the hardware:
    /// each 32×32 block is stored contiguously, blocks ordered left to right then top to bottom.
    #[inline]
    pub const fn linear_index(self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width_tiles() || y >= self.height_tiles() {
            return None;
        }
        let screen = (y / 32) * self.pitch() + x / 32;
        Some(screen * SCREEN_BLOCK_WORDS + (y % 32) * 32 + x % 32)
    }
}

/// A regular background control register.
///
/// ```text
/// [0 - 1]  priority
/// [2 - 3]  character base block
/// [6]      mosaic
/// [7]      256 colour mode
/// [8 - C]  screen base block
/// [E - F]  background size
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ConstDefault)]
pub struct BgControl(u16);

impl BgControl {
    const PRIORITY_MASK: u16 = 0x0003;
    const CHAR_BASE_SHIFT: u16 = 2;
    const MOSAIC: u16 = 0x0040;
    const COLOR_256: u16 = 0x0080;
    const SCREEN_BASE_SHIFT: u16 = 8;
    const SIZE_SHIFT: u16 = 14;

    pub const ZEROED: Self = Self(0);

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn with_priority(self, priority: u8) -> Self {
        Self((self.0 & !Self::PRIORITY_MASK) | (priority as u16 & Self::PRIORITY_MASK))
    }

    #[inline]
    pub const fn with_char_base(self, block: u8) -> Self {
        Self((self.0 & !(0x3 << Self::CHAR_BASE_SHIFT)) | ((block as u16 & 0x3) << Self::CHAR_BASE_SHIFT))
    }

    #[inline]
    pub const fn with_mosaic(self, on: bool) -> Self {
        Self(if on { self.0 | Self::MOSAIC } else { self.0 & !Self::MOSAIC })
    }

    #[inline]
    pub const fn with_color_256(self, on: bool) -> Self {
        Self(if on { self.0 | Self::COLOR_256 } else { self.0 & !Self::COLOR_256 })
    }

    #[inline]
    pub const fn with_screen_base(self, block: u8) -> Self {
        Self((self.0 & !(0x1F << Self::SCREEN_BASE_SHIFT)) | ((block as u16 & 0x1F) << Self::SCREEN_BASE_SHIFT))
    }

    #[inline]
    pub const fn with_size(self, size: BgSize) -> Self {
        Self((self.0 & !(0x3 << Self::SIZE_SHIFT)) | ((size as u16) << Self::SIZE_SHIFT))
    }

    #[inline]
    pub const fn priority(self) -> u8 {
        (self.0 & Self::PRIORITY_MASK) as u8
    }

    #[inline]
    pub const fn screen_base(self) -> u8 {
        ((self.0 >> Self::SCREEN_BASE_SHIFT) & 0x1F) as u8
    }

    #[inline]
    pub const fn size(self) -> BgSize {
        match self.0 >> Self::SIZE_SHIFT {
            0 => BgSize::Small,
            1 => BgSize::Wide,
            2 => BgSize::Tall,
            _ => BgSize::Large,
        }
    }
}

/// A single tile map entry as the hardware reads it.
///
/// ```text
/// [C - F] palette slot
/// [B]     vertical flip
/// [A]     horizontal flip
/// [0 - 9] tile index (0 is the transparent tile)
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ConstDefault)]
pub struct TileEntry(u16);

impl TileEntry {
    const TILE_INDEX_MASK: u16 = 0x03FF;
    const H_FLIP_FLAG: u16 = 0x0400;
    const V_FLIP_FLAG: u16 = 0x0800;
    const PALETTE_SHIFT: u16 = 12;
    const PALETTE_MASK: u16 = 0xF << Self::PALETTE_SHIFT;

    pub const TRANSPARENT: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Create an entry for a given tile index.
    #[inline]
    pub const fn for_tile(tile_index: u16, palette: u8) -> Self {
        Self::TRANSPARENT.with_tile_index(tile_index).with_palette(palette)
    }

    #[inline]
    pub const fn tile_index(self) -> u16 {
        self.0 & Self::TILE_INDEX_MASK
    }

    #[inline]
    pub const fn with_tile_index(self, tile_index: u16) -> Self {
        Self((self.0 & !Self::TILE_INDEX_MASK) | (tile_index & Self::TILE_INDEX_MASK))
    }

    #[inline]
    pub const fn palette(self) -> u8 {
        (self.0 >> Self::PALETTE_SHIFT) as u8
    }

    #[inline]
    pub const fn with_palette(self, palette: u8) -> Self {
        Self((self.0 & !Self::PALETTE_MASK) | (((palette & 0xF) as u16) << Self::PALETTE_SHIFT))
    }

    #[inline]
    pub const fn flip_h(self) -> bool {
        self.0 & Self::H_FLIP_FLAG != 0
    }

    #[inline]
    pub const fn with_flip_h(self, flip: bool) -> Self {
        Self(if flip { self.0 | Self::H_FLIP_FLAG } else { self.0 & !Self::H_FLIP_FLAG })
    }

    #[inline]
    pub const fn flip_v(self) -> bool {
        self.0 & Self::V_FLIP_FLAG != 0
    }

    #[inline]
    pub const fn with_flip_v(self, flip: bool) -> Self {
        Self(if flip { self.0 | Self::V_FLIP_FLAG } else { self.0 & !Self::V_FLIP_FLAG })
    }

    /// Turn a tileset-relative entry into the word written to the screen-block: tile index
    /// shifted by where the tileset landed in VRAM, palette set to the tileset's slot.
    ///
    /// The raw value 0 always stays transparent.
    #[inline]
    pub const fn rebase(self, tile_offset: u16, palette: u8) -> Self {
        if self.0 == 0 {
            return Self::TRANSPARENT;
        }
        self.with_tile_index(self.tile_index().wrapping_add(tile_offset))
            .with_palette(palette)
    }
}

impl From<TileEntry> for u16 {
    fn from(value: TileEntry) -> Self {
        value.0
    }
}

impl From<u16> for TileEntry {
    fn from(value: u16) -> Self {
        TileEntry(value)
    }
}

/// A 15-bit colour: red in bits 0 - 4, green in 5 - 9, blue in 10 - 14. Bit 15 is unused.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ConstDefault)]
pub struct Rgb15(pub u16);

impl Rgb15 {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(31, 31, 31);
    pub const RED: Self = Self::new(31, 0, 0);

    /// Build a colour from 5-bit channels.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self((r as u16 & 0x1F) | (g as u16 & 0x1F) << 5 | (b as u16 & 0x1F) << 10)
    }

    /// Scale 8-bit channels down to 5 bits, rounding to nearest.
    #[inline]
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        const fn down(c: u8) -> u8 {
            ((c as u16 * 31 + 127) / 255) as u8
        }
        Self::new(down(r), down(g), down(b))
    }

    /// Scale the 5-bit channels back up to 8 bits, rounding to nearest.
    #[inline]
    pub const fn to_rgb888(self) -> (u8, u8, u8) {
        const fn up(c: u16) -> u8 {
            ((c * 255 + 15) / 31) as u8
        }
        (up(self.0 & 0x1F), up((self.0 >> 5) & 0x1F), up((self.0 >> 10) & 0x1F))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 5) & 0x1F) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        ((self.0 >> 10) & 0x1F) as u8
    }

    #[inline]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

/// The shape of a sprite, combined with [`SpriteSize`] to give its pixel dimensions.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Shape {
    #[default]
    Square = 0,
    Wide = 1,
    Tall = 2,
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SpriteSize {
    #[default]
    Small = 0,
    Medium = 1,
    Large = 2,
    XL = 3,
}

/// Pixel dimensions of a sprite shape/size pair.
pub const fn sprite_dimensions(shape: Shape, size: SpriteSize) -> (u8, u8) {
    match (shape, size) {
        (Shape::Square, SpriteSize::Small) => (8, 8),
        (Shape::Square, SpriteSize::Medium) => (16, 16),
        (Shape::Square, SpriteSize::Large) => (32, 32),
        (Shape::Square, SpriteSize::XL) => (64, 64),
        (Shape::Wide, SpriteSize::Small) => (16, 8),
        (Shape::Wide, SpriteSize::Medium) => (32, 8),
        (Shape::Wide, SpriteSize::Large) => (32, 16),
        (Shape::Wide, SpriteSize::XL) => (64, 32),
        (Shape::Tall, SpriteSize::Small) => (8, 16),
        (Shape::Tall, SpriteSize::Medium) => (8, 32),
        (Shape::Tall, SpriteSize::Large) => (16, 32),
        (Shape::Tall, SpriteSize::XL) => (32, 64),
    }
}

/// Find the shape/size pair for a `width`×`height` pixel sprite.
pub const fn sprite_shape_for(width: u8, height: u8) -> Option<(Shape, SpriteSize)> {
    Some(match (width, height) {
        (8, 8) => (Shape::Square, SpriteSize::Small),
        (16, 16) => (Shape::Square, SpriteSize::Medium),
        (32, 32) => (Shape::Square, SpriteSize::Large),
        (64, 64) => (Shape::Square, SpriteSize::XL),
        (16, 8) => (Shape::Wide, SpriteSize::Small),
        (32, 8) => (Shape::Wide, SpriteSize::Medium),
        (32, 16) => (Shape::Wide, SpriteSize::Large),
        (64, 32) => (Shape::Wide, SpriteSize::XL),
        (8, 16) => (Shape::Tall, SpriteSize::Small),
        (8, 32) => (Shape::Tall, SpriteSize::Medium),
        (16, 32) => (Shape::Tall, SpriteSize::Large),
        (32, 64) => (Shape::Tall, SpriteSize::XL),
        _ => return None,
    })
}

/// Sprite render mode, attribute 0 bits 8 - 9.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjMode {
    #[default]
    Normal = 0,
    Affine = 1,
    Hide = 2,
    AffineDouble = 3,
}

/// Sprite effect, attribute 0 bits 10 - 11.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjEffect {
    #[default]
    Normal = 0,
    Blend = 1,
    Window = 2,
}

/// One OAM entry's three attribute words.
///
/// ```text
/// attr0: [0 - 7] y, [8 - 9] mode, [A - B] effect, [C] mosaic, [D] 256 colour, [E - F] shape
/// attr1: [0 - 8] x, [9 - D] affine index (affine only), [C] h-flip, [D] v-flip, [E - F] size
/// attr2: [0 - 9] tile index, [A - B] priority, [C - F] palette slot
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ConstDefault)]
pub struct ObjAttrs {
    pub attr0: u16,
    pub attr1: u16,
    pub attr2: u16,
}

impl ObjAttrs {
    pub const ZEROED: Self = <Self as ConstDefault>::DEFAULT;

    /// An entry parked off screen: y 255, hidden, x 511.
    pub const HIDDEN: Self = Self::ZEROED.with_y(255).with_mode(ObjMode::Hide).with_x(511);

    const H_FLIP: u16 = 0x1000;
    const V_FLIP: u16 = 0x2000;

    #[inline]
    pub const fn with_y(mut self, y: u16) -> Self {
        self.attr0 = (self.attr0 & !0x00FF) | (y & 0x00FF);
        self
    }

    #[inline]
    pub const fn with_mode(mut self, mode: ObjMode) -> Self {
        self.attr0 = (self.attr0 & !0x0300) | ((mode as u16) << 8);
        self
    }

    #[inline]
    pub const fn with_effect(mut self, effect: ObjEffect) -> Self {
        self.attr0 = (self.attr0 & !0x0C00) | ((effect as u16) << 10);
        self
    }

    #[inline]
    pub const fn with_mosaic(mut self, on: bool) -> Self {
        self.attr0 = (self.attr0 & !0x1000) | ((on as u16) << 12);
        self
    }

    #[inline]
    pub const fn with_color_256(mut self, on: bool) -> Self {
        self.attr0 = (self.attr0 & !0x2000) | ((on as u16) << 13);
        self
    }

    #[inline]
    pub const fn with_shape(mut self, shape: Shape) -> Self {
        self.attr0 = (self.attr0 & !0xC000) | ((shape as u16) << 14);
        self
    }

    #[inline]
    pub const fn with_x(mut self, x: u16) -> Self {
        self.attr1 = (self.attr1 & !0x01FF) | (x & 0x01FF);
        self
    }

    #[inline]
    pub const fn with_flip(mut self, h: bool, v: bool) -> Self {
        self.attr1 &= !(Self::H_FLIP | Self::V_FLIP);
        if h {
            self.attr1 |= Self::H_FLIP;
        }
        if v {
            self.attr1 |= Self::V_FLIP;
        }
        self
    }

    #[inline]
    pub const fn with_size(mut self, size: SpriteSize) -> Self {
        self.attr1 = (self.attr1 & !0xC000) | ((size as u16) << 14);
        self
    }

    #[inline]
    pub const fn with_tile_index(mut self, index: u16) -> Self {
        self.attr2 = (self.attr2 & !0x03FF) | (index & 0x03FF);
        self
    }

    #[inline]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.attr2 = (self.attr2 & !0x0C00) | ((priority as u16 & 0x3) << 10);
        self
    }

    #[inline]
    pub const fn with_palette(mut self, palette: u8) -> Self {
        self.attr2 = (self.attr2 & !0xF000) | ((palette as u16 & 0xF) << 12);
        self
    }

    #[inline]
    pub const fn y(&self) -> u16 {
        self.attr0 & 0x00FF
    }

    #[inline]
    pub const fn x(&self) -> u16 {
        self.attr1 & 0x01FF
    }

    #[inline]
    pub const fn hidden(&self) -> bool {
        self.attr0 & 0x0300 == (ObjMode::Hide as u16) << 8
    }

    #[inline]
    pub const fn flip_h(&self) -> bool {
        self.attr1 & Self::H_FLIP != 0
    }

    #[inline]
    pub const fn flip_v(&self) -> bool {
        self.attr1 & Self::V_FLIP != 0
    }

    #[inline]
    pub const fn tile_index(&self) -> u16 {
        self.attr2 & 0x03FF
    }

    #[inline]
    pub const fn words(&self) -> [u16; 3] {
        [self.attr0, self.attr1, self.attr2]
    }
}
