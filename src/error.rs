use core::fmt;

/// The VRAM cell pools the engine allocates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    /// 4bpp tiles in background character blocks 0 and 1.
    BgTiles,
    /// 4bpp tiles in the sprite character blocks.
    SpriteTiles,
    /// 2 KiB screen-blocks in the upper half of background VRAM.
    ScreenBlocks,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pool::BgTiles => "background tile",
            Pool::SpriteTiles => "sprite tile",
            Pool::ScreenBlocks => "screen-block",
        })
    }
}

/// Which half of palette memory (and which tile pool) an asset lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    Background,
    Sprite,
}

impl Bank {
    #[inline]
    pub const fn tile_pool(self) -> Pool {
        match self {
            Bank::Background => Pool::BgTiles,
            Bank::Sprite => Pool::SpriteTiles,
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bank::Background => "background",
            Bank::Sprite => "sprite",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("out of memory: no free block large enough in the {pool} pool")]
    OutOfMemory { pool: Pool },

    #[error("palette memory full: all 8 {bank} palette slots are in use")]
    PaletteFull { bank: Bank },

    #[error("too many active {what} (limit {limit})")]
    TooManyActive { what: &'static str, limit: usize },

    #[error("invalid asset: {0}")]
    InvalidAsset(&'static str),

    #[error("configuration error: {0}")]
    Config(&'static str),

    #[error("handle does not refer to a live object")]
    StaleHandle,

    #[error("{what} is still in use")]
    InUse { what: &'static str },
}

pub type Result<T> = core::result::Result<T, Error>;
