//! A small tile and sprite engine for the Game Boy Advance.
//!
//! Graphics come in as static blobs and are registered with [`Assets`]; the engine moves them in
//! and out of video memory as sprites and backgrounds are loaded and unloaded, and once per
//! frame pushes sprite attributes, background registers and changed map tiles to the hardware.
//! All hardware access goes through [`HardwareIo`], so the same game code runs on the device
//! ([`Gba`]) and under `cargo test` ([`HostIo`]).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod asset;
pub mod background;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod sprite;
pub mod sys;

pub use asset::{Assets, Binding, PaletteId, TileMapId, TileSetId};
pub use background::{Background, BackgroundId};
pub use engine::{Engine, EngineConfig, Scene};
pub use error::{Bank, Error, Pool, Result};
pub use sprite::{Animation, Frame, MetaSprite, Sprite, SpriteId};
pub use sys::fixed::{Fix8, Rect, V2};
pub use sys::host::HostIo;
pub use sys::hw::{Gba, HardwareIo};
pub use sys::io::Key;
pub use sys::video::Rgb15;
