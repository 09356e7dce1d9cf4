//! Error types for the terminal core
//!
//! Parsing never fails; these only surface configuration problems found while
//! a display mode, font or screen snapshot is being set up.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    #[error("font {font_width}x{font_height} does not fit a {width}x{height} display")]
    FontTooLarge {
        font_width: usize,
        font_height: usize,
        width: usize,
        height: usize,
    },

    #[error("glyph table of {len} bytes does not hold whole {width}x{height} glyphs")]
    InvalidFont { width: usize, height: usize, len: usize },

    #[error("unknown built-in font index {0}")]
    UnknownFont(usize),

    #[error("display mode {width}x{height}x{bpp} is not supported")]
    UnsupportedMode { width: usize, height: usize, bpp: usize },

    #[error("invalid framebuffer geometry: {width}x{height} with pitch {pitch}")]
    InvalidGeometry {
        width: usize,
        height: usize,
        pitch: usize,
    },

    #[error("screen buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, GfxError>;
