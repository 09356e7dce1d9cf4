//! Core terminal emulation components.
//!
//! - **surface**: 8bpp framebuffer with clipped fills, block copies and scrolls
//! - **font**: glyph sources and the built-in font registry
//! - **devices**: display mode switching and bell contracts
//! - **term**: terminal context, escape parser, glyph and cursor rendering
//! - **session**: byte entry point tying the parser to the devices
//!
//! # Architecture
//!
//! ```text
//! Terminal
//! ├── VtParser (escape sequences)
//! ├── TerminalState
//! │   ├── PixelSurface (pixels + copy engine)
//! │   ├── Font
//! │   └── Cursor (position, flags, overlay buffer)
//! ├── DisplayDriver (mode switch)
//! └── Beeper (bell)
//! ```

pub mod devices;
pub mod error;
pub mod font;
pub mod session;
pub mod surface;
pub mod term;

pub use error::{GfxError, Result};
pub use session::{CursorBlinker, SharedTerminal, Terminal, TerminalOptions};
