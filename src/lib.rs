//! gfxterm - an escape-sequence terminal drawn into an 8bpp framebuffer
//!
//! Bytes go in through [`Terminal::put_string`]; the terminal interprets the
//! usual control characters and a VT100/ANSI.SYS subset of escape sequences,
//! rasterizes glyphs into a [`PixelSurface`](core::surface::PixelSurface)
//! and keeps a cursor drawn on top of it.
//!
//! ```
//! use gfxterm::{Terminal, TerminalOptions};
//!
//! let mut term = Terminal::in_memory(TerminalOptions::default()).unwrap();
//! term.put_string(b"\x1b[2J\x1b[10;20HX");
//! assert_eq!(term.cursor_position(), (9, 20));
//! ```

pub mod config;
pub mod core;
pub mod ui;

pub use crate::core::{CursorBlinker, GfxError, SharedTerminal, Terminal, TerminalOptions};
