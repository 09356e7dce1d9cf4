//! Terminal emulation over a pixel surface
//!
//! - **state**: grid geometry, cursor, colors and erase operations
//! - **render**: glyph drawing and the cursor overlay
//! - **scroll**: pixel scrolling and cell/line insertion
//! - **parser**: escape sequence state machine
//! - **modes**: legacy display mode table

pub mod modes;
pub mod parser;
mod render;
mod scroll;
pub mod state;

pub use modes::DisplayMode;
pub use parser::{Flow, VtParser};
pub use state::{Colors, CursorFlags, TerminalState};
