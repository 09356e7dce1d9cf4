//! Escape sequence parser
//!
//! Consumes the bytes the driver does not handle itself and applies
//! `ESC [ ... <letter>` commands to the terminal state. Malformed or unknown
//! sequences are swallowed; the parser always finds its way back to
//! [`ParserState::Normal`].

use super::modes::{self, DisplayMode};
use super::state::TerminalState;

const ESC: u8 = 0x1B;

/// Parameters kept per sequence. Extra `;` separators reuse the last slot.
pub const MAX_PARAMS: usize = 16;

/// What the driver must do once a byte has been consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wrap and scroll if the cursor ran off the grid
    CheckScroll,
    /// Leave the cursor where it is, even off the grid
    SkipScroll,
    /// Switch the display to another mode, then check scroll
    ModeChange(DisplayMode),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserState {
    #[default]
    Normal,
    WaitBracket,
    Select,
    ReadDigit,
    IgnoreDigit,
}

/// Marker byte right after `ESC [` choosing a command dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateMode {
    /// `?` cursor visibility and blink
    Query,
    /// `#` pixel scrolling
    Scroll,
    /// `=` display mode, font and tab width
    Setup,
}

impl PrivateMode {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'?' => Some(Self::Query),
            b'#' => Some(Self::Scroll),
            b'=' => Some(Self::Setup),
            _ => None,
        }
    }
}

/// Parser state machine
#[derive(Debug, Clone, Default)]
pub struct VtParser {
    state: ParserState,
    params: [u32; MAX_PARAMS],
    params_count: usize,
    private: Option<PrivateMode>,
}

impl VtParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Parameters collected so far for the pending sequence.
    pub fn params(&self) -> &[u32] {
        &self.params[..self.params_count]
    }

    pub fn private_mode(&self) -> Option<PrivateMode> {
        self.private
    }

    /// Drop any pending sequence.
    pub fn reset(&mut self) {
        self.state = ParserState::Normal;
        self.params_count = 0;
        self.private = None;
    }

    /// Feed a single byte to the parser
    pub fn feed(&mut self, byte: u8, state: &mut TerminalState) -> Flow {
        match self.state {
            ParserState::Normal => self.normal(byte, state),
            ParserState::WaitBracket => self.wait_bracket(byte, state),
            ParserState::Select => self.select(byte, state),
            ParserState::ReadDigit => self.read_digit(byte, state),
            ParserState::IgnoreDigit => self.ignore_digit(byte, state),
        }
    }

    fn normal(&mut self, byte: u8, state: &mut TerminalState) -> Flow {
        if byte == ESC {
            self.state = ParserState::WaitBracket;
        } else {
            state.put_glyph(u32::from(byte));
        }
        Flow::CheckScroll
    }

    fn wait_bracket(&mut self, byte: u8, state: &mut TerminalState) -> Flow {
        match byte {
            b'[' => {
                self.params_count = 0;
                self.private = None;
                self.state = ParserState::Select;
            }
            ESC => {
                // ESC ESC prints the escape glyph
                state.put_glyph(u32::from(ESC));
                self.state = ParserState::Normal;
            }
            _ => {
                tracing::debug!("Abandoned escape before {:?}", byte as char);
                self.state = ParserState::Normal;
            }
        }
        Flow::CheckScroll
    }

    fn select(&mut self, byte: u8, state: &mut TerminalState) -> Flow {
        match byte {
            b'0'..=b'9' => {
                self.params[0] = u32::from(byte - b'0');
                self.params_count = 1;
                self.state = ParserState::ReadDigit;
                Flow::CheckScroll
            }
            b'?' | b'#' | b'=' => {
                self.private = PrivateMode::from_byte(byte);
                self.params_count = 0;
                self.state = ParserState::ReadDigit;
                Flow::CheckScroll
            }
            _ => self.dispatch(byte, state),
        }
    }

    fn read_digit(&mut self, byte: u8, state: &mut TerminalState) -> Flow {
        match byte {
            b'0'..=b'9' => {
                if self.params_count == 0 {
                    self.params[0] = 0;
                    self.params_count = 1;
                }
                let digit = u32::from(byte - b'0');
                let last = &mut self.params[self.params_count - 1];
                *last = last.saturating_mul(10).saturating_add(digit);
                Flow::CheckScroll
            }
            b';' => {
                self.next_param();
                Flow::CheckScroll
            }
            b'.' => {
                self.state = ParserState::IgnoreDigit;
                Flow::CheckScroll
            }
            _ => self.dispatch(byte, state),
        }
    }

    fn ignore_digit(&mut self, byte: u8, state: &mut TerminalState) -> Flow {
        match byte {
            b'0'..=b'9' => Flow::CheckScroll,
            b';' => {
                self.next_param();
                self.state = ParserState::ReadDigit;
                Flow::CheckScroll
            }
            _ => self.dispatch(byte, state),
        }
    }

    fn next_param(&mut self) {
        if self.params_count < MAX_PARAMS {
            self.params_count += 1;
        }
        self.params[self.params_count - 1] = 0;
    }

    fn dispatch(&mut self, final_byte: u8, state: &mut TerminalState) -> Flow {
        let stored = self.params;
        let params = &stored[..self.params_count];

        let flow = match (self.private, final_byte) {
            (Some(PrivateMode::Scroll), _) => execute_scroll(final_byte, params, state),
            (Some(PrivateMode::Setup), b'h') => params
                .last()
                .and_then(|&number| modes::legacy_mode(number))
                .map_or(Flow::CheckScroll, Flow::ModeChange),
            (Some(PrivateMode::Setup), b'f') => {
                if let Some(index @ 0..=2) = params.last().copied() {
                    if let Err(e) = state.select_builtin_font(index as usize) {
                        tracing::warn!("Font {} rejected: {}", index, e);
                    }
                }
                Flow::CheckScroll
            }
            (Some(PrivateMode::Setup), b't') => {
                if let Some(&width) = params.last() {
                    state.set_tab_stop(width as usize);
                }
                Flow::CheckScroll
            }
            (private, _) => {
                execute_csi(private, final_byte, params, state);
                Flow::CheckScroll
            }
        };

        self.reset();
        flow
    }
}

/// `ESC [ # <n> <letter>`: pixel scrolling. The cursor is left alone.
/// Unknown letters do nothing but keep the overflow check.
fn execute_scroll(final_byte: u8, params: &[u32], state: &mut TerminalState) -> Flow {
    let scroll: fn(&mut TerminalState, usize) = match final_byte {
        b'"' => TerminalState::scroll_up,
        b'_' => TerminalState::scroll_down,
        b'>' => TerminalState::scroll_right,
        b'<' => TerminalState::scroll_left,
        _ => {
            tracing::debug!("Unknown scroll command: {:?}", final_byte as char);
            return Flow::CheckScroll;
        }
    };
    if let &[pixels] = params {
        scroll(state, pixels as usize);
    }
    Flow::SkipScroll
}

fn execute_csi(private: Option<PrivateMode>, final_byte: u8, params: &[u32], state: &mut TerminalState) {
    let first = params.first().map_or(0, |&n| i64::from(n));
    let single = params.len() == 1;
    let cursor_25 = private == Some(PrivateMode::Query) && params == [25];

    match final_byte {
        // Cursor visibility and blink
        b'l' => {
            if cursor_25 {
                state.set_cursor_blinking(false);
                if state.cursor_visible() {
                    state.set_cursor_visible(false);
                }
            }
        }
        b'h' => {
            if cursor_25 {
                state.set_cursor_blinking(false);
                if !state.cursor_visible() {
                    state.set_cursor_visible(true);
                }
            }
        }
        b'b' => {
            if cursor_25 {
                state.set_cursor_blinking(true);
            }
        }

        // Erase
        b'K' => match params {
            [] | [0] => state.clear_till_end(),
            [1] => state.clear_till_cursor(),
            [2] => state.clear_line(),
            _ => {}
        },
        b'J' => match params {
            [] | [0] => state.clear_screen_from_cursor(),
            [1] => state.clear_screen_to_cursor(),
            [2] => {
                state.move_cursor(0, 0);
                state.clear_screen();
            }
            _ => {}
        },

        // Cursor movement
        b'A' => state.move_cursor_by(-first, 0),
        b'B' => state.move_cursor_by(first, 0),
        b'C' => state.move_cursor_by(0, first),
        b'D' => state.move_cursor_by(0, -first),
        // A 0 coordinate counts as 1 instead of wrapping to the far edge
        b'H' | b'f' => match params {
            &[row, col] => {
                let (rows, cols) = state.term_size();
                let row = row.saturating_sub(1) as usize % rows;
                let col = col.saturating_sub(1) as usize % cols;
                state.move_cursor(row, col);
            }
            _ => state.move_cursor(0, 0),
        },
        b's' => state.save_cursor(),
        b'u' => state.restore_cursor(),

        b'm' => execute_sgr(params, state),

        // Cell and line editing
        b'@' if single => state.insert_blank(),
        b'P' if single => state.delete_char(),
        b'L' if single => state.insert_line(),
        b'M' if single => state.delete_line(),
        b'@' | b'P' | b'L' | b'M' => {}

        _ => {
            tracing::debug!(
                "Unknown CSI: private={:?}, params={:?}, final={:?}",
                private,
                params,
                final_byte as char
            );
        }
    }
}

fn execute_sgr(params: &[u32], state: &mut TerminalState) {
    match params {
        &[38, mode @ (5 | 6), color] => {
            let color = color as u8;
            state.set_fg(color);
            if mode == 6 {
                state.set_default_fg(color);
            }
            return;
        }
        &[48, mode @ (5 | 6), color] => {
            let color = color as u8;
            state.set_bg(color);
            if mode == 6 {
                state.set_default_bg(color);
            }
            return;
        }
        [38 | 48, _, _] => return,
        [] => {
            state.reset_colors();
            return;
        }
        _ => {}
    }

    for &param in params.iter().take(3) {
        match param {
            0 => state.reset_colors(),
            1 | 22 => state.brighten(),
            2 => state.darken(),
            7 => state.enter_reverse(),
            27 => state.leave_reverse(),
            30..=37 => state.set_fg((param - 30) as u8),
            40..=47 => state.set_bg((param - 40) as u8),
            90..=97 => state.set_fg((param - 82) as u8),
            100..=107 => state.set_bg((param - 92) as u8),
            _ => {}
        }
    }
}
