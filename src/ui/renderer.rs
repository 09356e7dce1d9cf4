//! Framebuffer viewer using crossterm
//!
//! Shows the 8bpp pixel surface in the console. Every console cell carries
//! two pixel rows through the upper half block: the top pixel as foreground,
//! the bottom one as background. Large surfaces are sampled down to fit.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::config::Palette;
use crate::core::surface::PixelSurface;
use crate::core::term::TerminalState;

const UPPER_HALF: char = '▀';

/// Console renderer for a pixel surface
pub struct Renderer {
    palette: Palette,
    /// Whether the terminal has been initialized
    initialized: bool,
    /// Previous frame as (top, bottom) color pairs
    prev_frame: Vec<(u8, u8)>,
    /// Console size of the previous frame
    size: (u16, u16),
}

impl Renderer {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            initialized: false,
            prev_frame: Vec::new(),
            size: (0, 0),
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, DisableLineWrap, Hide, Clear(ClearType::All))?;
        self.initialized = true;
        self.invalidate();
        Ok(())
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        let _ = execute!(stdout, ResetColor, Show, EnableLineWrap, LeaveAlternateScreen);
        let _ = stdout.flush();
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Force a full redraw on the next render
    pub fn invalidate(&mut self) {
        self.prev_frame.clear();
    }

    /// Render the surface, redrawing only cells whose colors changed
    pub fn render(&mut self, surface: &PixelSurface) -> io::Result<()> {
        let (cols, rows) = Self::size()?;
        if (cols, rows) != self.size {
            self.size = (cols, rows);
            self.invalidate();
        }
        let frame = sample(surface, usize::from(cols), usize::from(rows));
        let full = self.prev_frame.len() != frame.len();

        let stdout = io::stdout();
        let mut stdout = io::BufWriter::with_capacity(65536, stdout.lock());
        if full {
            queue!(stdout, ResetColor, Clear(ClearType::All))?;
        }

        let width = usize::from(cols);
        let mut last_colors = None;
        let mut next_pos = None;
        for (i, &(top, bottom)) in frame.iter().enumerate() {
            if !full && self.prev_frame[i] == (top, bottom) {
                continue;
            }
            let (x, y) = (i % width, i / width);
            if next_pos != Some(i) {
                queue!(stdout, MoveTo(x as u16, y as u16))?;
            }
            if last_colors != Some((top, bottom)) {
                queue!(
                    stdout,
                    SetForegroundColor(self.palette.color(top).to_crossterm()),
                    SetBackgroundColor(self.palette.color(bottom).to_crossterm())
                )?;
                last_colors = Some((top, bottom));
            }
            queue!(stdout, Print(UPPER_HALF))?;
            next_pos = (x + 1 < width).then_some(i + 1);
        }

        queue!(stdout, ResetColor)?;
        stdout.flush()?;
        self.prev_frame = frame;
        Ok(())
    }

    /// Get terminal size
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Sample `surface` onto a `cols` x `rows` console, two pixel rows per cell.
fn sample(surface: &PixelSurface, cols: usize, rows: usize) -> Vec<(u8, u8)> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let step = surface
        .width()
        .div_ceil(cols)
        .max(surface.height().div_ceil(rows * 2))
        .max(1);
    let used_cols = surface.width().div_ceil(step).min(cols);
    let used_rows = surface.height().div_ceil(step * 2).min(rows);

    let mut frame = vec![(0, 0); cols * rows];
    for row in 0..used_rows {
        for col in 0..used_cols {
            let x = col * step;
            let top = surface.pixel(x, row * 2 * step).unwrap_or(0);
            let bottom = surface.pixel(x, (row * 2 + 1) * step).unwrap_or(0);
            frame[row * cols + col] = (top, bottom);
        }
    }
    frame
}

/// Simple debug renderer that outputs to a string
pub struct DebugRenderer;

impl DebugRenderer {
    /// Recover the text on screen by matching every cell against the font.
    /// Cells that match no glyph show as `?`, the visible cursor as `█`.
    pub fn render(state: &TerminalState) -> String {
        let (rows, cols) = state.term_size();
        let (cursor_row, cursor_col) = state.cursor_position();
        let cursor_shown = state.cursor_visible();
        let mut output = String::new();

        output.push_str(&format!("=== Terminal {}x{} ===\n", cols, rows));
        output.push_str(&format!(
            "Cursor: ({}, {}) visible={}\n",
            cursor_col, cursor_row, cursor_shown
        ));
        output.push_str(&"─".repeat(cols));
        output.push('\n');

        for row in 0..rows {
            let indicator = if row == cursor_row { '>' } else { ' ' };
            output.push(indicator);
            for col in 0..cols {
                let ch = if cursor_shown && row == cursor_row && col == cursor_col {
                    '█'
                } else {
                    Self::recognize(state, row, col)
                };
                output.push(ch);
            }
            output.push('\n');
        }

        output.push_str(&"─".repeat(cols));
        output.push('\n');
        output
    }

    fn recognize(state: &TerminalState, row: usize, col: usize) -> char {
        let font = state.font();
        let (fw, fh) = (font.width(), font.height());
        let (x0, y0) = state.cell_origin(row, col);
        let background = state.colors().default_bg;

        let mut ink = Vec::with_capacity(fw * fh);
        for y in y0..y0 + fh {
            for x in x0..x0 + fw {
                ink.push(state.surface().pixel(x, y).map_or(false, |p| p != background));
            }
        }
        if ink.iter().all(|&on| !on) {
            return ' ';
        }

        (0x21u8..0x7F)
            .find(|&code| {
                font.glyph(u32::from(code)).map_or(false, |glyph| {
                    glyph.iter().zip(&ink).all(|(&bit, &on)| (bit != 0) == on)
                })
            })
            .map_or('?', char::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::CopyPath;
    use crate::core::{Terminal, TerminalOptions};

    #[test]
    fn test_sample_halves() {
        let mut surface = PixelSurface::new(4, 4, 4, CopyPath::Rows).unwrap();
        surface.fill_rect(0, 0, 4, 1, 3);
        surface.fill_rect(0, 1, 4, 1, 5);
        let frame = sample(&surface, 4, 2);
        assert_eq!(frame[0], (3, 5));
        assert_eq!(frame[4], (0, 0));

        // Twice as large as the console: every other pixel
        let frame = sample(&surface, 2, 1);
        assert_eq!(frame, vec![(3, 0), (3, 0)]);
        assert!(sample(&surface, 0, 5).is_empty());
    }

    #[test]
    fn test_debug_renderer_text() {
        let options = TerminalOptions {
            width: 640,
            height: 400,
            ..TerminalOptions::default()
        };
        let mut term = Terminal::in_memory(options).unwrap();
        term.put_string(b"Hi!\r\n\x1b[31mok");
        let dump = DebugRenderer::render(term.state());

        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "=== Terminal 80x25 ===");
        assert!(lines[3].starts_with(" Hi! "));
        assert!(lines[4].starts_with(">ok█ "));
    }
}
