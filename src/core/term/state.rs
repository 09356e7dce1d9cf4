//! Terminal context
//!
//! Owns the pixel surface of the current display mode together with the
//! character grid laid over it: cursor position, colors, tab stop, font and
//! the cursor overlay buffer. Drawing lives in `render`, block moves in
//! `scroll`.

use bitflags::bitflags;

use crate::core::error::{GfxError, Result};
use crate::core::font::{self, Font};
use crate::core::surface::PixelSurface;

/// Tab stop used after every mode switch.
pub const DEFAULT_TAB_STOP: usize = 8;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct CursorFlags: u8 {
        const VISIBLE      = 0b0000_0001;
        const BLINK        = 0b0000_0010;
        /// The overlay buffer holds the true content of the cursor cell
        const BUFFER_READY = 0b0000_0100;
    }
}

/// Cursor position and flags
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    pub row: usize,
    pub col: usize,
    pub flags: CursorFlags,
    pub saved: (usize, usize),
}

/// Current and default text colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colors {
    pub fg: u8,
    pub bg: u8,
    pub default_fg: u8,
    pub default_bg: u8,
    pub reverse: bool,
}

impl Colors {
    pub fn new(default_fg: u8, default_bg: u8) -> Self {
        Self {
            fg: default_fg,
            bg: default_bg,
            default_fg,
            default_bg,
            reverse: false,
        }
    }

    /// Back to the defaults, leaving reverse video.
    pub fn reset(&mut self) {
        self.fg = self.default_fg;
        self.bg = self.default_bg;
        self.reverse = false;
    }
}

/// Terminal state for one display mode
pub struct TerminalState {
    pub(super) surface: PixelSurface,
    pub(super) font: Font,
    pub(super) font_width: usize,
    pub(super) font_height: usize,
    pub(super) cols: usize,
    pub(super) rows: usize,
    pub(super) cursor: CursorState,
    pub(super) colors: Colors,
    pub(super) tab_stop: usize,
    /// True pixels under the cursor overlay
    pub(super) cursor_buffer: Vec<u8>,
    /// Scratch space for one rendered glyph
    pub(super) glyph_buffer: Vec<u8>,
}

impl std::fmt::Debug for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalState")
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("font", &(self.font_width, self.font_height))
            .field("cursor", &self.cursor)
            .field("colors", &self.colors)
            .field("tab_stop", &self.tab_stop)
            .finish()
    }
}

fn grid(surface: &PixelSurface, font: &Font) -> Result<(usize, usize)> {
    let (fw, fh) = (font.width(), font.height());
    let too_large = GfxError::FontTooLarge {
        font_width: fw,
        font_height: fh,
        width: surface.width(),
        height: surface.height(),
    };
    if fw == 0 || fh == 0 {
        return Err(too_large);
    }
    let (cols, rows) = (surface.width() / fw, surface.height() / fh);
    if cols == 0 || rows == 0 {
        return Err(too_large);
    }
    Ok((cols, rows))
}

impl TerminalState {
    pub fn new(surface: PixelSurface, font: Font, default_fg: u8, default_bg: u8) -> Result<Self> {
        let (cols, rows) = grid(&surface, &font)?;
        let (font_width, font_height) = (font.width(), font.height());
        let cell = font_width * font_height;
        let mut state = Self {
            surface,
            font,
            font_width,
            font_height,
            cols,
            rows,
            cursor: CursorState {
                flags: CursorFlags::VISIBLE,
                ..CursorState::default()
            },
            colors: Colors::new(default_fg, default_bg),
            tab_stop: DEFAULT_TAB_STOP.min(cols),
            cursor_buffer: vec![0; cell],
            glyph_buffer: vec![0; cell],
        };
        state.render_cursor();
        Ok(state)
    }

    // ---- geometry ----

    /// Character grid as (rows, cols).
    pub fn term_size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Display size in pixels as (width, height).
    pub fn pixel_size(&self) -> (usize, usize) {
        (self.surface.width(), self.surface.height())
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    /// Pixel origin of a cell.
    pub fn cell_origin(&self, row: usize, col: usize) -> (usize, usize) {
        (col * self.font_width, row * self.font_height)
    }

    // ---- font ----

    /// Switch fonts, recomputing the grid. A font that leaves no room for a
    /// single cell is refused and the current one stays.
    pub fn set_font(&mut self, font: Font) -> Result<()> {
        let (cols, rows) = grid(&self.surface, &font)?;
        self.restore_cursor_content();

        self.font_width = font.width();
        self.font_height = font.height();
        self.font = font;
        self.cols = cols;
        self.rows = rows;

        let cell = self.font_width * self.font_height;
        self.cursor_buffer = vec![0; cell];
        self.glyph_buffer = vec![0; cell];
        self.cursor.flags.remove(CursorFlags::BUFFER_READY);
        self.cursor.row = self.cursor.row.min(rows - 1);
        self.cursor.col = self.cursor.col.min(cols - 1);
        self.tab_stop = self.tab_stop.min(cols);

        tracing::info!("Font {}x{} -> grid {}x{}", self.font_width, self.font_height, cols, rows);
        self.render_cursor();
        Ok(())
    }

    /// Select one of the built-in fonts by registry index.
    pub fn select_builtin_font(&mut self, index: usize) -> Result<()> {
        let font = font::builtin(index)?;
        self.set_font(font)
    }

    // ---- colors ----

    pub fn colors(&self) -> Colors {
        self.colors
    }

    pub fn fg(&self) -> u8 {
        self.colors.fg
    }

    pub fn bg(&self) -> u8 {
        self.colors.bg
    }

    pub fn set_fg(&mut self, color: u8) {
        self.colors.fg = color;
    }

    pub fn set_bg(&mut self, color: u8) {
        self.colors.bg = color;
    }

    pub fn set_default_fg(&mut self, color: u8) {
        self.colors.default_fg = color;
    }

    pub fn set_default_bg(&mut self, color: u8) {
        self.colors.default_bg = color;
    }

    pub fn swap_fg_bg(&mut self) {
        std::mem::swap(&mut self.colors.fg, &mut self.colors.bg);
    }

    pub fn reset_colors(&mut self) {
        self.colors.reset();
    }

    pub fn enter_reverse(&mut self) {
        if !self.colors.reverse {
            self.swap_fg_bg();
            self.colors.reverse = true;
        }
    }

    pub fn leave_reverse(&mut self) {
        if self.colors.reverse {
            self.swap_fg_bg();
            self.colors.reverse = false;
        }
    }

    /// Move a normal foreground color into the bright bank.
    pub fn brighten(&mut self) {
        if self.colors.fg <= 7 {
            self.colors.fg += 8;
        }
    }

    pub fn darken(&mut self) {
        if self.colors.fg >= 8 {
            self.colors.fg -= 8;
        }
    }

    // ---- tabulation ----

    pub fn tab_stop(&self) -> usize {
        self.tab_stop
    }

    pub fn set_tab_stop(&mut self, width: usize) {
        self.tab_stop = width.min(self.cols);
    }

    // ---- cursor ----

    pub fn cursor_position(&self) -> (usize, usize) {
        (self.cursor.row, self.cursor.col)
    }

    pub fn cursor_flags(&self) -> CursorFlags {
        self.cursor.flags
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor.flags.contains(CursorFlags::VISIBLE)
    }

    pub fn cursor_blinking(&self) -> bool {
        self.cursor.flags.contains(CursorFlags::BLINK)
    }

    /// Place the cursor, clamping to the grid.
    pub fn move_cursor(&mut self, row: usize, col: usize) {
        self.restore_cursor_content();
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.col = col.min(self.cols - 1);
        if self.cursor_blinking() {
            self.cursor.flags.insert(CursorFlags::VISIBLE);
        }
        self.render_cursor();
    }

    /// Relative move; an axis whose result would be negative stays put.
    pub fn move_cursor_by(&mut self, rows: i64, cols: i64) {
        let shift = |pos: usize, delta: i64| -> usize {
            let pos = i64::try_from(pos).unwrap_or(i64::MAX);
            match pos.checked_add(delta) {
                Some(target) if target >= 0 => usize::try_from(target).unwrap_or(usize::MAX),
                Some(_) => usize::try_from(pos).unwrap_or(0),
                None => usize::MAX,
            }
        };
        let row = shift(self.cursor.row, rows);
        let col = shift(self.cursor.col, cols);
        self.move_cursor(row, col);
    }

    pub fn save_cursor(&mut self) {
        self.cursor.saved = (self.cursor.row, self.cursor.col);
    }

    pub fn restore_cursor(&mut self) {
        let (row, col) = self.cursor.saved;
        self.move_cursor(row, col);
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.restore_cursor_content();
        self.cursor.flags.set(CursorFlags::VISIBLE, visible);
        self.render_cursor();
    }

    /// Turning blink off leaves a steady visible cursor.
    pub fn set_cursor_blinking(&mut self, blink: bool) {
        self.cursor.flags.set(CursorFlags::BLINK, blink);
        if !blink {
            self.set_cursor_visible(true);
        }
    }

    /// One blink period elapsed. Returns true when the screen changed.
    pub fn blink_tick(&mut self) -> bool {
        if !self.cursor_blinking() {
            return false;
        }
        let visible = self.cursor_visible();
        self.set_cursor_visible(!visible);
        true
    }

    // ---- control characters ----

    pub fn carriage_return(&mut self) {
        self.restore_cursor_content();
        self.cursor.col = 0;
        self.render_cursor();
    }

    /// Next row, column 0. Scrolling is left to [`wrap_and_scroll`](Self::wrap_and_scroll).
    pub fn line_feed(&mut self) {
        self.restore_cursor_content();
        self.cursor.row += 1;
        self.cursor.col = 0;
        self.render_cursor();
    }

    /// Advance to the next tab stop. The column is bumped once before the
    /// stop is computed, so a tab from a stop skips to the one after next
    /// only when the bump lands on a stop.
    pub fn tab(&mut self) {
        self.restore_cursor_content();
        let last = self.cols - 1;
        let mut col = self.cursor.col + 1;
        if self.tab_stop > 0 {
            col += self.tab_stop - col % self.tab_stop;
        }
        self.cursor.col = col.min(last);
        self.render_cursor();
    }

    pub fn backspace(&mut self) {
        if self.cursor.col == 0 {
            return;
        }
        self.restore_cursor_content();
        self.cursor.col -= 1;
        self.clear_cell(self.cursor.row, self.cursor.col);
        self.render_cursor();
    }

    pub fn form_feed(&mut self) {
        self.restore_cursor_content();
        self.cursor.row = 0;
        self.cursor.col = 0;
        self.clear_screen();
    }

    /// Wrap a cursor that ran past the last column and scroll one text line
    /// when it ran past the last row.
    pub fn wrap_and_scroll(&mut self) {
        if self.cursor.col >= self.cols {
            self.restore_cursor_content();
            self.cursor.row += 1;
            self.cursor.col = 0;
            self.render_cursor();
        }
        if self.cursor.row >= self.rows {
            self.restore_cursor_content();
            self.cursor.row = self.rows - 1;
            self.scroll_down(self.font_height);
        }
    }

    // ---- erase ----

    /// From the cursor to the end of its line.
    pub fn clear_till_end(&mut self) {
        self.restore_cursor_content();
        let (x, y) = self.cell_origin(self.cursor.row, self.cursor.col);
        let width = self.surface.width().saturating_sub(x);
        self.surface.fill_rect(x, y, width, self.font_height, self.colors.bg);
        self.render_cursor();
    }

    /// From the start of the line through the cursor cell.
    pub fn clear_till_cursor(&mut self) {
        self.restore_cursor_content();
        let (x, y) = self.cell_origin(self.cursor.row, self.cursor.col + 1);
        self.surface.fill_rect(0, y, x, self.font_height, self.colors.bg);
        self.render_cursor();
    }

    pub fn clear_line(&mut self) {
        self.restore_cursor_content();
        let (_, y) = self.cell_origin(self.cursor.row, 0);
        let width = self.surface.width();
        self.surface.fill_rect(0, y, width, self.font_height, self.colors.bg);
        self.render_cursor();
    }

    pub fn clear_screen(&mut self) {
        self.restore_cursor_content();
        self.surface.fill(self.colors.bg);
        self.render_cursor();
    }

    /// From the cursor to the end of the screen.
    pub fn clear_screen_from_cursor(&mut self) {
        if self.cursor.row + 1 < self.rows {
            self.restore_cursor_content();
            let (_, y) = self.cell_origin(self.cursor.row + 1, 0);
            let (width, height) = self.pixel_size();
            self.surface.fill_rect(0, y, width, height.saturating_sub(y), self.colors.bg);
        }
        self.clear_till_end();
    }

    /// From the start of the screen through the cursor cell.
    pub fn clear_screen_to_cursor(&mut self) {
        if self.cursor.row > 0 {
            self.restore_cursor_content();
            let (_, y) = self.cell_origin(self.cursor.row, 0);
            let width = self.surface.width();
            self.surface.fill_rect(0, 0, width, y, self.colors.bg);
        }
        self.clear_till_cursor();
    }

    // ---- snapshots ----

    /// Bytes needed by [`save_screen`](Self::save_screen).
    pub fn screen_buffer_size(&self) -> usize {
        self.surface.size()
    }

    /// Copy the screen, without the cursor overlay, into `out`.
    pub fn save_screen(&mut self, out: &mut [u8]) -> Result<()> {
        self.restore_cursor_content();
        let saved = self.surface.save_to(out);
        self.render_cursor();
        saved
    }

    pub fn restore_screen(&mut self, data: &[u8]) -> Result<()> {
        self.restore_cursor_content();
        let restored = self.surface.restore_from(data);
        self.render_cursor();
        restored
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::surface::CopyPath;

    /// 80x25 cells of 8x16 on a 640x400 surface, fg 7 on bg 0.
    pub(crate) fn make_state() -> TerminalState {
        let surface = PixelSurface::new(640, 400, 640, CopyPath::Rows).unwrap();
        let mut state = TerminalState::new(surface, font::builtin(1).unwrap(), 7, 0).unwrap();
        state.clear_screen();
        state
    }

    #[test]
    fn test_grid_from_font() {
        let mut state = make_state();
        assert_eq!(state.term_size(), (25, 80));
        assert_eq!(state.pixel_size(), (640, 400));

        state.move_cursor(24, 79);
        state.select_builtin_font(2).unwrap();
        assert_eq!(state.term_size(), (16, 80));
        assert_eq!(state.cursor_position(), (15, 79));

        let surface = PixelSurface::new(8, 8, 8, CopyPath::Rows).unwrap();
        let result = TerminalState::new(surface, font::builtin(1).unwrap(), 7, 0);
        assert!(matches!(result, Err(GfxError::FontTooLarge { .. })));
    }

    #[test]
    fn test_font_too_large_keeps_font() {
        let surface = PixelSurface::new(16, 16, 16, CopyPath::Rows).unwrap();
        let mut state = TerminalState::new(surface, font::builtin(1).unwrap(), 7, 0).unwrap();
        assert!(state.select_builtin_font(2).is_err());
        assert_eq!(state.font().height(), 16);
        assert_eq!(state.term_size(), (1, 2));
    }

    #[test]
    fn test_move_cursor_clamps() {
        let mut state = make_state();
        state.move_cursor(100, 200);
        assert_eq!(state.cursor_position(), (24, 79));

        state.move_cursor(5, 5);
        state.move_cursor_by(-10, 3);
        assert_eq!(state.cursor_position(), (5, 8));
        state.move_cursor_by(2, -9);
        assert_eq!(state.cursor_position(), (7, 8));
        state.move_cursor_by(i64::MAX, 0);
        assert_eq!(state.cursor_position(), (24, 8));
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut state = make_state();
        state.move_cursor(3, 4);
        state.save_cursor();
        state.move_cursor(10, 10);
        state.restore_cursor();
        assert_eq!(state.cursor_position(), (3, 4));
    }

    #[test]
    fn test_reverse_round_trip() {
        let mut state = make_state();
        state.set_fg(3);
        state.set_bg(5);
        state.enter_reverse();
        state.enter_reverse();
        assert_eq!((state.fg(), state.bg()), (5, 3));
        state.leave_reverse();
        state.leave_reverse();
        assert_eq!((state.fg(), state.bg()), (3, 5));
    }

    #[test]
    fn test_brighten_darken() {
        let mut state = make_state();
        state.set_fg(2);
        state.brighten();
        state.brighten();
        assert_eq!(state.fg(), 10);
        state.darken();
        state.darken();
        assert_eq!(state.fg(), 2);
    }

    #[test]
    fn test_tab_skips_after_bump() {
        let mut state = make_state();
        state.tab();
        assert_eq!(state.cursor_position().1, 8);
        state.move_cursor(0, 7);
        state.tab();
        assert_eq!(state.cursor_position().1, 16);
        state.move_cursor(0, 78);
        state.tab();
        assert_eq!(state.cursor_position().1, 79);

        state.set_tab_stop(0);
        state.move_cursor(0, 3);
        state.tab();
        assert_eq!(state.cursor_position().1, 4);

        state.set_tab_stop(500);
        assert_eq!(state.tab_stop(), 80);
    }

    #[test]
    fn test_backspace_clears_cell() {
        let mut state = make_state();
        state.put_glyph(u32::from(b'#'));
        state.backspace();
        assert_eq!(state.cursor_position(), (0, 0));
        state.set_cursor_visible(false);
        assert!((0..16).all(|y| state.surface().row(y)[..8].iter().all(|&p| p == 0)));

        state.backspace();
        assert_eq!(state.cursor_position(), (0, 0));
    }

    #[test]
    fn test_erase_line_parts() {
        let mut state = make_state();
        state.set_cursor_visible(false);
        state.surface.fill(9);
        state.move_cursor(1, 10);

        state.clear_till_end();
        assert_eq!(state.surface().pixel(79, 16), Some(9));
        assert_eq!(state.surface().pixel(80, 16), Some(0));
        assert_eq!(state.surface().pixel(639, 31), Some(0));
        assert_eq!(state.surface().pixel(80, 32), Some(9));

        state.surface.fill(9);
        state.clear_till_cursor();
        assert_eq!(state.surface().pixel(0, 16), Some(0));
        assert_eq!(state.surface().pixel(87, 16), Some(0));
        assert_eq!(state.surface().pixel(88, 16), Some(9));
    }

    #[test]
    fn test_erase_screen_parts() {
        let mut state = make_state();
        state.set_cursor_visible(false);
        state.surface.fill(9);
        state.move_cursor(2, 4);

        state.clear_screen_from_cursor();
        assert_eq!(state.surface().pixel(31, 32), Some(9));
        assert_eq!(state.surface().pixel(32, 32), Some(0));
        assert_eq!(state.surface().pixel(0, 48), Some(0));
        assert_eq!(state.surface().pixel(0, 399), Some(0));

        state.surface.fill(9);
        state.clear_screen_to_cursor();
        assert_eq!(state.surface().pixel(639, 0), Some(0));
        assert_eq!(state.surface().pixel(39, 47), Some(0));
        assert_eq!(state.surface().pixel(40, 32), Some(9));
    }

    #[test]
    fn test_blink_tick() {
        let mut state = make_state();
        assert!(!state.blink_tick());
        state.set_cursor_blinking(true);
        assert!(state.blink_tick());
        assert!(!state.cursor_visible());
        assert!(state.blink_tick());
        assert!(state.cursor_visible());

        state.set_cursor_blinking(false);
        assert!(state.cursor_visible());
        assert!(!state.cursor_blinking());
    }

    #[test]
    fn test_screen_snapshot_excludes_overlay() {
        let mut state = make_state();
        let mut saved = vec![0xAA; state.screen_buffer_size()];
        state.save_screen(&mut saved).unwrap();
        assert!(saved.iter().all(|&p| p == 0));
        // Overlay is still shown
        assert_eq!(state.surface().pixel(0, 0), Some(7));

        state.surface.fill(4);
        state.restore_screen(&saved).unwrap();
        assert_eq!(state.surface().pixel(100, 100), Some(0));
        assert_eq!(state.surface().pixel(0, 0), Some(7));
        assert!(state.restore_screen(&saved[1..]).is_err());
    }
}
