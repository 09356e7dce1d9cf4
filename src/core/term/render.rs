//! Glyph rendering and the cursor overlay
//!
//! The cursor is drawn in place: the true pixels of its cell are saved, then
//! every pixel equal to the foreground becomes background and vice versa.
//! Any operation that touches the cursor cell or moves the cursor restores
//! the saved pixels first and renders again afterwards, so at most one cell
//! is ever shown inverted.

use super::state::{CursorFlags, TerminalState};

impl TerminalState {
    /// Draw `code` at the cursor and advance one column. The column may end
    /// up one past the grid; the caller wraps.
    pub fn put_glyph(&mut self, code: u32) {
        self.restore_cursor_content();
        self.draw_glyph(self.cursor.row, self.cursor.col, code);
        self.cursor.col += 1;
        self.render_cursor();
    }

    /// Paint one cell with the current colors. Codes missing from the font
    /// render as a blank cell.
    pub fn draw_glyph(&mut self, row: usize, col: usize, code: u32) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let (fg, bg) = (self.colors.fg, self.colors.bg);
        match self.font.glyph(code) {
            Some(bits) => {
                for (out, &bit) in self.glyph_buffer.iter_mut().zip(bits) {
                    *out = if bit != 0 { fg } else { bg };
                }
            }
            None => self.glyph_buffer.fill(bg),
        }
        let (x, y) = self.cell_origin(row, col);
        self.surface
            .write_rect(x, y, self.font_width, self.font_height, &self.glyph_buffer);
    }

    /// Fill one cell with the background color.
    pub fn clear_cell(&mut self, row: usize, col: usize) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let (x, y) = self.cell_origin(row, col);
        self.surface
            .fill_rect(x, y, self.font_width, self.font_height, self.colors.bg);
    }

    /// Show the cursor at its current cell, or drop it when hidden.
    pub fn render_cursor(&mut self) {
        self.restore_cursor_content();
        if !self.cursor_visible() {
            return;
        }
        let (row, col) = self.cursor_position();
        if row >= self.rows || col >= self.cols {
            return;
        }

        let (x, y) = self.cell_origin(row, col);
        let (w, h) = (self.font_width, self.font_height);
        self.surface.read_rect(x, y, w, h, &mut self.cursor_buffer);

        let (fg, bg) = (self.colors.fg, self.colors.bg);
        self.surface.map_rect(x, y, w, h, |pixel| {
            if pixel == fg {
                bg
            } else if pixel == bg {
                fg
            } else {
                pixel
            }
        });
        self.cursor.flags.insert(CursorFlags::BUFFER_READY);
    }

    /// Put the true pixels back under the cursor.
    pub fn restore_cursor_content(&mut self) {
        if !self.cursor.flags.contains(CursorFlags::BUFFER_READY) {
            return;
        }
        let (x, y) = self.cell_origin(self.cursor.row, self.cursor.col);
        self.surface
            .write_rect(x, y, self.font_width, self.font_height, &self.cursor_buffer);
        self.cursor.flags.remove(CursorFlags::BUFFER_READY);
    }
}
