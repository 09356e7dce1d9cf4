//! Scrolling and cell/line insertion
//!
//! Pixel scrolls are named after the view: `scroll_up` reveals content above,
//! so the picture moves down and the top band is cleared; `scroll_down`
//! moves the picture up and clears the bottom band. The same holds for the
//! horizontal pair. Freed areas are filled with the current background.

use super::state::TerminalState;
use crate::core::surface::{HorizontalShift, VerticalShift};

impl TerminalState {
    /// Move the picture down by `pixels`, clearing the top band.
    pub fn scroll_up(&mut self, pixels: usize) {
        self.restore_cursor_content();
        let (width, height) = self.pixel_size();
        let band = pixels.min(height);
        self.surface.scroll_vertical(pixels, VerticalShift::Down);
        self.surface.fill_rect(0, 0, width, band, self.colors.bg);
        self.render_cursor();
    }

    /// Move the picture up by `pixels`, clearing the bottom band.
    pub fn scroll_down(&mut self, pixels: usize) {
        self.restore_cursor_content();
        let (width, height) = self.pixel_size();
        let band = pixels.min(height);
        self.surface.scroll_vertical(pixels, VerticalShift::Up);
        self.surface
            .fill_rect(0, height - band, width, band, self.colors.bg);
        self.render_cursor();
    }

    /// Move the picture left by `pixels`, clearing the right band. Shifts of
    /// the full width or more do nothing.
    pub fn scroll_right(&mut self, pixels: usize) {
        let (width, height) = self.pixel_size();
        if pixels == 0 || pixels >= width {
            return;
        }
        self.restore_cursor_content();
        self.surface.scroll_horizontal(pixels, HorizontalShift::Left);
        self.surface
            .fill_rect(width - pixels, 0, pixels, height, self.colors.bg);
        self.render_cursor();
    }

    /// Move the picture right by `pixels`, clearing the left band.
    pub fn scroll_left(&mut self, pixels: usize) {
        let (width, height) = self.pixel_size();
        if pixels == 0 || pixels >= width {
            return;
        }
        self.restore_cursor_content();
        self.surface.scroll_horizontal(pixels, HorizontalShift::Right);
        self.surface.fill_rect(0, 0, pixels, height, self.colors.bg);
        self.render_cursor();
    }

    /// Open a blank cell at the cursor, pushing the rest of the row right.
    /// The last cell of the row falls off.
    pub fn insert_blank(&mut self) {
        self.restore_cursor_content();
        let (row, col) = self.cursor_position();
        if col + 1 < self.cols {
            let (x, y) = self.cell_origin(row, col);
            let span = (self.cols - col - 1) * self.font_width;
            self.surface
                .copy_rect(x, y, x + self.font_width, y, span, self.font_height);
        }
        self.clear_cell(row, col);
        self.render_cursor();
    }

    /// Remove the cell at the cursor, pulling the rest of the row left.
    pub fn delete_char(&mut self) {
        self.restore_cursor_content();
        let (row, col) = self.cursor_position();
        if col + 1 < self.cols {
            let (x, y) = self.cell_origin(row, col);
            let span = (self.cols - col - 1) * self.font_width;
            self.surface
                .copy_rect(x + self.font_width, y, x, y, span, self.font_height);
        }
        self.clear_cell(row, self.cols - 1);
        self.render_cursor();
    }

    /// Open a blank line at the cursor row, pushing the rows below down.
    pub fn insert_line(&mut self) {
        self.restore_cursor_content();
        let row = self.cursor.row;
        let width = self.surface.width();
        let (_, y) = self.cell_origin(row, 0);
        if row + 1 < self.rows {
            let lines = (self.rows - row - 1) * self.font_height;
            self.surface.copy_rect(0, y, 0, y + self.font_height, width, lines);
        }
        self.surface.fill_rect(0, y, width, self.font_height, self.colors.bg);
        self.render_cursor();
    }

    /// Remove the cursor row, pulling the rows below up.
    pub fn delete_line(&mut self) {
        self.restore_cursor_content();
        let row = self.cursor.row;
        let width = self.surface.width();
        if row + 1 < self.rows {
            let (_, y) = self.cell_origin(row, 0);
            let lines = (self.rows - row - 1) * self.font_height;
            self.surface.copy_rect(0, y + self.font_height, 0, y, width, lines);
        }
        let (_, last) = self.cell_origin(self.rows - 1, 0);
        self.surface
            .fill_rect(0, last, width, self.font_height, self.colors.bg);
        self.render_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::tests::make_state;

    #[test]
    fn test_scroll_content_law() {
        let mut state = make_state();
        state.set_cursor_visible(false);
        for y in 0..400 {
            state.surface.fill_rect(0, y, 640, 1, (y % 200) as u8 + 1);
        }
        let original = state.surface().as_bytes().to_vec();

        state.scroll_up(16);
        assert!(state.surface().row(0).iter().all(|&p| p == 0));
        assert_eq!(state.surface().row(16), &original[0..640]);

        state.scroll_down(16);
        let now = state.surface().as_bytes();
        assert_eq!(&now[..384 * 640], &original[..384 * 640]);
        assert!(now[384 * 640..].iter().all(|&p| p == 0));
    }

    #[test]
    fn test_scroll_whole_screen_clears() {
        let mut state = make_state();
        state.set_cursor_visible(false);
        state.surface.fill(6);
        state.scroll_down(400);
        assert!(state.surface().as_bytes().iter().all(|&p| p == 0));

        state.surface.fill(6);
        state.scroll_up(1000);
        assert!(state.surface().as_bytes().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_scroll_horizontal() {
        let mut state = make_state();
        state.set_cursor_visible(false);
        state.surface.fill_rect(100, 0, 1, 400, 9);

        state.scroll_right(10);
        assert_eq!(state.surface().pixel(90, 5), Some(9));
        assert_eq!(state.surface().pixel(635, 5), Some(0));

        state.scroll_left(20);
        assert_eq!(state.surface().pixel(110, 5), Some(9));

        state.scroll_left(640);
        assert_eq!(state.surface().pixel(110, 5), Some(9));
    }

    #[test]
    fn test_insert_and_delete_char() {
        let mut state = make_state();
        for &b in b"abc" {
            state.put_glyph(u32::from(b));
        }
        state.set_cursor_visible(false);
        let glyph_b = state.surface().row(6)[8..16].to_vec();
        let glyph_c = state.surface().row(6)[16..24].to_vec();

        state.move_cursor(0, 1);
        state.insert_blank();
        assert!(state.surface().row(6)[8..16].iter().all(|&p| p == 0));
        assert_eq!(&state.surface().row(6)[16..24], &glyph_b[..]);
        assert_eq!(&state.surface().row(6)[24..32], &glyph_c[..]);

        state.delete_char();
        assert_eq!(&state.surface().row(6)[8..16], &glyph_b[..]);
        assert_eq!(&state.surface().row(6)[16..24], &glyph_c[..]);
        assert!(state.surface().row(6)[632..].iter().all(|&p| p == 0));
    }

    #[test]
    fn test_insert_and_delete_line() {
        let mut state = make_state();
        state.set_cursor_visible(false);
        state.surface.fill_rect(0, 16, 640, 16, 3);
        state.surface.fill_rect(0, 384, 640, 16, 4);

        state.move_cursor(1, 0);
        state.insert_line();
        assert_eq!(state.surface().pixel(0, 16), Some(0));
        assert_eq!(state.surface().pixel(0, 32), Some(3));

        state.delete_line();
        assert_eq!(state.surface().pixel(0, 16), Some(3));
        assert_eq!(state.surface().pixel(0, 384), Some(0));

        // Deleting the last row just clears it
        state.surface.fill_rect(0, 384, 640, 16, 4);
        state.move_cursor(24, 0);
        state.delete_line();
        assert_eq!(state.surface().pixel(0, 384), Some(0));
        assert_eq!(state.surface().pixel(0, 368), Some(0));
    }
}
