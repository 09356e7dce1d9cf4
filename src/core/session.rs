//! Terminal driver
//!
//! Entry point for bytes headed to the screen. Handles the raw control
//! characters itself, forwards everything else to the escape parser and
//! keeps the cursor on the grid after every byte.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::devices::{Beeper, DisplayDriver, MemoryDisplay, SoftBeeper};
use super::error::Result;
use super::font::{self, Font, DEFAULT_FONT_INDEX};
use super::surface::{CopyPath, PixelSurface};
use super::term::state::DEFAULT_TAB_STOP;
use super::term::{DisplayMode, Flow, TerminalState, VtParser};

const BEL: u8 = 0x07;
const BS: u8 = 0x08;
const TAB: u8 = 0x09;
const LF: u8 = 0x0A;
const FF: u8 = 0x0C;
const CR: u8 = 0x0D;
const DEL: u8 = 0x7F;

/// Settings applied when the terminal starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    pub width: usize,
    pub height: usize,
    pub font_index: usize,
    pub default_fg: u8,
    pub default_bg: u8,
    pub tab_width: usize,
    pub copy_path: CopyPath,
    pub cursor_blink: bool,
    /// Bell duty cycle in percent
    pub sound_level: u8,
    /// Bell length, 0 sounds until the next BEL
    pub bell_duration_ms: u32,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            font_index: DEFAULT_FONT_INDEX,
            default_fg: 11,
            default_bg: 0,
            tab_width: DEFAULT_TAB_STOP,
            copy_path: CopyPath::Rows,
            cursor_blink: false,
            sound_level: 50,
            bell_duration_ms: 250,
        }
    }
}

/// A terminal bound to one display and one speaker
pub struct Terminal {
    state: TerminalState,
    parser: VtParser,
    display: Box<dyn DisplayDriver>,
    beeper: Box<dyn Beeper>,
    options: TerminalOptions,
    /// Screen changed since the last [`take_dirty`](Self::take_dirty)
    dirty: bool,
}

impl Terminal {
    pub fn new(options: TerminalOptions, mut display: Box<dyn DisplayDriver>, beeper: Box<dyn Beeper>) -> Result<Self> {
        let font = font::builtin(options.font_index)?;
        let mode = DisplayMode::new(options.width, options.height);
        let state = init_display(
            display.as_mut(),
            mode,
            font,
            (options.default_fg, options.default_bg),
            &options,
        )?;
        tracing::info!(
            "Terminal {}x{} px, {}x{} cells",
            options.width,
            options.height,
            state.cols(),
            state.rows()
        );

        Ok(Self {
            state,
            parser: VtParser::new(),
            display,
            beeper,
            options,
            dirty: true,
        })
    }

    /// Terminal drawing into host memory with a silent bell.
    pub fn in_memory(options: TerminalOptions) -> Result<Self> {
        Self::new(options, Box::new(MemoryDisplay::new()), Box::new(SoftBeeper::new()))
    }

    /// Feed raw bytes into the terminal
    pub fn put_string(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.put_char(byte);
        }
    }

    pub fn put_char(&mut self, byte: u8) {
        self.dirty = true;
        let flow = match byte {
            CR => {
                self.state.carriage_return();
                Flow::CheckScroll
            }
            LF => {
                self.state.line_feed();
                Flow::CheckScroll
            }
            TAB => {
                self.state.tab();
                Flow::CheckScroll
            }
            BEL => {
                self.bell();
                Flow::CheckScroll
            }
            BS | DEL => {
                self.state.backspace();
                Flow::CheckScroll
            }
            FF => {
                self.state.form_feed();
                Flow::CheckScroll
            }
            _ => self.parser.feed(byte, &mut self.state),
        };

        match flow {
            Flow::CheckScroll => self.state.wrap_and_scroll(),
            Flow::SkipScroll => {}
            Flow::ModeChange(mode) => {
                self.change_mode(mode);
                self.state.wrap_and_scroll();
            }
        }
    }

    /// BEL starts a tone, or silences one still sounding.
    fn bell(&mut self) {
        if self.beeper.is_active() {
            self.beeper.stop();
        } else {
            self.beeper
                .start(self.options.sound_level, self.options.bell_duration_ms);
        }
    }

    /// Reinitialize for another display mode, keeping the font and default
    /// colors. A mode the display refuses leaves the terminal untouched.
    pub fn change_mode(&mut self, mode: DisplayMode) {
        let font = self.state.font().clone();
        let colors = self.state.colors();
        let blink = self.state.cursor_blinking();
        match init_display(
            self.display.as_mut(),
            mode,
            font,
            (colors.default_fg, colors.default_bg),
            &self.options,
        ) {
            Ok(mut state) => {
                state.set_cursor_blinking(blink);
                self.state = state;
                self.parser.reset();
                self.dirty = true;
                tracing::info!("Display mode {}x{}x{}", mode.width, mode.height, mode.bpp);
            }
            Err(e) => {
                tracing::warn!("Display mode {}x{} rejected: {}", mode.width, mode.height, e);
            }
        }
    }

    /// Returns whether the screen changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    pub fn parser(&self) -> &VtParser {
        &self.parser
    }

    pub fn surface(&self) -> &PixelSurface {
        self.state.surface()
    }

    pub fn beeper(&self) -> &dyn Beeper {
        self.beeper.as_ref()
    }

    pub fn options(&self) -> &TerminalOptions {
        &self.options
    }

    // ---- kernel-facing API ----

    pub fn set_font(&mut self, font: Font) -> Result<()> {
        self.dirty = true;
        self.state.set_font(font)
    }

    pub fn select_font(&mut self, index: usize) -> Result<()> {
        self.dirty = true;
        self.state.select_builtin_font(index)
    }

    pub fn fg(&self) -> u8 {
        self.state.fg()
    }

    pub fn bg(&self) -> u8 {
        self.state.bg()
    }

    pub fn set_fg(&mut self, color: u8) {
        self.state.set_fg(color);
    }

    pub fn set_bg(&mut self, color: u8) {
        self.state.set_bg(color);
    }

    /// Colors restored by `ESC [ 0 m`.
    pub fn set_default_colors(&mut self, fg: u8, bg: u8) {
        self.state.set_default_fg(fg);
        self.state.set_default_bg(bg);
    }

    pub fn swap_fg_bg(&mut self) {
        self.state.swap_fg_bg();
    }

    pub fn set_tab_stop(&mut self, width: usize) {
        self.state.set_tab_stop(width);
    }

    /// Character grid as (rows, cols).
    pub fn term_size(&self) -> (usize, usize) {
        self.state.term_size()
    }

    /// Display size in pixels as (width, height).
    pub fn pixel_size(&self) -> (usize, usize) {
        self.state.pixel_size()
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.dirty = true;
        self.state.set_cursor_visible(visible);
    }

    pub fn cursor_position(&self) -> (usize, usize) {
        self.state.cursor_position()
    }

    pub fn move_cursor(&mut self, row: usize, col: usize) {
        self.dirty = true;
        self.state.move_cursor(row, col);
    }

    pub fn save_cursor(&mut self) {
        self.state.save_cursor();
    }

    pub fn restore_cursor(&mut self) {
        self.dirty = true;
        self.state.restore_cursor();
    }

    pub fn set_cursor_blinking(&mut self, blink: bool) {
        self.dirty = true;
        self.state.set_cursor_blinking(blink);
    }

    /// Called once per blink period.
    pub fn blink_tick(&mut self) {
        if self.state.blink_tick() {
            self.dirty = true;
        }
    }

    pub fn screen_buffer_size(&self) -> usize {
        self.state.screen_buffer_size()
    }

    pub fn save_screen_buffer(&mut self, out: &mut [u8]) -> Result<()> {
        self.state.save_screen(out)
    }

    pub fn restore_screen_buffer(&mut self, data: &[u8]) -> Result<()> {
        self.dirty = true;
        self.state.restore_screen(data)
    }
}

fn init_display(
    display: &mut dyn DisplayDriver,
    mode: DisplayMode,
    font: Font,
    (default_fg, default_bg): (u8, u8),
    options: &TerminalOptions,
) -> Result<TerminalState> {
    let framebuffer = display.set_mode(mode.width, mode.height, mode.bpp)?;
    let surface = PixelSurface::from_framebuffer(framebuffer, options.copy_path)?;
    let mut state = TerminalState::new(surface, font, default_fg, default_bg)?;
    state.set_tab_stop(options.tab_width);
    state.clear_screen();
    if options.cursor_blink {
        state.set_cursor_blinking(true);
    }
    Ok(state)
}

/// Terminal shared between the byte path and the blink timer
#[derive(Clone)]
pub struct SharedTerminal(Arc<Mutex<Terminal>>);

impl SharedTerminal {
    pub fn new(terminal: Terminal) -> Self {
        Self(Arc::new(Mutex::new(terminal)))
    }

    /// Exclusive access; every byte and every blink tick runs under this lock.
    pub fn lock(&self) -> MutexGuard<'_, Terminal> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_string(&self, bytes: &[u8]) {
        self.lock().put_string(bytes);
    }
}

/// Background thread toggling the cursor every period
pub struct CursorBlinker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CursorBlinker {
    pub fn start(terminal: SharedTerminal, period: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = thread::spawn(move || {
            let step = period.min(Duration::from_millis(20)).max(Duration::from_millis(1));
            let mut elapsed = Duration::ZERO;
            while flag.load(Ordering::SeqCst) {
                thread::sleep(step);
                elapsed += step;
                if elapsed >= period {
                    elapsed = Duration::ZERO;
                    terminal.lock().blink_tick();
                }
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CursorBlinker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_terminal() -> Terminal {
        let options = TerminalOptions {
            width: 640,
            height: 400,
            default_fg: 7,
            bell_duration_ms: 0,
            ..TerminalOptions::default()
        };
        Terminal::in_memory(options).unwrap()
    }

    fn cell_has_ink(term: &Terminal, row: usize, col: usize, color: u8) -> bool {
        let (x, y) = term.state().cell_origin(row, col);
        (y..y + 16).any(|py| term.surface().row(py)[x..x + 8].contains(&color))
    }

    #[test]
    fn test_clear_move_and_print() {
        let mut term = make_terminal();
        assert_eq!(term.term_size(), (25, 80));

        term.put_string(b"garbage");
        term.put_string(b"\x1b[2J\x1b[10;20HX");
        assert_eq!(term.cursor_position(), (9, 20));
        assert!(cell_has_ink(&term, 9, 19, 7));

        term.set_cursor_visible(false);
        assert!(!cell_has_ink(&term, 0, 0, 7));
    }

    #[test]
    fn test_wrap_after_full_row() {
        let mut term = make_terminal();
        term.put_string(&[b'x'; 80]);
        assert_eq!(term.cursor_position(), (1, 0));

        term.move_cursor(24, 0);
        term.put_string(&[b'y'; 80]);
        assert_eq!(term.cursor_position(), (24, 0));
        assert!(cell_has_ink(&term, 23, 79, 7));
    }

    #[test]
    fn test_line_feed_scrolls_at_bottom() {
        let mut term = make_terminal();
        term.put_string(b"top\r\n");
        for _ in 0..24 {
            term.put_char(b'\n');
        }
        assert_eq!(term.cursor_position(), (24, 0));
        assert!(!cell_has_ink(&term, 0, 0, 7));

        term.put_string(b"\x1b[1;1Habc\r");
        assert_eq!(term.cursor_position(), (0, 0));
    }

    #[test]
    fn test_bell_toggles() {
        let mut term = make_terminal();
        for count in 1..=4 {
            term.put_char(BEL);
            assert_eq!(term.beeper().is_active(), count % 2 == 1);
        }
        assert_eq!(term.cursor_position(), (0, 0));
    }

    #[test]
    fn test_tab_backspace_and_form_feed() {
        let mut term = make_terminal();
        term.put_string(b"\t");
        assert_eq!(term.cursor_position(), (0, 8));
        term.put_string(b"ab\x08\x7f");
        assert_eq!(term.cursor_position(), (0, 8));
        assert!(!cell_has_ink(&term, 0, 9, 7));

        term.put_string(b"\x1b[=4t\r\t\t");
        assert_eq!(term.cursor_position(), (0, 8));

        term.put_string(b"\x1b[5;5Hz\x0c");
        assert_eq!(term.cursor_position(), (0, 0));
        term.set_cursor_visible(false);
        assert!(term.surface().as_bytes().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_mode_change_resets_context() {
        let mut term = make_terminal();
        term.put_string(b"\x1b[38;6;2m\x1b[31m\x1b[10;10Hq\x1b[");
        term.put_string(b"=13h");

        assert_eq!(term.pixel_size(), (320, 200));
        assert_eq!(term.term_size(), (12, 40));
        assert_eq!(term.cursor_position(), (0, 0));
        assert_eq!(term.fg(), 2);
        assert_eq!(term.state().tab_stop(), 8);

        // Modes without a framebuffer are ignored
        term.put_string(b"\x1b[=8h");
        assert_eq!(term.pixel_size(), (320, 200));
    }

    #[test]
    fn test_rejected_mode_keeps_terminal() {
        let options = TerminalOptions {
            width: 320,
            height: 200,
            ..TerminalOptions::default()
        };
        let display = MemoryDisplay::new().with_max_size(320, 200);
        let mut term = Terminal::new(options, Box::new(display), Box::new(SoftBeeper::new())).unwrap();
        term.put_string(b"ok\x1b[=18h");
        assert_eq!(term.pixel_size(), (320, 200));
        assert_eq!(term.cursor_position(), (0, 2));
    }

    #[test]
    fn test_scroll_command_leaves_cursor() {
        let mut term = make_terminal();
        term.put_string(b"\x1b[25;80H");
        term.put_string(b"\x1b[#16_");
        assert_eq!(term.cursor_position(), (24, 79));
    }

    #[test]
    fn test_screen_buffer_round_trip() {
        let mut term = make_terminal();
        term.put_string(b"hello");
        let mut saved = vec![0; term.screen_buffer_size()];
        term.save_screen_buffer(&mut saved).unwrap();

        term.put_string(b"\x0c");
        term.move_cursor(0, 5);
        term.restore_screen_buffer(&saved).unwrap();
        assert!(cell_has_ink(&term, 0, 0, 7));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut term = make_terminal();
        assert!(term.take_dirty());
        assert!(!term.take_dirty());
        term.blink_tick();
        assert!(!term.take_dirty());
        term.set_cursor_blinking(true);
        term.take_dirty();
        term.blink_tick();
        assert!(term.take_dirty());
    }

    #[test]
    fn test_cursor_blinker_thread() {
        let mut term = make_terminal();
        term.set_cursor_blinking(true);
        let shared = SharedTerminal::new(term);
        let mut blinker = CursorBlinker::start(shared.clone(), Duration::from_millis(5));
        assert!(blinker.is_running());
        thread::sleep(Duration::from_millis(60));
        blinker.stop();
        assert!(!blinker.is_running());

        shared.put_string(b"\x1b[?25h");
        assert!(shared.lock().state().cursor_visible());
    }

    #[test]
    fn test_blink_sequence_drives_running_blinker() {
        let shared = SharedTerminal::new(make_terminal());
        let mut blinker = CursorBlinker::start(shared.clone(), Duration::from_millis(2));

        // Not blinking yet: ticks leave the cursor alone
        thread::sleep(Duration::from_millis(30));
        assert!(shared.lock().state().cursor_visible());

        shared.put_string(b"\x1b[?25b");
        let (mut seen_on, mut seen_off) = (false, false);
        for _ in 0..1000 {
            if shared.lock().state().cursor_visible() {
                seen_on = true;
            } else {
                seen_off = true;
            }
            if seen_on && seen_off {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        blinker.stop();
        assert!(seen_on && seen_off);
    }
    #[test]
    fn test_wrap_keeps_cursor_on_grid_for_every_font() {
        let mut stream = Vec::new();
        for i in 0..40u8 {
            stream.extend_from_slice(b"\x1b[3");
            stream.push(b'0' + i % 8);
            stream.extend_from_slice(b"mline\tof\ttext ");
            stream.extend(std::iter::repeat(b'a' + i % 26).take(usize::from(i) * 3));
            stream.extend_from_slice(b"\r\n");
        }
        stream.extend_from_slice(b"\x1b[99;99H\x1b[5Bend\x1b[1L\x1b[1P");

        for font_index in 0..font::BUILTIN_FONT_COUNT {
            for (width, height) in [(640, 350), (320, 200), (800, 600)] {
                let mut screens = Vec::new();
                for copy_path in [CopyPath::Rows, CopyPath::Bulk] {
                    let options = TerminalOptions {
                        width,
                        height,
                        font_index,
                        copy_path,
                        ..TerminalOptions::default()
                    };
                    let mut term = Terminal::in_memory(options).unwrap();
                    let (rows, cols) = term.term_size();
                    for &byte in &stream {
                        term.put_char(byte);
                        let (row, col) = term.cursor_position();
                        assert!(
                            row < rows && col < cols,
                            "{}x{} font {}: ({}, {})",
                            width,
                            height,
                            font_index,
                            row,
                            col
                        );
                    }
                    screens.push(term.surface().as_bytes().to_vec());
                }
                assert!(screens[0] == screens[1], "{}x{} font {}", width, height, font_index);
            }
        }
    }
}
