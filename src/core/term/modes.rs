//! Legacy display modes selectable with `ESC [ = <n> h`

/// Display geometry requested from the display driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: usize,
    pub height: usize,
    pub bpp: usize,
}

impl DisplayMode {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height, bpp: 8 }
    }
}

/// Indexed after the PC BIOS video modes; zero-sized entries are text-only
/// or planar modes with no framebuffer equivalent.
const LEGACY_MODES: [DisplayMode; 21] = [
    DisplayMode::new(320, 200),
    DisplayMode::new(320, 200),
    DisplayMode::new(640, 480),
    DisplayMode::new(640, 480),
    DisplayMode::new(320, 200),
    DisplayMode::new(320, 200),
    DisplayMode::new(640, 200),
    DisplayMode::new(0, 0),
    DisplayMode::new(0, 0),
    DisplayMode::new(0, 0),
    DisplayMode::new(0, 0),
    DisplayMode::new(0, 0),
    DisplayMode::new(0, 0),
    DisplayMode::new(320, 200),
    DisplayMode::new(640, 200),
    DisplayMode::new(640, 350),
    DisplayMode::new(640, 350),
    DisplayMode::new(640, 480),
    DisplayMode::new(640, 480),
    DisplayMode::new(320, 200),
    DisplayMode::new(320, 240),
];

/// Highest valid legacy mode number.
pub const LAST_MODE_NUMBER: usize = LEGACY_MODES.len() - 1;

/// Mode for a legacy mode number, if that number maps to a framebuffer.
pub fn legacy_mode(number: u32) -> Option<DisplayMode> {
    let mode = *LEGACY_MODES.get(usize::try_from(number).ok()?)?;
    (mode.width > 0).then_some(mode)
}
