//! External collaborators
//!
//! The terminal core talks to the display hardware and the speaker through
//! these small synchronous contracts. The soft implementations back the host
//! viewer and the tests.

use std::time::{Duration, Instant};

use super::error::{GfxError, Result};

/// Pixel memory handed out by a display driver after a mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Bytes per row, may exceed `width`
    pub pitch: usize,
}

/// Display mode switching and framebuffer allocation.
pub trait DisplayDriver: Send {
    /// Release the current framebuffer and allocate one for the new mode.
    fn set_mode(&mut self, width: usize, height: usize, bpp: usize) -> Result<Framebuffer>;
}

/// Allocates framebuffers in host memory.
#[derive(Debug, Clone)]
pub struct MemoryDisplay {
    pitch_align: usize,
    max_width: usize,
    max_height: usize,
}

impl Default for MemoryDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self {
            pitch_align: 1,
            max_width: 4096,
            max_height: 4096,
        }
    }

    /// Round every row up to a multiple of `align` bytes.
    pub fn with_pitch_align(mut self, align: usize) -> Self {
        self.pitch_align = align.max(1);
        self
    }

    /// Refuse modes larger than the given size.
    pub fn with_max_size(mut self, width: usize, height: usize) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }
}

impl DisplayDriver for MemoryDisplay {
    fn set_mode(&mut self, width: usize, height: usize, bpp: usize) -> Result<Framebuffer> {
        if bpp != 8 || width == 0 || height == 0 || width > self.max_width || height > self.max_height {
            return Err(GfxError::UnsupportedMode { width, height, bpp });
        }
        let pitch = width.div_ceil(self.pitch_align) * self.pitch_align;
        Ok(Framebuffer {
            pixels: vec![0; pitch * height],
            width,
            height,
            pitch,
        })
    }
}

/// Speaker used for the terminal bell.
pub trait Beeper: Send {
    /// Start a tone at `duty_percent` (0..=100); `duration_ms == 0` keeps it
    /// sounding until [`stop`](Self::stop).
    fn start(&mut self, duty_percent: u8, duration_ms: u32);
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Beeper that only tracks its own state.
#[derive(Debug, Default)]
pub struct SoftBeeper {
    active: bool,
    duty: u8,
    until: Option<Instant>,
    starts: usize,
}

impl SoftBeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    /// How many tones were started so far.
    pub fn starts(&self) -> usize {
        self.starts
    }
}

impl Beeper for SoftBeeper {
    fn start(&mut self, duty_percent: u8, duration_ms: u32) {
        self.stop();
        self.duty = duty_percent.min(100);
        self.active = true;
        self.starts += 1;
        self.until = (duration_ms > 0).then(|| Instant::now() + Duration::from_millis(u64::from(duration_ms)));
        tracing::debug!("Beep {}% for {}ms", self.duty, duration_ms);
    }

    fn stop(&mut self) {
        self.active = false;
        self.until = None;
    }

    fn is_active(&self) -> bool {
        self.active && self.until.map_or(true, |end| Instant::now() < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_display_pitch() {
        let mut display = MemoryDisplay::new().with_pitch_align(64);
        let fb = display.set_mode(100, 10, 8).unwrap();
        assert_eq!(fb.pitch, 128);
        assert_eq!(fb.pixels.len(), 1280);

        assert!(display.set_mode(100, 10, 32).is_err());
        let mut small = MemoryDisplay::new().with_max_size(320, 200);
        assert!(small.set_mode(640, 480, 8).is_err());
    }

    #[test]
    fn test_soft_beeper() {
        let mut beeper = SoftBeeper::new();
        assert!(!beeper.is_active());
        beeper.start(150, 0);
        assert!(beeper.is_active());
        assert_eq!(beeper.duty(), 100);
        beeper.stop();
        assert!(!beeper.is_active());

        beeper.start(50, 1);
        std::thread::sleep(Duration::from_millis(5));
        assert!(!beeper.is_active());
        assert_eq!(beeper.starts(), 2);
    }
}
