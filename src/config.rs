//! Configuration and palettes for gfxterm.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.gfxterm/config.toml`
//! - Conversion into the terminal core's [`TerminalOptions`]
//! - Host palettes mapping the 256 color indices to RGB for the viewer
//!
//! # Configuration File
//!
//! ```toml
//! foreground_color = 11
//! background_color = 0
//! # 0 = 8x8, 1 = 8x16, 2 = 8x24
//! font_selection = 1
//! display_width = 640
//! display_height = 480
//! # Copy rows one by one instead of using the bulk copy engine
//! disable_gfx_dma = true
//! cursor_blink = false
//! blink_interval_ms = 500
//! sound_level = 50
//! bell_duration_ms = 250
//! tab_width = 8
//! # vga or xterm
//! color_scheme = "vga"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::font::{BUILTIN_FONT_COUNT, DEFAULT_FONT_INDEX};
use crate::core::surface::CopyPath;
use crate::core::TerminalOptions;

const VALID_WIDTHS: [usize; 3] = [640, 800, 1024];
const VALID_HEIGHTS: [usize; 3] = [480, 640, 768];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config path")]
    NoHome,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub foreground_color: u8,
    pub background_color: u8,
    /// Built-in font index
    pub font_selection: usize,
    pub display_width: usize,
    pub display_height: usize,
    pub disable_gfx_dma: bool,
    pub cursor_blink: bool,
    pub blink_interval_ms: u64,
    /// Bell duty cycle in percent
    pub sound_level: u8,
    pub bell_duration_ms: u32,
    pub tab_width: usize,
    /// Host palette name
    pub color_scheme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            foreground_color: 11,
            background_color: 0,
            font_selection: DEFAULT_FONT_INDEX,
            display_width: 640,
            display_height: 480,
            disable_gfx_dma: true,
            cursor_blink: false,
            blink_interval_ms: 500,
            sound_level: 50,
            bell_duration_ms: 250,
            tab_width: 8,
            color_scheme: "vga".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to the
    /// defaults when it is missing or broken.
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring config: {}", e),
                }
            }
        }
        Self::default()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config.validated())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::get_config_path().ok_or(ConfigError::NoHome)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|source| ConfigError::Io { path, source })
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        let dir = config_dir()?;
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir.join("config.toml"))
    }

    /// Replace out-of-range values with their defaults.
    fn validated(mut self) -> Self {
        let defaults = Self::default();
        if !VALID_WIDTHS.contains(&self.display_width) {
            tracing::warn!("Unsupported display_width {}", self.display_width);
            self.display_width = defaults.display_width;
        }
        if !VALID_HEIGHTS.contains(&self.display_height) {
            tracing::warn!("Unsupported display_height {}", self.display_height);
            self.display_height = defaults.display_height;
        }
        if self.font_selection >= BUILTIN_FONT_COUNT {
            tracing::warn!("Unknown font_selection {}", self.font_selection);
            self.font_selection = defaults.font_selection;
        }
        if self.blink_interval_ms == 0 {
            self.blink_interval_ms = defaults.blink_interval_ms;
        }
        self.sound_level = self.sound_level.min(100);
        self
    }

    /// Options for the terminal core
    pub fn terminal_options(&self) -> TerminalOptions {
        TerminalOptions {
            width: self.display_width,
            height: self.display_height,
            font_index: self.font_selection,
            default_fg: self.foreground_color,
            default_bg: self.background_color,
            tab_width: self.tab_width,
            copy_path: if self.disable_gfx_dma {
                CopyPath::Rows
            } else {
                CopyPath::Bulk
            },
            cursor_blink: self.cursor_blink,
            sound_level: self.sound_level,
            bell_duration_ms: self.bell_duration_ms,
        }
    }

    pub fn get_palette(&self) -> Palette {
        Palette::by_name(&self.color_scheme)
    }
}

/// Directory holding the config file and the log.
pub fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".gfxterm"))
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn hex(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

const VGA_BASE: [u32; 16] = [
    0x000000, 0xAA0000, 0x00AA00, 0xAA5500, 0x0000AA, 0xAA00AA, 0x00AAAA, 0xAAAAAA,
    0x555555, 0xFF5555, 0x55FF55, 0xFFFF55, 0x5555FF, 0xFF55FF, 0x55FFFF, 0xFFFFFF,
];

const XTERM_BASE: [u32; 16] = [
    0x000000, 0xCD0000, 0x00CD00, 0xCDCD00, 0x0000EE, 0xCD00CD, 0x00CDCD, 0xE5E5E5,
    0x7F7F7F, 0xFF0000, 0x00FF00, 0xFFFF00, 0x5C5CFF, 0xFF00FF, 0x00FFFF, 0xFFFFFF,
];

/// RGB value of every 8-bit color index
#[derive(Debug, Clone)]
pub struct Palette {
    pub name: String,
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::vga()
    }
}

impl Palette {
    /// 16 base colors followed by the 6x6x6 cube and the gray ramp.
    fn build(name: &str, base: &[u32; 16]) -> Self {
        let mut colors: Vec<Color> = base.iter().map(|&rgb| Color::hex(rgb)).collect();
        let level = |n: usize| if n == 0 { 0 } else { (55 + n * 40) as u8 };
        for i in 0..216 {
            colors.push(Color::new(level(i / 36), level(i / 6 % 6), level(i % 6)));
        }
        for i in 0..24 {
            let gray = (8 + i * 10) as u8;
            colors.push(Color::new(gray, gray, gray));
        }
        Self {
            name: name.to_string(),
            colors,
        }
    }

    /// IBM PC colors
    pub fn vga() -> Self {
        Self::build("vga", &VGA_BASE)
    }

    /// xterm defaults
    pub fn xterm() -> Self {
        Self::build("xterm", &XTERM_BASE)
    }

    /// Get palette by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "xterm" => Self::xterm(),
            _ => Self::vga(),
        }
    }

    /// List available palettes
    pub fn list() -> Vec<&'static str> {
        vec!["vga", "xterm"]
    }

    pub fn color(&self, index: u8) -> Color {
        self.colors[usize::from(index)]
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
