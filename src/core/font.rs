//! Fonts
//!
//! A font is an opaque source of fixed-size glyph bitmaps. Glyphs use one
//! byte per pixel, row-major; a nonzero byte is a foreground pixel.
//!
//! Three built-in fonts are derived from the `font8x8` tables:
//!
//! | Index | Kind        | Cell  |
//! |-------|-------------|-------|
//! | 0     | `System8x8` | 8x8   |
//! | 1     | `System8x16`| 8x16  |
//! | 2     | `System8x24`| 8x24  |
//!
//! Codes 0x00-0x7F come from the basic table and 0xA0-0xFF from the Latin-1
//! supplement; the remaining codes are blank.

use std::sync::{Arc, OnceLock};

use font8x8::legacy::{BASIC_LEGACY, LATIN_LEGACY};

use super::error::{GfxError, Result};

/// Identifies a font family without comparing glyph storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKind {
    System8x8,
    System8x16,
    System8x24,
    Custom,
}

/// Glyph source consumed by the renderer.
pub trait FontSource: Send + Sync {
    fn kind(&self) -> FontKind;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Bitmap of `width * height` bytes, or `None` when the font has no
    /// glyph for `code` (rendered as a blank cell).
    fn glyph(&self, code: u32) -> Option<&[u8]>;
}

/// Shared font handle.
pub type Font = Arc<dyn FontSource>;

/// Number of built-in fonts.
pub const BUILTIN_FONT_COUNT: usize = 3;

/// Built-in font used when nothing else is selected.
pub const DEFAULT_FONT_INDEX: usize = 1;

/// Font backed by a contiguous glyph table.
#[derive(Debug, Clone)]
pub struct BitmapFont {
    kind: FontKind,
    name: String,
    width: usize,
    height: usize,
    glyphs: Vec<u8>,
}

impl BitmapFont {
    /// Build a font from raw glyph data; `data.len()` must be a whole number
    /// of `width * height` glyphs.
    pub fn from_raw(name: impl Into<String>, width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let cell = width * height;
        if cell == 0 || data.is_empty() || data.len() % cell != 0 {
            return Err(GfxError::InvalidFont {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            kind: FontKind::Custom,
            name: name.into(),
            width,
            height,
            glyphs: data,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len() / (self.width * self.height)
    }

    /// Expand the 8x8 tables, repeating each source row `scale` times.
    fn system(kind: FontKind, name: &str, scale: usize) -> Self {
        let (width, height) = (8, 8 * scale);
        let cell = width * height;
        let mut glyphs = vec![0u8; 256 * cell];

        let sources = BASIC_LEGACY
            .iter()
            .enumerate()
            .chain(LATIN_LEGACY.iter().enumerate().map(|(i, g)| (0xA0 + i, g)));
        for (code, rows) in sources {
            let glyph = &mut glyphs[code * cell..(code + 1) * cell];
            for (row, bits) in rows.iter().enumerate() {
                for repeat in 0..scale {
                    let line = (row * scale + repeat) * width;
                    for x in 0..width {
                        if *bits & (1u8 << x) != 0 {
                            glyph[line + x] = 0xFF;
                        }
                    }
                }
            }
        }

        Self {
            kind,
            name: name.to_string(),
            width,
            height,
            glyphs,
        }
    }
}

impl FontSource for BitmapFont {
    fn kind(&self) -> FontKind {
        self.kind
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn glyph(&self, code: u32) -> Option<&[u8]> {
        let cell = self.width * self.height;
        let start = usize::try_from(code).ok()?.checked_mul(cell)?;
        self.glyphs.get(start..start + cell)
    }
}

fn registry() -> &'static [Font; BUILTIN_FONT_COUNT] {
    static FONTS: OnceLock<[Font; BUILTIN_FONT_COUNT]> = OnceLock::new();
    FONTS.get_or_init(|| {
        [
            Arc::new(BitmapFont::system(FontKind::System8x8, "System 8x8", 1)) as Font,
            Arc::new(BitmapFont::system(FontKind::System8x16, "System 8x16", 2)) as Font,
            Arc::new(BitmapFont::system(FontKind::System8x24, "System 8x24", 3)) as Font,
        ]
    })
}

/// Look up a built-in font by registry index.
pub fn builtin(index: usize) -> Result<Font> {
    registry()
        .get(index)
        .cloned()
        .ok_or(GfxError::UnknownFont(index))
}

/// Registry index of a built-in font kind.
pub fn builtin_index(kind: FontKind) -> Option<usize> {
    registry().iter().position(|font| font.kind() == kind)
}
