//! Pixel surface
//!
//! Owns the 8-bit indexed framebuffer and the primitive fill/copy/scroll
//! operations, all addressed in pixel coordinates. Nothing here knows about
//! characters. Every operation clips to the surface bounds.

use super::devices::Framebuffer;
use super::error::{GfxError, Result};

/// A 2D block transfer inside one byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub dst: usize,
    pub src: usize,
    pub rows: usize,
    pub cols: usize,
    pub dst_stride: usize,
    pub src_stride: usize,
}

/// Block copy engine.
///
/// The result must be the same as if the whole source block had been read
/// before any destination byte was written. Implementations only differ in
/// throughput.
pub trait BlockCopy: Send {
    fn copy_block(&mut self, buf: &mut [u8], block: Block);
}

/// Plain row-by-row copy, ordered so overlapping rows are read before they
/// are overwritten.
#[derive(Debug, Default)]
pub struct RowCopy;

impl BlockCopy for RowCopy {
    fn copy_block(&mut self, buf: &mut [u8], block: Block) {
        if block.rows == 0 || block.cols == 0 {
            return;
        }
        let mut copy_row = |row: usize| {
            let src = block.src + row * block.src_stride;
            let dst = block.dst + row * block.dst_stride;
            buf.copy_within(src..src + block.cols, dst);
        };
        if block.dst > block.src {
            (0..block.rows).rev().for_each(&mut copy_row);
        } else {
            (0..block.rows).for_each(&mut copy_row);
        }
    }
}

/// Bulk transfer modelled on a 2D DMA channel: contiguous blocks move in one
/// go, strided blocks are staged through a scratch buffer.
#[derive(Debug, Default)]
pub struct BulkCopy {
    scratch: Vec<u8>,
}

impl BlockCopy for BulkCopy {
    fn copy_block(&mut self, buf: &mut [u8], block: Block) {
        if block.rows == 0 || block.cols == 0 {
            return;
        }
        if block.cols == block.src_stride && block.cols == block.dst_stride {
            let len = block.rows * block.cols;
            buf.copy_within(block.src..block.src + len, block.dst);
            return;
        }

        self.scratch.clear();
        for row in 0..block.rows {
            let src = block.src + row * block.src_stride;
            self.scratch.extend_from_slice(&buf[src..src + block.cols]);
        }
        for (row, chunk) in self.scratch.chunks_exact(block.cols).enumerate() {
            let dst = block.dst + row * block.dst_stride;
            buf[dst..dst + block.cols].copy_from_slice(chunk);
        }
    }
}

/// Which copy engine a surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyPath {
    #[default]
    Rows,
    Bulk,
}

impl CopyPath {
    fn engine(self) -> Box<dyn BlockCopy> {
        match self {
            CopyPath::Rows => Box::new(RowCopy),
            CopyPath::Bulk => Box::new(BulkCopy::default()),
        }
    }
}

/// Direction the pixel content moves in a vertical scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalShift {
    Up,
    Down,
}

/// Direction the pixel content moves in a horizontal scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalShift {
    Left,
    Right,
}

/// 8 bits per pixel framebuffer.
pub struct PixelSurface {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
    pitch: usize,
    copy_path: CopyPath,
    copier: Box<dyn BlockCopy>,
}

impl std::fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .field("copy_path", &self.copy_path)
            .finish()
    }
}

impl PixelSurface {
    /// Allocate a zeroed surface.
    pub fn new(width: usize, height: usize, pitch: usize, copy_path: CopyPath) -> Result<Self> {
        Self::from_framebuffer(
            Framebuffer {
                pixels: vec![0; pitch * height],
                width,
                height,
                pitch,
            },
            copy_path,
        )
    }

    /// Wrap a framebuffer handed out by the display driver.
    pub fn from_framebuffer(fb: Framebuffer, copy_path: CopyPath) -> Result<Self> {
        if fb.width == 0 || fb.height == 0 || fb.pitch < fb.width || fb.pixels.len() < fb.pitch * fb.height {
            return Err(GfxError::InvalidGeometry {
                width: fb.width,
                height: fb.height,
                pitch: fb.pitch,
            });
        }
        Ok(Self {
            pixels: fb.pixels,
            width: fb.width,
            height: fb.height,
            pitch: fb.pitch,
            copy_path,
            copier: copy_path.engine(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn copy_path(&self) -> CopyPath {
        self.copy_path
    }

    /// Number of bytes covered by the screen, pitch padding included.
    pub fn size(&self) -> usize {
        self.pitch * self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels[..self.size()]
    }

    /// Visible pixels of one row.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.pitch;
        &self.pixels[start..start + self.width]
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.pitch + x])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u8) {
        if x < self.width && y < self.height {
            self.pixels[y * self.pitch + x] = color;
        }
    }

    /// Fill the whole buffer, pitch padding included.
    pub fn fill(&mut self, color: u8) {
        let size = self.size();
        self.pixels[..size].fill(color);
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        for row in y..y + h {
            let start = row * self.pitch + x;
            self.pixels[start..start + w].fill(color);
        }
    }

    /// Copy the clipped `w`x`h` rectangle at (`x`,`y`) into `out`, row-major.
    /// Returns the number of bytes written.
    pub fn read_rect(&self, x: usize, y: usize, w: usize, h: usize, out: &mut [u8]) -> usize {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        let mut written = 0;
        for row in y..y + h {
            let start = row * self.pitch + x;
            let Some(dst) = out.get_mut(written..written + w) else {
                break;
            };
            dst.copy_from_slice(&self.pixels[start..start + w]);
            written += w;
        }
        written
    }

    /// Inverse of [`read_rect`](Self::read_rect).
    pub fn write_rect(&mut self, x: usize, y: usize, w: usize, h: usize, data: &[u8]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        for (i, row) in (y..y + h).enumerate() {
            let Some(src) = data.get(i * w..i * w + w) else {
                break;
            };
            let start = row * self.pitch + x;
            self.pixels[start..start + w].copy_from_slice(src);
        }
    }

    /// Apply `f` to every pixel of the clipped rectangle.
    pub fn map_rect(&mut self, x: usize, y: usize, w: usize, h: usize, mut f: impl FnMut(u8) -> u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        for row in y..y + h {
            let start = row * self.pitch + x;
            for px in &mut self.pixels[start..start + w] {
                *px = f(*px);
            }
        }
    }

    /// Move a `w`x`h` rectangle from (`src_x`,`src_y`) to (`dst_x`,`dst_y`).
    /// Both rectangles are clipped to the surface.
    pub fn copy_rect(&mut self, src_x: usize, src_y: usize, dst_x: usize, dst_y: usize, w: usize, h: usize) {
        if src_x >= self.width || dst_x >= self.width || src_y >= self.height || dst_y >= self.height {
            return;
        }
        let w = w.min(self.width - src_x).min(self.width - dst_x);
        let h = h.min(self.height - src_y).min(self.height - dst_y);
        let block = Block {
            dst: dst_y * self.pitch + dst_x,
            src: src_y * self.pitch + src_x,
            rows: h,
            cols: w,
            dst_stride: self.pitch,
            src_stride: self.pitch,
        };
        self.copier.copy_block(&mut self.pixels, block);
    }

    /// Move every row by `delta` pixels. The vacated band is left as is;
    /// callers fill it.
    pub fn scroll_vertical(&mut self, delta: usize, shift: VerticalShift) {
        if delta == 0 || delta >= self.height {
            return;
        }
        let rows = self.height - delta;
        let (src_y, dst_y) = match shift {
            VerticalShift::Up => (delta, 0),
            VerticalShift::Down => (0, delta),
        };
        let block = Block {
            dst: dst_y * self.pitch,
            src: src_y * self.pitch,
            rows,
            cols: self.width,
            dst_stride: self.pitch,
            src_stride: self.pitch,
        };
        self.copier.copy_block(&mut self.pixels, block);
    }

    /// Move every column by `delta` pixels, row by row. The vacated band is
    /// left as is.
    pub fn scroll_horizontal(&mut self, delta: usize, shift: HorizontalShift) {
        if delta == 0 || delta >= self.width {
            return;
        }
        let cols = self.width - delta;
        let (src_x, dst_x) = match shift {
            HorizontalShift::Left => (delta, 0),
            HorizontalShift::Right => (0, delta),
        };
        self.copy_rect(src_x, 0, dst_x, 0, cols, self.height);
    }

    /// Raw snapshot of the whole screen into `out` (exactly `size()` bytes).
    pub fn save_to(&self, out: &mut [u8]) -> Result<()> {
        let size = self.size();
        if out.len() != size {
            return Err(GfxError::BufferSize {
                expected: size,
                actual: out.len(),
            });
        }
        out.copy_from_slice(&self.pixels[..size]);
        Ok(())
    }

    /// Restore a snapshot taken with [`save_to`](Self::save_to).
    pub fn restore_from(&mut self, data: &[u8]) -> Result<()> {
        let size = self.size();
        if data.len() != size {
            return Err(GfxError::BufferSize {
                expected: size,
                actual: data.len(),
            });
        }
        self.pixels[..size].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Surface where every pixel encodes its own coordinates.
    fn patterned(width: usize, height: usize, pitch: usize, path: CopyPath) -> PixelSurface {
        let mut surface = PixelSurface::new(width, height, pitch, path).unwrap();
        for y in 0..height {
            for x in 0..width {
                surface.set_pixel(x, y, (y * 16 + x) as u8);
            }
        }
        surface
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut surface = PixelSurface::new(8, 4, 10, CopyPath::Rows).unwrap();
        surface.fill_rect(6, 2, 100, 100, 7);
        assert_eq!(surface.pixel(5, 2), Some(0));
        assert_eq!(surface.pixel(6, 2), Some(7));
        assert_eq!(surface.pixel(7, 3), Some(7));
        // Pitch padding is untouched
        assert_eq!(surface.as_bytes()[2 * 10 + 8], 0);

        // Fully off-screen is a no-op
        surface.fill_rect(8, 0, 1, 1, 9);
        surface.fill_rect(0, 4, 1, 1, 9);
        assert!(surface.as_bytes().iter().all(|&p| p != 9));
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(PixelSurface::new(10, 4, 8, CopyPath::Rows).is_err());
        assert!(PixelSurface::new(0, 4, 8, CopyPath::Rows).is_err());
    }

    #[test]
    fn test_copy_paths_are_equivalent() {
        for &(delta, shift) in &[(1, VerticalShift::Up), (3, VerticalShift::Down)] {
            let mut rows = patterned(12, 9, 16, CopyPath::Rows);
            let mut bulk = patterned(12, 9, 16, CopyPath::Bulk);
            rows.scroll_vertical(delta, shift);
            bulk.scroll_vertical(delta, shift);
            assert_eq!(rows.as_bytes(), bulk.as_bytes());
        }
        for &(delta, shift) in &[(2, HorizontalShift::Left), (5, HorizontalShift::Right)] {
            let mut rows = patterned(12, 9, 12, CopyPath::Rows);
            let mut bulk = patterned(12, 9, 12, CopyPath::Bulk);
            rows.scroll_horizontal(delta, shift);
            bulk.scroll_horizontal(delta, shift);
            assert_eq!(rows.as_bytes(), bulk.as_bytes());
        }
    }

    #[test]
    fn test_scroll_vertical_moves_rows() {
        let mut surface = patterned(4, 6, 4, CopyPath::Rows);
        let before = surface.as_bytes().to_vec();
        surface.scroll_vertical(2, VerticalShift::Up);
        assert_eq!(surface.row(0), &before[8..12]);
        assert_eq!(surface.row(3), &before[20..24]);
        // Vacated rows keep their old content until the caller fills them
        assert_eq!(surface.row(5), &before[20..24]);

        let mut surface = patterned(4, 6, 4, CopyPath::Bulk);
        surface.scroll_vertical(2, VerticalShift::Down);
        assert_eq!(surface.row(2), &before[0..4]);
        assert_eq!(surface.row(5), &before[12..16]);
    }

    #[test]
    fn test_scroll_horizontal_too_far_is_noop() {
        let mut surface = patterned(6, 3, 6, CopyPath::Rows);
        let before = surface.as_bytes().to_vec();
        surface.scroll_horizontal(6, HorizontalShift::Left);
        surface.scroll_horizontal(0, HorizontalShift::Right);
        assert_eq!(surface.as_bytes(), &before[..]);

        surface.scroll_horizontal(2, HorizontalShift::Right);
        assert_eq!(surface.pixel(2, 1), Some(16));
        assert_eq!(surface.pixel(5, 1), Some(19));
    }

    #[test]
    fn test_rect_round_trip() {
        let mut surface = patterned(8, 8, 8, CopyPath::Rows);
        let mut saved = vec![0u8; 9];
        assert_eq!(surface.read_rect(6, 6, 3, 3, &mut saved), 4);
        surface.fill_rect(6, 6, 3, 3, 0xEE);
        surface.write_rect(6, 6, 3, 3, &saved[..4]);
        assert_eq!(surface.pixel(7, 7), Some(7 * 16 + 7));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut surface = patterned(5, 5, 8, CopyPath::Bulk);
        let mut snapshot = vec![0u8; surface.size()];
        surface.save_to(&mut snapshot).unwrap();
        surface.fill(3);
        surface.restore_from(&snapshot).unwrap();
        assert_eq!(surface.as_bytes(), &snapshot[..]);

        let err = surface.save_to(&mut [0u8; 3]).unwrap_err();
        assert_eq!(err, GfxError::BufferSize { expected: 40, actual: 3 });
    }
}
