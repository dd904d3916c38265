//! Supersampled frame buffer and box-filter downsampler
//!
//! The buffer holds color + depth cells at supersample resolution. Cells are
//! stored column-major (`index = x * height + y`), so a contiguous slice of
//! the cell vec is a range of whole columns; the renderer exploits this to
//! hand disjoint column bands to parallel fill workers without locking.

use super::types::{ClearFlags, Color};

/// Depth value of the far plane; depth decreases toward the camera.
pub const FAR_DEPTH: f32 = 1.0;

/// One framebuffer cell.
#[derive(Debug, Clone, Copy)]
pub struct Pixel {
    pub color: Color,
    pub depth: f32,
}

/// Fixed-size color + depth grid. Dimensions never change after
/// construction.
pub struct Framebuffer {
    cells: Vec<Pixel>,
    width: usize,
    height: usize,
    background: Color,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let background = Color::BLACK;
        Self {
            cells: vec![Pixel { color: background, depth: FAR_DEPTH }; width * height],
            width,
            height,
            background,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Backing slot of cell (x, y). Column-major: a column is contiguous.
    pub fn index(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    /// Cell at (x, y), or None outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x < self.width && y < self.height {
            Some(self.cells[x * self.height + y])
        } else {
            None
        }
    }

    /// Reset the planes selected by `flags`: color cells to the background
    /// color, depth cells to the far value.
    pub fn clear(&mut self, flags: ClearFlags) {
        let color = flags.contains(ClearFlags::COLOR);
        let depth = flags.contains(ClearFlags::DEPTH);
        for cell in &mut self.cells {
            if color {
                cell.color = self.background;
            }
            if depth {
                cell.depth = FAR_DEPTH;
            }
        }
    }

    /// Mutable cell access for the fill workers. Callers split this into
    /// disjoint column bands; the column-major layout guarantees a chunk of
    /// `k * height` cells covers exactly `k` whole columns.
    pub fn cells_mut(&mut self) -> &mut [Pixel] {
        &mut self.cells
    }

    /// Box-filter one output pixel from its `factor` x `factor` source
    /// block. Channels accumulate in u32 and the average truncates, so the
    /// result does not depend on enumeration order.
    pub fn resolve_pixel(&self, factor: usize, out_x: usize, out_y: usize) -> Color {
        let mut sum = [0u32; 4];
        for sx in 0..factor {
            for sy in 0..factor {
                let cell = self.cells[self.index(out_x * factor + sx, out_y * factor + sy)];
                let bytes = cell.color.to_bytes();
                for (acc, ch) in sum.iter_mut().zip(bytes) {
                    *acc += ch as u32;
                }
            }
        }
        let n = (factor * factor) as u32;
        Color::with_alpha(
            (sum[0] / n) as u8,
            (sum[1] / n) as u8,
            (sum[2] / n) as u8,
            (sum[3] / n) as u8,
        )
    }

    /// Downsample the whole buffer into a row-major RGBA byte vec at output
    /// resolution (buffer dimensions divided by `factor`). Depth is not
    /// downsampled; it only drives the fill.
    pub fn resolve(&self, factor: usize) -> Vec<u8> {
        let out_w = self.width / factor;
        let out_h = self.height / factor;
        let mut bytes = Vec::with_capacity(out_w * out_h * 4);
        for y in 0..out_h {
            for x in 0..out_w {
                bytes.extend_from_slice(&self.resolve_pixel(factor, x, y).to_bytes());
            }
        }
        bytes
    }
}
