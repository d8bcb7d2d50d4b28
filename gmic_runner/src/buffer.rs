//! Host-side buffer abstraction and an in-memory implementation.
//!
//! Host samples are normalized to `[0, 1]`. A buffer has a native format;
//! reads and writes may ask for any other [`PixelFormat`] and are converted
//! on the fly.

use crate::error::{RunnerError, RunnerResult};
use crate::format::{Layout, PixelFormat};
use crate::region::Rect;

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Caller-owned rectangular pixel buffer.
pub trait HostBuffer {
    /// Full extent of the buffer.
    fn extent(&self) -> Rect;

    /// Native format of the stored samples.
    fn format(&self) -> PixelFormat;

    /// Reads `rect` in `format`. Pixels outside the extent read as zero.
    fn get(&self, rect: Rect, format: PixelFormat) -> Vec<f32>;

    /// Writes `data` (interleaved in `format`) into `rect`. Pixels outside
    /// the extent are dropped.
    fn set(&mut self, rect: Rect, format: PixelFormat, data: &[f32]);

    /// Changes the extent of the buffer.
    fn set_extent(&mut self, extent: Rect);
}

/// Expands one pixel of `layout` to RGBA.
pub fn to_rgba(px: &[f32], layout: Layout) -> [f32; 4] {
    match layout {
        Layout::Y => [px[0], px[0], px[0], 1.0],
        Layout::Ya => [px[0], px[0], px[0], px[1]],
        Layout::Rgb => [px[0], px[1], px[2], 1.0],
        Layout::Rgba => [px[0], px[1], px[2], px[3]],
    }
}

/// Stores an RGBA pixel into `out` using `layout`.
pub fn from_rgba(rgba: [f32; 4], layout: Layout, out: &mut [f32]) {
    let luma = || {
        // Gray stays bit exact.
        if rgba[0] == rgba[1] && rgba[1] == rgba[2] {
            rgba[0]
        } else {
            rgba[0] * LUMA[0] + rgba[1] * LUMA[1] + rgba[2] * LUMA[2]
        }
    };
    match layout {
        Layout::Y => out[0] = luma(),
        Layout::Ya => {
            out[0] = luma();
            out[1] = rgba[3];
        }
        Layout::Rgb => out[..3].copy_from_slice(&rgba[..3]),
        Layout::Rgba => out[..4].copy_from_slice(&rgba),
    }
}

/// In-memory [`HostBuffer`].
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    extent: Rect,
    format: PixelFormat,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Zero-filled buffer.
    pub fn new(extent: Rect, format: PixelFormat) -> Self {
        let len = extent.area() * format.components();
        Self {
            extent,
            format,
            data: vec![0.0; len],
        }
    }

    /// Wraps existing interleaved samples.
    pub fn from_samples(extent: Rect, format: PixelFormat, data: Vec<f32>) -> RunnerResult<Self> {
        let expected = extent.area() * format.components();
        if data.len() != expected {
            return Err(RunnerError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            extent,
            format,
            data,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Native samples of the pixel at absolute `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> Option<&[f32]> {
        let idx = self.index(x, y)?;
        Some(&self.data[idx..idx + self.format.components()])
    }

    /// Sets every pixel to `rgba`.
    pub fn fill(&mut self, rgba: [f32; 4]) {
        let layout = self.format.layout;
        for px in self.data.chunks_exact_mut(layout.components()) {
            from_rgba(rgba, layout, px);
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.extent.contains(x, y) {
            return None;
        }
        let col = (x - self.extent.x) as usize;
        let row = (y - self.extent.y) as usize;
        Some((row * self.extent.width as usize + col) * self.format.components())
    }
}

impl HostBuffer for PixelBuffer {
    fn extent(&self) -> Rect {
        self.extent
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn get(&self, rect: Rect, format: PixelFormat) -> Vec<f32> {
        let n = format.components();
        let mut out = vec![0.0; rect.area() * n];
        if rect.is_empty() {
            return out;
        }
        let native = self.format.layout;
        for (i, px) in out.chunks_exact_mut(n).enumerate() {
            let x = rect.x + (i % rect.width as usize) as i32;
            let y = rect.y + (i / rect.width as usize) as i32;
            if let Some(src) = self.pixel(x, y) {
                from_rgba(to_rgba(src, native), format.layout, px);
            }
        }
        out
    }

    fn set(&mut self, rect: Rect, format: PixelFormat, data: &[f32]) {
        if rect.is_empty() {
            return;
        }
        let native = self.format.layout;
        let n = self.format.components();
        for (i, px) in data.chunks_exact(format.components()).take(rect.area()).enumerate() {
            let x = rect.x + (i % rect.width as usize) as i32;
            let y = rect.y + (i / rect.width as usize) as i32;
            if let Some(idx) = self.index(x, y) {
                from_rgba(to_rgba(px, format.layout), native, &mut self.data[idx..idx + n]);
            }
        }
    }

    fn set_extent(&mut self, extent: Rect) {
        if extent == self.extent {
            return;
        }
        let mut resized = PixelBuffer::new(extent, self.format);
        if let Some(overlap) = self.extent.intersect(&extent) {
            let n = self.format.components();
            for y in overlap.y..overlap.y + overlap.height {
                for x in overlap.x..overlap.x + overlap.width {
                    if let (Some(src), Some(dst)) = (self.index(x, y), resized.index(x, y)) {
                        resized.data[dst..dst + n].copy_from_slice(&self.data[src..src + n]);
                    }
                }
            }
        }
        *self = resized;
    }
}
