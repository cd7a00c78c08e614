//! The composite output buffer.

use common::color::Color;
use common::geometry::PixelRect;

/// Canvas-sized composite output.
///
/// Only the engine writes to it. `stale` is the single source of truth for
/// whether a recompute is needed; `complete` records whether every pixel
/// outside the pending dirty rectangles holds a correct composite, which is
/// what the incremental strategy relies on.
#[derive(Clone, Debug)]
pub struct CompositeBuffer {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) color: Vec<Color>,
    pub(crate) alpha: Vec<u8>,
    pub(crate) stale: bool,
    pub(crate) complete: bool,
}

impl CompositeBuffer {
    /// A transparent, stale buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![Color::default(); len],
            alpha: vec![0; len],
            stale: true,
            complete: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.alpha.len()
    }

    /// Zero both planes inside a rectangle already clamped to the canvas.
    pub(crate) fn clear_rect(&mut self, rect: PixelRect) {
        let stride = self.width as usize;
        for y in rect.y as usize..rect.bottom() as usize {
            let start = y * stride + rect.x as usize;
            let end = start + rect.width as usize;
            self.color[start..end].fill(Color::default());
            self.alpha[start..end].fill(0);
        }
    }

    pub(crate) fn view(&self) -> CompositeView<'_> {
        CompositeView {
            width: self.width,
            height: self.height,
            color: &self.color,
            alpha: &self.alpha,
        }
    }
}

/// Read-only view of a fresh composite.
///
/// The view borrows the compositor, so it cannot outlive the next mutating
/// call. Copy it with [`to_rgba`](Self::to_rgba) or [`to_planes`](Self::to_planes)
/// to keep a stable snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeView<'a> {
    pub width: u32,
    pub height: u32,
    pub color: &'a [Color],
    pub alpha: &'a [u8],
}

impl CompositeView<'_> {
    /// Get the color and alpha at a position.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(Color, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.width as usize + x as usize;
        Some((self.color[i], self.alpha[i]))
    }

    /// Interleaved RGBA copy (4 bytes per pixel).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.alpha.len() * 4];
        for (chunk, (color, &alpha)) in data
            .chunks_exact_mut(4)
            .zip(self.color.iter().zip(self.alpha))
        {
            chunk.copy_from_slice(&color.with_alpha(alpha));
        }
        data
    }

    /// Owned copies of both planes.
    pub fn to_planes(&self) -> (Vec<Color>, Vec<u8>) {
        (self.color.to_vec(), self.alpha.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_stale_and_transparent() {
        let buffer = CompositeBuffer::new(3, 2);
        assert!(buffer.stale);
        assert_eq!(buffer.len(), 6);
        assert!(buffer.alpha.iter().all(|&a| a == 0));
    }

    #[test]
    fn test_clear_rect() {
        let mut buffer = CompositeBuffer::new(4, 4);
        buffer.color.fill(Color::RED);
        buffer.alpha.fill(255);

        buffer.clear_rect(PixelRect::new(1, 1, 2, 2));
        let view = buffer.view();
        assert_eq!(view.pixel(0, 0), Some((Color::RED, 255)));
        assert_eq!(view.pixel(1, 1), Some((Color::default(), 0)));
        assert_eq!(view.pixel(2, 2), Some((Color::default(), 0)));
        assert_eq!(view.pixel(3, 2), Some((Color::RED, 255)));
        assert_eq!(view.pixel(4, 0), None);
    }

    #[test]
    fn test_to_rgba() {
        let mut buffer = CompositeBuffer::new(2, 1);
        buffer.color[1] = Color::rgb(1, 2, 3);
        buffer.alpha[1] = 9;
        assert_eq!(buffer.view().to_rgba(), vec![0, 0, 0, 0, 1, 2, 3, 9]);
    }
}
