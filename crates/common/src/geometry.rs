//! Integer pixel geometry.

use serde::{Deserialize, Serialize};

/// Integer rectangle in canvas pixel coordinates.
///
/// The origin may be negative and the far edges may lie past the canvas; use
/// [`PixelRect::clamp_to`] before indexing into a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole canvas.
    #[inline]
    pub const fn canvas(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn left(&self) -> i64 {
        self.x as i64
    }

    #[inline]
    pub fn top(&self) -> i64 {
        self.y as i64
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Whether the rectangles overlap or are separated by at most `slack`
    /// pixels on both axes.
    #[inline]
    pub fn touches(&self, other: &PixelRect, slack: i64) -> bool {
        other.left() <= self.right() + slack
            && self.left() <= other.right() + slack
            && other.top() <= self.bottom() + slack
            && self.top() <= other.bottom() + slack
    }

    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        let x = self.left().max(other.left());
        let y = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(PixelRect::from_edges(x, y, right, bottom))
        } else {
            None
        }
    }

    /// Bounding union of two rectangles.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let x = self.left().min(other.left());
        let y = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        PixelRect::from_edges(x, y, right, bottom)
    }

    /// Clip to a `width`×`height` canvas. Returns `None` when nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        self.intersection(&PixelRect::canvas(width, height))
    }

    fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> PixelRect {
        let x = left.clamp(i32::MIN as i64, i32::MAX as i64);
        let y = top.clamp(i32::MIN as i64, i32::MAX as i64);
        PixelRect {
            x: x as i32,
            y: y as i32,
            width: (right - x).clamp(0, u32::MAX as i64) as u32,
            height: (bottom - y).clamp(0, u32::MAX as i64) as u32,
        }
    }
}
