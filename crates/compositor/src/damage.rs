//! Dirty-rectangle tracking for incremental compositing.
//!
//! Rectangles are collected as-is and only merged when a composite consumes
//! them. The merge is a single greedy sweep: cheap, and not guaranteed to
//! produce the minimal cover.

use crate::layer::LayerId;
use common::geometry::PixelRect;
use slotmap::SecondaryMap;
use smallvec::SmallVec;
use std::collections::HashSet;

/// Rectangles separated by at most this many pixels are merged.
const MERGE_SLACK: i64 = 1;

/// Accumulates invalidated regions, globally and per layer.
#[derive(Debug, Default)]
pub struct DirtyRectTracker {
    /// Canvas bounds, used when a whole-canvas invalidation is requested.
    canvas: PixelRect,
    /// Pending rectangles since the last composite.
    pending: Vec<PixelRect>,
    /// Pending rectangles per layer since that layer's last cache refresh.
    per_layer: SecondaryMap<LayerId, SmallVec<[PixelRect; 4]>>,
}

impl DirtyRectTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: PixelRect::canvas(width, height),
            pending: Vec::new(),
            per_layer: SecondaryMap::new(),
        }
    }

    /// Record a dirty region. `None` means the entire canvas.
    pub fn mark_dirty(&mut self, rect: Option<PixelRect>, layer_id: Option<LayerId>) {
        let rect = rect.unwrap_or(self.canvas);
        self.pending.push(rect);

        if let Some(id) = layer_id {
            if let Some(rects) = self.per_layer.entry(id) {
                rects.or_default().push(rect);
            }
        }
    }

    /// Rectangles pending since the last composite, in insertion order.
    pub fn pending(&self) -> &[PixelRect] {
        &self.pending
    }

    /// Rectangles pending for a single layer.
    pub fn layer_rects(&self, id: LayerId) -> &[PixelRect] {
        self.per_layer.get(id).map(|rects| rects.as_slice()).unwrap_or(&[])
    }

    /// Pending rectangles merged with [`merge_rectangles`].
    pub fn merged_pending(&self) -> Vec<PixelRect> {
        merge_rectangles(&self.pending)
    }

    /// Total area of the pending rectangles, counting exact duplicates once.
    ///
    /// Overlapping but distinct rectangles are counted in full, so this is a
    /// heuristic for strategy selection, not a pixel count.
    pub fn calculate_dirty_area(&self) -> u64 {
        let unique: HashSet<&PixelRect> = self.pending.iter().collect();
        unique.iter().map(|rect| rect.area()).sum()
    }

    /// Drop the global pending list after a composite.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Drop a layer's pending list after its cache entry is refreshed.
    pub fn clear_layer(&mut self, id: LayerId) {
        if let Some(rects) = self.per_layer.get_mut(id) {
            rects.clear();
        }
    }

    /// Forget a removed layer.
    pub fn forget_layer(&mut self, id: LayerId) {
        self.per_layer.remove(id);
    }

    /// Discard everything and adopt new canvas bounds.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.canvas = PixelRect::canvas(width, height);
        self.pending.clear();
        self.per_layer.clear();
    }
}

/// Merge rectangles that overlap or lie within one pixel of each other.
///
/// Input is sorted by `(x, y)` and swept once from left to right; each
/// rectangle is folded into the running union when it touches it, otherwise
/// the running union is emitted and a new one starts. Empty rectangles are
/// dropped.
pub fn merge_rectangles(rects: &[PixelRect]) -> Vec<PixelRect> {
    let mut sorted: Vec<PixelRect> = rects.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort_by_key(|r| (r.x, r.y));

    let mut merged = Vec::with_capacity(sorted.len());
    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for rect in iter {
        if current.touches(&rect, MERGE_SLACK) {
            current = current.union(&rect);
        } else {
            merged.push(current);
            current = rect;
        }
    }
    merged.push(current);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_merge_adjacent() {
        let merged = merge_rectangles(&[PixelRect::new(4, 0, 4, 4), PixelRect::new(0, 0, 4, 4)]);
        assert_eq!(merged, vec![PixelRect::new(0, 0, 8, 4)]);
    }

    #[test]
    fn test_merge_gap() {
        let one_pixel = merge_rectangles(&[PixelRect::new(0, 0, 4, 4), PixelRect::new(5, 0, 4, 4)]);
        assert_eq!(one_pixel, vec![PixelRect::new(0, 0, 9, 4)]);

        let two_pixels = merge_rectangles(&[PixelRect::new(0, 0, 4, 4), PixelRect::new(6, 0, 4, 4)]);
        assert_eq!(two_pixels, vec![PixelRect::new(0, 0, 4, 4), PixelRect::new(6, 0, 4, 4)]);
    }

    #[test]
    fn test_merge_is_single_pass() {
        // The first two do not touch, so they are emitted separately even
        // though the third later bridges them.
        let merged = merge_rectangles(&[
            PixelRect::new(0, 0, 2, 2),
            PixelRect::new(0, 10, 2, 2),
            PixelRect::new(1, 0, 2, 12),
        ]);
        assert_eq!(merged, vec![PixelRect::new(0, 0, 2, 2), PixelRect::new(0, 0, 3, 12)]);
    }

    #[test]
    fn test_merge_drops_empty() {
        assert!(merge_rectangles(&[]).is_empty());
        assert!(merge_rectangles(&[PixelRect::new(3, 3, 0, 10)]).is_empty());
    }

    #[test]
    fn test_dirty_area_dedupes_exact_matches() {
        let mut tracker = DirtyRectTracker::new(100, 100);
        tracker.mark_dirty(Some(PixelRect::new(0, 0, 10, 10)), None);
        tracker.mark_dirty(Some(PixelRect::new(0, 0, 10, 10)), None);
        tracker.mark_dirty(Some(PixelRect::new(5, 5, 10, 10)), None);

        assert_eq!(tracker.pending().len(), 3);
        assert_eq!(tracker.calculate_dirty_area(), 200);
    }

    #[test]
    fn test_whole_canvas_and_per_layer() {
        let mut ids: SlotMap<LayerId, ()> = SlotMap::with_key();
        let layer = ids.insert(());

        let mut tracker = DirtyRectTracker::new(32, 16);
        tracker.mark_dirty(None, Some(layer));
        tracker.mark_dirty(Some(PixelRect::new(1, 1, 2, 2)), None);

        assert_eq!(tracker.pending()[0], PixelRect::new(0, 0, 32, 16));
        assert_eq!(tracker.layer_rects(layer), &[PixelRect::new(0, 0, 32, 16)]);

        tracker.clear_layer(layer);
        assert!(tracker.layer_rects(layer).is_empty());
        assert!(!tracker.pending().is_empty());

        tracker.clear_pending();
        assert!(tracker.pending().is_empty());
    }
}
