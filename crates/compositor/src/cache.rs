//! Per-layer cache bookkeeping.
//!
//! Every live layer has exactly one cache entry. The entry's staleness flag
//! must be cleared with [`LayerCache::update_layer_cache`] before the engine
//! trusts the layer's buffers. When layer caching is enabled the refresh
//! also maintains a [`LayerExtent`] payload, which the periodic cleanup
//! sweep may release again.

use crate::layer::{Layer, LayerId};
use common::geometry::PixelRect;
use slotmap::SecondaryMap;
use std::mem;
use std::time::{Duration, Instant};

/// Half-open column range `[start, end)` of a row's nonzero alpha pixels.
type RowSpan = (u32, u32);

/// Where a layer has content: the nonzero-alpha column range of every row
/// and their bounding box.
///
/// The incremental path clips its blend spans to these ranges and skips
/// layers whose bounds miss the rectangle being recomputed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerExtent {
    /// Bounding box of all pixels with nonzero alpha, if any.
    pub content_bounds: Option<PixelRect>,
    width: u32,
    rows: Vec<Option<RowSpan>>,
}

impl LayerExtent {
    /// Scan every row of a layer.
    pub fn from_layer(layer: &Layer) -> Self {
        let rows = (0..layer.height()).map(|y| row_span(layer, y)).collect();
        let mut extent = Self {
            content_bounds: None,
            width: layer.width(),
            rows,
        };
        extent.update_bounds();
        extent
    }

    fn fits(&self, layer: &Layer) -> bool {
        self.width == layer.width() && self.rows.len() == layer.height() as usize
    }

    /// Rescan only the rows crossed by `rects`.
    fn rescan(&mut self, layer: &Layer, rects: &[PixelRect]) {
        for rect in rects {
            let Some(rect) = rect.clamp_to(layer.width(), layer.height()) else {
                continue;
            };
            for y in rect.y as u32..rect.bottom() as u32 {
                self.rows[y as usize] = row_span(layer, y);
            }
        }
        self.update_bounds();
    }

    fn update_bounds(&mut self) {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (y, span) in self.rows.iter().enumerate() {
            let Some((start, end)) = *span else {
                continue;
            };
            let y = y as u32;
            bounds = Some(match bounds {
                None => (start, y, end, y + 1),
                Some((x0, y0, x1, _)) => (x0.min(start), y0, x1.max(end), y + 1),
            });
        }

        self.content_bounds =
            bounds.map(|(x0, y0, x1, y1)| PixelRect::new(x0 as i32, y0 as i32, x1 - x0, y1 - y0));
    }

    /// Content columns of row `y`, `None` for a fully transparent row.
    pub fn row_span(&self, y: u32) -> Option<RowSpan> {
        self.rows.get(y as usize).copied().flatten()
    }

    /// Get memory size in bytes.
    pub fn memory_size(&self) -> usize {
        mem::size_of::<Self>() + self.rows.len() * mem::size_of::<Option<RowSpan>>()
    }
}

fn row_span(layer: &Layer, y: u32) -> Option<RowSpan> {
    let width = layer.width() as usize;
    let start = y as usize * width;
    let row = &layer.alpha()[start..start + width];

    let first = row.iter().position(|&a| a > 0)?;
    let last = row.iter().rposition(|&a| a > 0)?;
    Some((first as u32, last as u32 + 1))
}

/// Cache state for one layer.
#[derive(Clone, Debug)]
struct LayerCacheEntry {
    stale: bool,
    last_update: Instant,
    payload: Option<LayerExtent>,
}

impl LayerCacheEntry {
    fn new() -> Self {
        Self {
            stale: true,
            last_update: Instant::now(),
            payload: None,
        }
    }
}

/// Staleness tracking and derived payloads for all live layers.
#[derive(Debug)]
pub struct LayerCache {
    entries: SecondaryMap<LayerId, LayerCacheEntry>,
    /// Whether refreshes build payloads.
    caching_enabled: bool,
    /// Payload byte budget for the cleanup sweep.
    max_size: usize,
}

impl LayerCache {
    pub fn new(caching_enabled: bool, max_size: usize) -> Self {
        Self {
            entries: SecondaryMap::new(),
            caching_enabled,
            max_size,
        }
    }

    /// Create the entry for a newly added layer. It starts stale.
    pub fn insert(&mut self, id: LayerId) {
        self.entries.insert(id, LayerCacheEntry::new());
    }

    /// Destroy the entry of a removed layer.
    pub fn remove(&mut self, id: LayerId) {
        self.entries.remove(id);
    }

    /// Unknown layers are reported stale.
    pub fn is_stale(&self, id: LayerId) -> bool {
        self.entries.get(id).map_or(true, |entry| entry.stale)
    }

    /// Mark a layer's cached state untrustworthy.
    pub fn invalidate(&mut self, id: LayerId) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.stale = true;
        }
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.stale = true;
        }
    }

    /// Refresh a layer's entry: clear staleness, bump the timestamp and,
    /// when caching is enabled, bring the extent up to date.
    ///
    /// `dirty` lists the rectangles changed since the last refresh. Only
    /// their rows are rescanned when an extent of matching size is still
    /// held; an empty list forces a full scan.
    pub fn update_layer_cache(&mut self, layer: &Layer, dirty: &[PixelRect]) {
        let caching_enabled = self.caching_enabled;
        let Some(entry) = self.entries.get_mut(layer.id()) else {
            return;
        };

        entry.stale = false;
        entry.last_update = Instant::now();
        entry.payload = if !caching_enabled {
            None
        } else {
            match entry.payload.take() {
                Some(mut extent) if !dirty.is_empty() && extent.fits(layer) => {
                    extent.rescan(layer, dirty);
                    Some(extent)
                }
                _ => Some(LayerExtent::from_layer(layer)),
            }
        };

        tracing::trace!(layer = ?layer.id(), rects = dirty.len(), "layer cache refreshed");
    }

    /// Payload of a fresh entry. Stale entries yield nothing.
    pub fn payload(&self, id: LayerId) -> Option<&LayerExtent> {
        self.entries
            .get(id)
            .filter(|entry| !entry.stale)
            .and_then(|entry| entry.payload.as_ref())
    }

    /// Total bytes held by payloads.
    pub fn payload_bytes(&self) -> usize {
        self.entries
            .values()
            .filter_map(|entry| entry.payload.as_ref())
            .map(LayerExtent::memory_size)
            .sum()
    }

    /// Release payloads not refreshed within `max_age`. See
    /// [`cleanup_caches_at`](Self::cleanup_caches_at).
    pub fn cleanup_caches(&mut self, max_age: Duration) -> usize {
        self.cleanup_caches_at(Instant::now(), max_age)
    }

    /// Release payloads whose last update is older than `max_age` as of
    /// `now`, then, if the remaining payloads still exceed the byte budget,
    /// release the oldest ones until they fit. Entries themselves are kept.
    ///
    /// Returns the number of payloads released.
    pub fn cleanup_caches_at(&mut self, now: Instant, max_age: Duration) -> usize {
        let mut released = 0;

        for (_, entry) in self.entries.iter_mut() {
            if entry.payload.is_some() && now.saturating_duration_since(entry.last_update) > max_age {
                entry.payload = None;
                released += 1;
            }
        }

        let mut current = self.payload_bytes();
        if current > self.max_size {
            tracing::warn!(bytes = current, budget = self.max_size, "layer payloads over budget");

            let mut by_age: Vec<(LayerId, Instant)> = self
                .entries
                .iter()
                .filter(|(_, entry)| entry.payload.is_some())
                .map(|(id, entry)| (id, entry.last_update))
                .collect();
            by_age.sort_by_key(|&(_, last_update)| last_update);

            for (id, _) in by_age {
                if current <= self.max_size {
                    break;
                }
                if let Some(payload) = self.entries.get_mut(id).and_then(|e| e.payload.take()) {
                    current -= payload.memory_size();
                    released += 1;
                }
            }
        }

        if released > 0 {
            tracing::info!(released, remaining_bytes = current, "released layer payloads");
        }

        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerStore;
    use common::color::Color;

    fn store_with_layer() -> (LayerStore, LayerId) {
        let mut store = LayerStore::new();
        let mut layer = Layer::new(4, 4);
        layer.fill_rect(PixelRect::new(1, 2, 2, 1), Color::RED, 255);
        let id = store.insert(layer);
        (store, id)
    }

    #[test]
    fn test_entry_lifecycle() {
        let (store, id) = store_with_layer();
        let mut cache = LayerCache::new(true, usize::MAX);

        assert!(cache.is_stale(id));
        cache.insert(id);
        assert!(cache.is_stale(id));
        assert!(cache.payload(id).is_none());

        cache.update_layer_cache(store.get(id).unwrap(), &[]);
        assert!(!cache.is_stale(id));
        let extent = cache.payload(id).unwrap();
        assert_eq!(extent.content_bounds, Some(PixelRect::new(1, 2, 2, 1)));
        assert_eq!(extent.row_span(2), Some((1, 3)));
        assert_eq!(extent.row_span(0), None);
        assert_eq!(extent.row_span(9), None);

        cache.invalidate(id);
        assert!(cache.is_stale(id));
        assert!(cache.payload(id).is_none());

        cache.remove(id);
        assert!(cache.is_stale(id));
        assert_eq!(cache.payload_bytes(), 0);
    }

    #[test]
    fn test_caching_disabled_keeps_bookkeeping() {
        let (store, id) = store_with_layer();
        let mut cache = LayerCache::new(false, usize::MAX);
        cache.insert(id);

        cache.update_layer_cache(store.get(id).unwrap(), &[]);
        assert!(!cache.is_stale(id));
        assert!(cache.payload(id).is_none());
        assert_eq!(cache.payload_bytes(), 0);
    }

    #[test]
    fn test_transparent_layer_has_no_bounds() {
        let extent = LayerExtent::from_layer(&Layer::new(3, 3));
        assert_eq!(extent.content_bounds, None);
        assert!(extent.memory_size() > mem::size_of::<LayerExtent>());
    }

    #[test]
    fn test_refresh_rescans_dirty_rows_only() {
        let mut store = LayerStore::new();
        let mut layer = Layer::new(8, 8);
        layer.fill_rect(PixelRect::new(0, 0, 8, 2), Color::RED, 255);
        let id = store.insert(layer);

        let mut cache = LayerCache::new(true, usize::MAX);
        cache.insert(id);
        cache.update_layer_cache(store.get(id).unwrap(), &[]);

        // Clear the top band and paint lower down; only the painted rows
        // are named as dirty, so the stale top rows keep their spans.
        let layer = store.get_mut(id).unwrap();
        layer.fill_rect(PixelRect::new(0, 0, 8, 2), Color::RED, 0);
        let stroke = PixelRect::new(3, 5, 2, 2);
        layer.fill_rect(stroke, Color::BLUE, 255);
        cache.invalidate(id);
        cache.update_layer_cache(store.get(id).unwrap(), &[stroke]);

        let extent = cache.payload(id).unwrap();
        assert_eq!(extent.row_span(0), Some((0, 8)));
        assert_eq!(extent.row_span(5), Some((3, 5)));
        assert_eq!(extent.content_bounds, Some(PixelRect::new(0, 0, 8, 7)));

        // Naming the cleared rows too yields the exact extent.
        let top = PixelRect::new(0, 0, 8, 2);
        cache.invalidate(id);
        cache.update_layer_cache(store.get(id).unwrap(), &[top]);
        let extent = cache.payload(id).unwrap();
        assert_eq!(extent.row_span(0), None);
        assert_eq!(extent.content_bounds, Some(stroke));
        assert_eq!(extent, &LayerExtent::from_layer(store.get(id).unwrap()));
    }

    #[test]
    fn test_cleanup_by_age() {
        let (store, id) = store_with_layer();
        let mut cache = LayerCache::new(true, usize::MAX);
        cache.insert(id);
        cache.update_layer_cache(store.get(id).unwrap(), &[]);

        let now = Instant::now();
        assert_eq!(cache.cleanup_caches_at(now, Duration::from_secs(60)), 0);
        assert!(cache.payload(id).is_some());

        let later = now + Duration::from_secs(120);
        assert_eq!(cache.cleanup_caches_at(later, Duration::from_secs(60)), 1);
        assert!(cache.payload(id).is_none());
        // The entry survives the sweep.
        assert!(!cache.is_stale(id));
    }

    #[test]
    fn test_cleanup_respects_budget() {
        let mut store = LayerStore::new();
        let ids: Vec<_> = (0..3).map(|_| store.insert(Layer::new(4, 4))).collect();
        let size = LayerExtent::from_layer(store.get(ids[0]).unwrap()).memory_size();

        // Budget allows two extents.
        let mut cache = LayerCache::new(true, size * 2);
        for &id in &ids {
            cache.insert(id);
            cache.update_layer_cache(store.get(id).unwrap(), &[]);
        }
        assert_eq!(cache.payload_bytes(), size * 3);

        let released = cache.cleanup_caches(Duration::from_secs(3600));
        assert_eq!(released, 1);
        assert_eq!(cache.payload_bytes(), size * 2);
        assert!(cache.payload(ids[0]).is_none());
        assert!(cache.payload(ids[2]).is_some());
    }
}
