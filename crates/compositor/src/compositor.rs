//! Main compositor implementation.

use crate::buffer::{CompositeBuffer, CompositeView};
use crate::cache::{LayerCache, LayerExtent};
use crate::damage::DirtyRectTracker;
use crate::job::CompositeJob;
use crate::layer::{Layer, LayerId, LayerStore};
use crate::settings::CompositorSettings;
use crate::stats::{CompositorStats, PerformanceReport};
use crate::strategy::{select_strategy, CompositeStrategy, StrategyInput};
use common::error::{CompositorError, CompositorResult};
use common::geometry::PixelRect;
use std::time::Duration;

/// Owns the layers, the caches and the composite buffer of one canvas.
///
/// Every mutating operation takes `&mut self`, and a running
/// [`CompositeJob`] holds that borrow until it is finished or dropped, so
/// no mutation can interleave with a composite.
#[derive(Debug)]
pub struct Compositor {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) layers: LayerStore,
    pub(crate) damage: DirtyRectTracker,
    pub(crate) cache: LayerCache,
    pub(crate) buffer: CompositeBuffer,
    pub(crate) settings: CompositorSettings,
    pub(crate) stats: CompositorStats,
}

impl Compositor {
    /// Create a compositor with default settings.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_settings(width, height, CompositorSettings::default())
    }

    pub fn with_settings(width: u32, height: u32, settings: CompositorSettings) -> Self {
        Self {
            width,
            height,
            layers: LayerStore::new(),
            damage: DirtyRectTracker::new(width, height),
            cache: LayerCache::new(settings.enable_layer_caching, settings.max_cache_size),
            buffer: CompositeBuffer::new(width, height),
            settings,
            stats: CompositorStats::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub fn stats(&self) -> &CompositorStats {
        &self.stats
    }

    pub fn performance_report(&self) -> PerformanceReport {
        self.stats.report()
    }

    /// Whether the next composite would be answered from the buffer.
    pub fn is_fresh(&self) -> bool {
        !self.buffer.stale
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Layer IDs in paint order (bottom first).
    pub fn layer_ids(&self) -> &[LayerId] {
        self.layers.ids()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Dirty rectangles waiting for the next composite.
    pub fn pending_dirty_rects(&self) -> &[PixelRect] {
        self.damage.pending()
    }

    /// Dirty rectangles of one layer since its cache entry was refreshed.
    pub fn layer_dirty_rects(&self, id: LayerId) -> &[PixelRect] {
        self.damage.layer_rects(id)
    }

    /// Derived payload of a layer, present once the layer has been
    /// composited with layer caching enabled and until the cleanup sweep
    /// releases it.
    pub fn layer_extent(&self, id: LayerId) -> Option<&LayerExtent> {
        self.cache.payload(id)
    }

    /// Add a layer on top of the stack.
    pub fn add_layer(&mut self, layer: Layer) -> CompositorResult<LayerId> {
        if layer.width() != self.width || layer.height() != self.height {
            return Err(CompositorError::LayerSizeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: layer.width(),
                actual_height: layer.height(),
            });
        }

        let id = self.layers.insert(layer);
        self.cache.insert(id);
        self.damage.mark_dirty(None, Some(id));
        self.buffer.stale = true;

        tracing::trace!(layer = ?id, count = self.layers.len(), "layer added");
        Ok(id)
    }

    /// Remove a layer. Unknown IDs are ignored.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let Some(layer) = self.layers.remove(id) else {
            tracing::trace!(layer = ?id, "remove of unknown layer ignored");
            return None;
        };

        self.cache.remove(id);
        self.damage.forget_layer(id);
        self.damage.mark_dirty(None, None);
        self.buffer.stale = true;

        tracing::trace!(layer = ?id, count = self.layers.len(), "layer removed");
        Some(layer)
    }

    /// Invalidate part of a layer. `None` invalidates the whole layer.
    /// Unknown IDs are ignored.
    pub fn mark_layer_dirty(&mut self, id: LayerId, rect: Option<PixelRect>) {
        if !self.layers.contains(id) {
            tracing::trace!(layer = ?id, "dirty mark on unknown layer ignored");
            return;
        }

        self.damage.mark_dirty(rect, Some(id));
        self.cache.invalidate(id);
        self.buffer.stale = true;
    }

    /// Mutate a layer and invalidate `rect` (or the whole layer) in one step.
    pub fn paint_layer<R>(
        &mut self,
        id: LayerId,
        rect: Option<PixelRect>,
        paint: impl FnOnce(&mut Layer) -> R,
    ) -> Option<R> {
        let result = paint(self.layers.get_mut(id)?);
        self.mark_layer_dirty(id, rect);
        Some(result)
    }

    /// Show or hide a layer.
    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) {
        let Some(layer) = self.layers.get_mut(id) else {
            return;
        };
        if layer.is_visible() == visible {
            return;
        }
        layer.set_visible(visible);
        self.mark_layer_dirty(id, None);
    }

    /// Resize the canvas. Layers keep their overlapping content; the
    /// composite buffer and all staleness bookkeeping are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(
            from_width = self.width,
            from_height = self.height,
            width,
            height,
            "resizing canvas"
        );

        self.width = width;
        self.height = height;
        self.layers.resize_all(width, height);
        self.buffer = CompositeBuffer::new(width, height);
        self.damage.reset(width, height);
        self.damage.mark_dirty(None, None);
        self.cache.invalidate_all();
    }

    /// Strategy the next recompute would use.
    pub fn next_strategy(&self) -> CompositeStrategy {
        let input = StrategyInput {
            canvas_area: self.width as u64 * self.height as u64,
            layer_count: self.layers.len(),
            dirty_area: self.damage.calculate_dirty_area(),
            pending_rects: self.damage.pending().len(),
        };

        match select_strategy(&input, &self.settings) {
            // Incremental only patches pending rectangles, which is wrong
            // until a full pass has completed on this buffer.
            CompositeStrategy::Incremental if !self.buffer.complete => CompositeStrategy::Full,
            strategy => strategy,
        }
    }

    /// Start a composite that a caller-owned scheduler can drive step by
    /// step.
    pub fn begin_composite(&mut self) -> CompositeJob<'_> {
        CompositeJob::new(self)
    }

    /// Composite all visible layers, returning the fresh buffer.
    ///
    /// A fresh buffer is returned as-is. Background composites run to
    /// completion without yielding.
    pub fn composite_all_layers(&mut self) -> CompositeView<'_> {
        self.begin_composite().finish()
    }

    /// Like [`composite_all_layers`](Self::composite_all_layers), but a
    /// background composite yields to the async runtime between batches.
    pub async fn composite_all_layers_async(&mut self) -> CompositeView<'_> {
        self.begin_composite().finish_async().await
    }

    /// Release cached layer payloads older than `max_age`, then trim to the
    /// configured byte budget. Returns the number of payloads released.
    pub fn cleanup_caches(&mut self, max_age: Duration) -> usize {
        self.cache.cleanup_caches(max_age)
    }
}
