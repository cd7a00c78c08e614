//! Blending and strategy execution.
//!
//! All strategies apply the same per-pixel rule, bottom to top over visible
//! layers: a layer pixel with nonzero alpha always replaces the destination
//! color, but only sets the destination alpha while that alpha is still
//! zero. The first contributing layer fixes a pixel's alpha; layers above it
//! can only change its color.

use crate::buffer::CompositeBuffer;
use crate::cache::{LayerCache, LayerExtent};
use crate::damage::DirtyRectTracker;
use crate::layer::{Layer, LayerId, LayerStore};
use common::color::Color;
use common::geometry::PixelRect;
use rayon::prelude::*;
use std::ops::Range;

/// Blend one run of layer pixels into the matching run of the destination.
#[inline]
pub fn blend_span(src_color: &[Color], src_alpha: &[u8], dst_color: &mut [Color], dst_alpha: &mut [u8]) {
    for (i, &alpha) in src_alpha.iter().enumerate() {
        if alpha == 0 {
            continue;
        }
        if dst_alpha[i] == 0 {
            dst_alpha[i] = alpha;
        }
        dst_color[i] = src_color[i];
    }
}

/// Refresh the cache entry of every stale layer before its buffers are read.
pub(crate) fn refresh_layer_caches(
    layers: &LayerStore,
    damage: &DirtyRectTracker,
    cache: &mut LayerCache,
) -> Vec<LayerId> {
    let mut refreshed = Vec::new();
    for layer in layers.paint_order() {
        if cache.is_stale(layer.id()) {
            cache.update_layer_cache(layer, damage.layer_rects(layer.id()));
            refreshed.push(layer.id());
        }
    }
    refreshed
}

/// Recompute every pixel. Rows are independent, so they run in parallel.
pub(crate) fn composite_full(layers: &LayerStore, buffer: &mut CompositeBuffer) {
    let width = buffer.width as usize;
    if width == 0 || buffer.height == 0 {
        return;
    }

    let visible: Vec<&Layer> = layers.visible().collect();
    let CompositeBuffer { color, alpha, .. } = buffer;

    color
        .par_chunks_mut(width)
        .zip(alpha.par_chunks_mut(width))
        .enumerate()
        .for_each(|(row, (dst_color, dst_alpha))| {
            dst_color.fill(Color::default());
            dst_alpha.fill(0);

            let start = row * width;
            let end = start + width;
            for layer in &visible {
                blend_span(
                    &layer.color()[start..end],
                    &layer.alpha()[start..end],
                    dst_color,
                    dst_alpha,
                );
            }
        });
}

/// Recompute the merged dirty rectangles only. Pixels outside them are left
/// untouched.
pub(crate) fn composite_incremental(
    layers: &LayerStore,
    cache: &LayerCache,
    buffer: &mut CompositeBuffer,
    merged: &[PixelRect],
) {
    let (width, height) = (buffer.width, buffer.height);

    for rect in merged {
        let Some(rect) = rect.clamp_to(width, height) else {
            continue;
        };
        composite_rect(layers, cache, buffer, rect);
    }
}

/// Clear and re-blend a single clamped rectangle.
fn composite_rect(layers: &LayerStore, cache: &LayerCache, buffer: &mut CompositeBuffer, rect: PixelRect) {
    buffer.clear_rect(rect);

    // Outside its cached extent a layer has only transparent pixels.
    let contributing: Vec<(&Layer, Option<&LayerExtent>)> = layers
        .visible()
        .map(|layer| (layer, cache.payload(layer.id())))
        .filter(|(_, extent)| match extent {
            Some(extent) => extent
                .content_bounds
                .is_some_and(|bounds| bounds.intersects(&rect)),
            None => true,
        })
        .collect();

    let stride = buffer.width as usize;
    let (left, right) = (rect.x as u32, rect.right() as u32);
    for y in rect.y as u32..rect.bottom() as u32 {
        let row = y as usize * stride;
        for (layer, extent) in &contributing {
            let (start, end) = match extent {
                Some(extent) => match extent.row_span(y) {
                    Some((start, end)) => (start.max(left), end.min(right)),
                    None => continue,
                },
                None => (left, right),
            };
            if start >= end {
                continue;
            }

            let span = row + start as usize..row + end as usize;
            blend_span(
                &layer.color()[span.clone()],
                &layer.alpha()[span.clone()],
                &mut buffer.color[span.clone()],
                &mut buffer.alpha[span],
            );
        }
    }
}

/// Recompute a run of linear pixel indices. Processing every index range
/// once gives the same bytes as [`composite_full`].
pub(crate) fn composite_range(layers: &LayerStore, buffer: &mut CompositeBuffer, range: Range<usize>) {
    let dst_color = &mut buffer.color[range.clone()];
    let dst_alpha = &mut buffer.alpha[range.clone()];
    dst_color.fill(Color::default());
    dst_alpha.fill(0);

    for layer in layers.visible() {
        blend_span(
            &layer.color()[range.clone()],
            &layer.alpha()[range.clone()],
            dst_color,
            dst_alpha,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(width: u32, height: u32, rect: PixelRect, color: Color, alpha: u8) -> Layer {
        let mut layer = Layer::new(width, height);
        layer.fill_rect(rect, color, alpha);
        layer
    }

    #[test]
    fn test_blend_span_first_alpha_top_color() {
        let mut dst_color = [Color::default(); 3];
        let mut dst_alpha = [0u8; 3];

        blend_span(&[Color::RED; 3], &[100, 0, 50], &mut dst_color, &mut dst_alpha);
        blend_span(&[Color::BLUE; 3], &[255, 255, 0], &mut dst_color, &mut dst_alpha);

        assert_eq!(dst_alpha, [100, 255, 50]);
        assert_eq!(dst_color, [Color::BLUE, Color::BLUE, Color::RED]);
    }

    #[test]
    fn test_full_skips_invisible_layers() {
        let mut layers = LayerStore::new();
        layers.insert(opaque(4, 4, PixelRect::new(0, 0, 4, 4), Color::RED, 10));
        layers.insert(opaque(4, 4, PixelRect::new(0, 0, 2, 2), Color::BLUE, 255).with_visible(false));

        let mut buffer = CompositeBuffer::new(4, 4);
        composite_full(&layers, &mut buffer);

        assert!(buffer.color.iter().all(|&c| c == Color::RED));
        assert!(buffer.alpha.iter().all(|&a| a == 10));
    }

    #[test]
    fn test_range_batches_match_full() {
        let mut layers = LayerStore::new();
        layers.insert(opaque(5, 3, PixelRect::new(1, 0, 3, 3), Color::RED, 90));
        layers.insert(opaque(5, 3, PixelRect::new(0, 1, 5, 1), Color::GREEN, 255));

        let mut full = CompositeBuffer::new(5, 3);
        composite_full(&layers, &mut full);

        let mut batched = CompositeBuffer::new(5, 3);
        batched.color.fill(Color::WHITE);
        batched.alpha.fill(7);
        for start in (0..15).step_by(4) {
            composite_range(&layers, &mut batched, start..(start + 4).min(15));
        }

        assert_eq!(full.color, batched.color);
        assert_eq!(full.alpha, batched.alpha);
    }

    #[test]
    fn test_incremental_touches_only_dirty_pixels() {
        let mut layers = LayerStore::new();
        let id = layers.insert(opaque(4, 4, PixelRect::new(0, 0, 4, 4), Color::RED, 255));
        let cache = LayerCache::new(false, 0);

        let mut buffer = CompositeBuffer::new(4, 4);
        buffer.color.fill(Color::WHITE);
        buffer.alpha.fill(1);

        layers.get_mut(id).unwrap().fill_rect(PixelRect::new(0, 0, 4, 4), Color::BLUE, 255);
        composite_incremental(&layers, &cache, &mut buffer, &[PixelRect::new(-1, -1, 2, 2)]);

        let view = buffer.view();
        assert_eq!(view.pixel(0, 0), Some((Color::BLUE, 255)));
        assert_eq!(view.pixel(1, 0), Some((Color::WHITE, 1)));
        assert_eq!(view.pixel(0, 1), Some((Color::WHITE, 1)));
    }

    #[test]
    fn test_incremental_skips_layers_outside_content_bounds() {
        let mut layers = LayerStore::new();
        let below = layers.insert(opaque(8, 8, PixelRect::new(0, 0, 8, 8), Color::RED, 255));
        let above = layers.insert(opaque(8, 8, PixelRect::new(6, 6, 2, 2), Color::BLUE, 255));

        let mut cache = LayerCache::new(true, usize::MAX);
        cache.insert(below);
        cache.insert(above);
        refresh_layer_caches(&layers, &DirtyRectTracker::new(8, 8), &mut cache);

        let mut full = CompositeBuffer::new(8, 8);
        composite_full(&layers, &mut full);

        let mut incremental = full.clone();
        incremental.clear_rect(PixelRect::new(0, 0, 8, 8));
        composite_incremental(&layers, &cache, &mut incremental, &[PixelRect::new(0, 0, 8, 8)]);

        assert_eq!(full.color, incremental.color);
        assert_eq!(full.alpha, incremental.alpha);
    }

    #[test]
    fn test_incremental_clips_to_row_extents() {
        let mut layers = LayerStore::new();
        let mut ids = Vec::new();
        for (i, color) in [Color::RED, Color::GREEN, Color::BLUE].into_iter().enumerate() {
            let mut layer = Layer::new(10, 10);
            for step in 0..4 {
                let offset = (i * 2 + step * 2) as i32;
                layer.fill_rect(PixelRect::new(offset, step as i32 * 3, 3, 2), color, 60 + i as u8 * 60);
            }
            ids.push(layers.insert(layer));
        }

        let mut cache = LayerCache::new(true, usize::MAX);
        for &id in &ids {
            cache.insert(id);
        }
        refresh_layer_caches(&layers, &DirtyRectTracker::new(10, 10), &mut cache);

        let mut full = CompositeBuffer::new(10, 10);
        composite_full(&layers, &mut full);

        let mut incremental = full.clone();
        let rect = PixelRect::new(3, 1, 5, 7);
        incremental.clear_rect(rect);
        composite_incremental(&layers, &cache, &mut incremental, &[rect]);

        assert_eq!(full.color, incremental.color);
        assert_eq!(full.alpha, incremental.alpha);
    }
}
