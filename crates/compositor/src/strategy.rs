//! Compositing strategy selection.

use crate::settings::CompositorSettings;
use serde::Serialize;
use std::fmt;

/// Layer count above which large canvases composite in the background.
const BACKGROUND_MIN_LAYERS: usize = 3;

/// How a stale composite buffer is recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CompositeStrategy {
    /// Clear and blend the whole canvas in one pass.
    Full,
    /// Clear and blend only the merged dirty rectangles.
    Incremental,
    /// Same result as [`Full`](Self::Full), in resumable pixel batches.
    Background,
}

impl fmt::Display for CompositeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositeStrategy::Full => "full",
            CompositeStrategy::Incremental => "incremental",
            CompositeStrategy::Background => "background",
        };
        f.write_str(name)
    }
}

/// Inputs to [`select_strategy`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategyInput {
    /// Canvas width times height.
    pub canvas_area: u64,
    /// Number of layers, visible or not.
    pub layer_count: usize,
    /// Result of the dirty-area heuristic.
    pub dirty_area: u64,
    /// Number of pending dirty rectangles.
    pub pending_rects: usize,
}

/// Pick a strategy. The first matching rule wins:
///
/// 1. a canvas larger than the background threshold with more than three
///    layers composites in the background, regardless of damage;
/// 2. localized damage below the merge threshold composites incrementally;
/// 3. everything else is a full composite.
pub fn select_strategy(input: &StrategyInput, settings: &CompositorSettings) -> CompositeStrategy {
    if input.canvas_area > settings.background_composite_threshold
        && input.layer_count > BACKGROUND_MIN_LAYERS
    {
        return CompositeStrategy::Background;
    }

    if settings.enable_incremental_compositing && input.pending_rects > 0 && input.canvas_area > 0 {
        let ratio = input.dirty_area as f64 / input.canvas_area as f64;
        if ratio < settings.dirty_rect_merge_threshold {
            return CompositeStrategy::Incremental;
        }
    }

    CompositeStrategy::Full
}
