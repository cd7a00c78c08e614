//! Compositor settings.

use serde::{Deserialize, Serialize};

/// Compositor settings, fixed for the lifetime of a compositor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorSettings {
    /// Allow the incremental strategy. When false every recompute is full
    /// or background.
    pub enable_incremental_compositing: bool,
    /// Build derived per-layer payloads. Staleness bookkeeping happens
    /// regardless of this flag.
    pub enable_layer_caching: bool,
    /// Payload byte budget consulted by the cache cleanup sweep.
    pub max_cache_size: usize,
    /// Canvas area in pixels above which the background strategy is used.
    pub background_composite_threshold: u64,
    /// Dirty-area to canvas-area ratio at or above which incremental
    /// compositing is abandoned.
    pub dirty_rect_merge_threshold: f64,
    /// Pixels processed per background step.
    pub background_batch_size: usize,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            enable_incremental_compositing: true,
            enable_layer_caching: true,
            max_cache_size: 64 * 1024 * 1024,
            background_composite_threshold: 250_000,
            dirty_rect_merge_threshold: 0.3,
            background_batch_size: 16_384,
        }
    }
}

impl CompositorSettings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_incremental(mut self, enabled: bool) -> Self {
        self.enable_incremental_compositing = enabled;
        self
    }

    pub fn with_layer_caching(mut self, enabled: bool) -> Self {
        self.enable_layer_caching = enabled;
        self
    }

    pub fn with_max_cache_size(mut self, bytes: usize) -> Self {
        self.max_cache_size = bytes;
        self
    }

    pub fn with_background_threshold(mut self, area: u64) -> Self {
        self.background_composite_threshold = area;
        self
    }

    pub fn with_merge_threshold(mut self, ratio: f64) -> Self {
        self.dirty_rect_merge_threshold = ratio;
        self
    }

    /// Set the background batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, pixels: usize) -> Self {
        self.background_batch_size = pixels;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CompositorSettings::default();
        assert!(settings.enable_incremental_compositing);
        assert!(settings.enable_layer_caching);
        assert_eq!(settings.background_composite_threshold, 250_000);
    }

    #[test]
    fn test_partial_json() {
        let settings: CompositorSettings =
            serde_json::from_str(r#"{ "enable_incremental_compositing": false, "background_batch_size": 64 }"#)
                .unwrap();
        assert!(!settings.enable_incremental_compositing);
        assert_eq!(settings.background_batch_size, 64);
        assert_eq!(settings.dirty_rect_merge_threshold, 0.3);
    }
}
