//! Workload configuration.

use anyhow::Context;
use compositor::CompositorSettings;
use std::path::Path;
use std::time::Duration;

/// Configuration of a synthetic painting session.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Number of layers.
    pub layers: usize,
    /// Number of painted frames.
    pub frames: u32,
    /// Edge length of each square stroke.
    pub stroke_size: u32,
    /// Toggle a layer's visibility every this many frames (0 = never).
    pub toggle_every: u32,
    /// Run the cache cleanup sweep every this many frames (0 = never).
    pub cleanup_every: u32,
    /// Age after which the sweep releases layer payloads.
    pub cache_max_age: Duration,
    /// Drive composites through the async path.
    pub use_async: bool,
    /// Seed for stroke placement.
    pub seed: u64,
    /// Compositor settings.
    pub settings: CompositorSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            layers: 3,
            frames: 120,
            stroke_size: 12,
            toggle_every: 40,
            cleanup_every: 30,
            cache_max_age: Duration::from_millis(500),
            use_async: false,
            seed: 0x5eed,
            settings: CompositorSettings::default(),
        }
    }
}

impl RunConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set canvas size.
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set layer count.
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Set frame count.
    pub fn with_frames(mut self, frames: u32) -> Self {
        self.frames = frames;
        self
    }

    /// Set compositor settings.
    pub fn with_settings(mut self, settings: CompositorSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Load compositor settings from a JSON file. Missing fields keep their
/// defaults.
pub fn load_settings(path: &Path) -> anyhow::Result<CompositorSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings = serde_json::from_str(&text)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    Ok(settings)
}
