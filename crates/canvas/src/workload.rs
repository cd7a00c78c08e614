//! Synthetic painting session driving a compositor.

use crate::config::RunConfig;
use compositor::{
    Color, CompositeStrategy, Compositor, Layer, LayerId, PerformanceReport, PixelRect,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

fn random_color(rng: &mut StdRng) -> Color {
    Color::rgb(rng.gen(), rng.gen(), rng.gen())
}

/// Outcome of a session.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub frames: u32,
    pub full: u32,
    pub incremental: u32,
    pub background: u32,
    pub payloads_released: usize,
    /// Sum of all composite alpha values after the last frame.
    pub alpha_checksum: u64,
    pub report: PerformanceReport,
}

/// A compositor plus the layers being painted on.
pub struct Workload {
    config: RunConfig,
    compositor: Compositor,
    layers: Vec<LayerId>,
    rng: StdRng,
    strategies: Vec<CompositeStrategy>,
    payloads_released: usize,
}

impl Workload {
    /// Create the compositor and its initial layers.
    pub fn new(config: RunConfig) -> anyhow::Result<Self> {
        let mut compositor =
            Compositor::with_settings(config.width, config.height, config.settings.clone());
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut layers = Vec::with_capacity(config.layers);
        for i in 0..config.layers {
            let mut layer = Layer::new(config.width, config.height).with_name(format!("layer {i}"));
            let color = random_color(&mut rng);
            layer.fill_rect(
                PixelRect::new(0, 0, config.width / 2, config.height / 2),
                color,
                255,
            );
            layers.push(compositor.add_layer(layer)?);
        }

        Ok(Self {
            config,
            compositor,
            layers,
            rng,
            strategies: Vec::new(),
            payloads_released: 0,
        })
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Apply one frame's worth of mutations.
    fn paint_frame(&mut self, frame: u32) {
        if self.layers.is_empty() || self.config.width == 0 || self.config.height == 0 {
            return;
        }

        let id = self.layers[self.rng.gen_range(0..self.layers.len())];

        if self.config.toggle_every > 0 && frame > 0 && frame % self.config.toggle_every == 0 {
            let Some(layer) = self.compositor.layer(id) else {
                return;
            };
            let visible = !layer.is_visible();
            tracing::debug!(frame, layer = layer.name(), visible, "toggling layer");
            self.compositor.set_layer_visible(id, visible);
            return;
        }

        let half = (self.config.stroke_size / 2) as i32;
        let stroke = PixelRect::new(
            self.rng.gen_range(0..self.config.width) as i32 - half,
            self.rng.gen_range(0..self.config.height) as i32 - half,
            self.config.stroke_size,
            self.config.stroke_size,
        );
        let color = random_color(&mut self.rng);
        let alpha: u8 = self.rng.gen();

        self.compositor
            .paint_layer(id, Some(stroke), |layer| layer.fill_rect(stroke, color, alpha));
    }

    fn after_frame(&mut self, frame: u32) {
        if self.config.cleanup_every > 0 && frame % self.config.cleanup_every == 0 {
            self.payloads_released += self.compositor.cleanup_caches(self.config.cache_max_age);
        }
    }

    /// Run all frames, compositing synchronously.
    pub fn run(&mut self) -> RunSummary {
        for frame in 0..self.config.frames {
            self.paint_frame(frame);
            self.strategies.push(self.compositor.next_strategy());
            self.compositor.composite_all_layers();
            self.after_frame(frame);
        }
        self.summary()
    }

    /// Run all frames, letting background composites yield between batches.
    pub async fn run_async(&mut self) -> RunSummary {
        for frame in 0..self.config.frames {
            self.paint_frame(frame);
            self.strategies.push(self.compositor.next_strategy());
            self.compositor.composite_all_layers_async().await;
            self.after_frame(frame);
        }
        self.summary()
    }

    fn summary(&mut self) -> RunSummary {
        let count = |wanted: CompositeStrategy| {
            self.strategies.iter().filter(|&&s| s == wanted).count() as u32
        };
        let (full, incremental, background) = (
            count(CompositeStrategy::Full),
            count(CompositeStrategy::Incremental),
            count(CompositeStrategy::Background),
        );

        let alpha_checksum = self
            .compositor
            .composite_all_layers()
            .alpha
            .iter()
            .map(|&a| a as u64)
            .sum();

        RunSummary {
            frames: self.config.frames,
            full,
            incremental,
            background,
            payloads_released: self.payloads_released,
            alpha_checksum,
            report: self.compositor.performance_report(),
        }
    }
}
