//! Incremental raster layer compositor.
//!
//! The compositor blends an ordered stack of canvas-sized layers into one
//! output raster and keeps that raster cached between requests:
//! - layer mutations record dirty rectangles and mark the output stale
//! - a composite request on a fresh buffer returns it untouched
//! - a stale buffer is recomputed fully, incrementally over the merged dirty
//!   rectangles, or in resumable background batches for large canvases

pub mod buffer;
pub mod cache;
pub mod compositor;
pub mod damage;
pub mod engine;
pub mod job;
pub mod layer;
pub mod settings;
pub mod stats;
pub mod strategy;

pub use self::compositor::Compositor;
pub use buffer::CompositeView;
pub use cache::LayerExtent;
pub use damage::merge_rectangles;
pub use job::{CompositeJob, StepState};
pub use layer::{Layer, LayerId, LayerStore};
pub use settings::CompositorSettings;
pub use stats::{CompositorStats, PerformanceReport};
pub use strategy::{select_strategy, CompositeStrategy, StrategyInput};

pub use common::{Color, CompositorError, CompositorResult, PixelRect};
