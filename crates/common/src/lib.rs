//! Common types shared by the compositor crates.

pub mod color;
pub mod geometry;
pub mod error;

pub use color::Color;
pub use geometry::PixelRect;
pub use error::{CompositorError, CompositorResult};
