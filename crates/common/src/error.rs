//! Common error types.

use thiserror::Error;

/// Error type for compositor boundary checks.
///
/// Ordinary misuse (unknown layer ids, out-of-bounds rectangles) is tolerated
/// silently; only broken buffer invariants are reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositorError {
    #[error("layer is {actual_width}x{actual_height}, canvas is {expected_width}x{expected_height}")]
    LayerSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("{plane} plane has {actual} entries, expected {expected}")]
    PlaneLength {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type CompositorResult<T> = Result<T, CompositorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CompositorError::LayerSizeMismatch {
            expected_width: 8,
            expected_height: 8,
            actual_width: 8,
            actual_height: 7,
        };
        assert_eq!(err.to_string(), "layer is 8x7, canvas is 8x8");

        let err = CompositorError::PlaneLength {
            plane: "alpha",
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "alpha plane has 3 entries, expected 4");
    }
}
