//! Color plane entries.
//!
//! Layers and the composite buffer keep color and alpha in separate planes,
//! so a [`Color`] carries only the three color channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB color with 8-bit components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack with an alpha value from the alpha plane into an RGBA quad.
    #[inline]
    pub fn with_alpha(&self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_alpha() {
        assert_eq!(Color::rgb(1, 2, 3).with_alpha(200), [1, 2, 3, 200]);
        assert_eq!(format!("{:?}", Color::BLUE), "#0000ff");
    }
}
