use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Linear RGB color, components nominally in [0, 1].
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Same value in all three channels.
    pub const fn gray(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Component-wise product.
    pub fn modulate(self, other: Color) -> Color {
        Color::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl From<Color> for DVec3 {
    fn from(c: Color) -> Self {
        DVec3::new(c.r, c.g, c.b)
    }
}

impl From<DVec3> for Color {
    fn from(v: DVec3) -> Self {
        Color::new(v.x, v.y, v.z)
    }
}
