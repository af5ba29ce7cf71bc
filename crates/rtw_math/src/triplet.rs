//! Three-component vector that crosses the engine boundary by value.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A position or direction in world space.
///
/// Layout is fixed: three `f64` in `x, y, z` order with 8-byte alignment,
/// matching the engine's `triplet` struct so it can be passed by value.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Triplet {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Triplet {
    pub const ZERO: Triplet = Triplet::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Triplet) -> f64 {
        DVec3::from(*self).distance(DVec3::from(other))
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<DVec3> for Triplet {
    fn from(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Triplet> for DVec3 {
    fn from(t: Triplet) -> Self {
        DVec3::new(t.x, t.y, t.z)
    }
}
