// Re-export glam for convenience
pub use glam::*;

// RTW math types
mod color;
mod interval;
mod ray;
mod triplet;

pub use color::Color;
pub use interval::Interval;
pub use ray::Ray;
pub use triplet::Triplet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triplet_into_dvec3() {
        let v: DVec3 = Triplet::new(1.0, 2.0, 3.0).into();
        assert_eq!(v, DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_color_into_dvec3() {
        let c: DVec3 = Color::new(0.25, 0.5, 0.75).into();
        assert_eq!(c, DVec3::new(0.25, 0.5, 0.75));
    }
}
