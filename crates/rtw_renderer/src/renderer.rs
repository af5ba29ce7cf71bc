//! Progressive preview rendering.
//!
//! Each pass adds one jittered sample per pixel to a running sum and
//! rewrites the whole RGBA8 frame from the average, so the frame is a valid
//! image after every pass. Rows are shaded in parallel with rayon.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rtw_math::{DVec3, Interval, Ray};

use crate::camera::RayCamera;
use crate::material::Color;
use crate::sphere::SoftScene;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Compute the color seen by a primary ray.
pub fn ray_color<R: Rng + ?Sized>(ray: &Ray, scene: &SoftScene, depth: u32, rng: &mut R) -> Color {
    // No bounces allowed, no light
    if depth == 0 {
        return Color::ZERO;
    }

    match scene.hit(ray, Interval::new(0.001, f64::INFINITY)) {
        Some(rec) => scene.material(&rec).shade(ray, &rec, rng),
        None => sky_gradient(ray.direction()),
    }
}

/// White-to-blue background by elevation.
pub fn sky_gradient(direction: DVec3) -> Color {
    let unit_direction = direction.normalize_or_zero();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f64) -> f64 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let to_byte = |c: f64| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

/// Deterministic per-row generator so passes are reproducible regardless of
/// how rayon schedules rows.
fn row_rng(seed: u64, pass: u32, row: u32) -> StdRng {
    let stream = ((pass as u64) << 32) | row as u64;
    StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ stream)
}

/// Running per-pixel sum of linear color.
#[derive(Debug)]
pub struct Accumulator {
    width: usize,
    sums: Vec<Color>,
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width as usize;
        Self {
            width,
            sums: vec![Color::ZERO; width * height as usize],
        }
    }

    /// Trace one more sample for every pixel and write the average of
    /// `pass` samples into `pixels`.
    pub fn render_pass(
        &mut self,
        camera: &RayCamera,
        scene: &SoftScene,
        max_depth: u32,
        seed: u64,
        pass: u32,
        pixels: &mut [u8],
    ) {
        let width = self.width;
        let scale = 1.0 / pass.max(1) as f64;

        self.sums
            .par_chunks_mut(width)
            .zip(pixels.par_chunks_mut(width * BYTES_PER_PIXEL))
            .enumerate()
            .for_each(|(j, (sum_row, pixel_row))| {
                let mut rng = row_rng(seed, pass, j as u32);
                for (i, (sum, rgba)) in sum_row
                    .iter_mut()
                    .zip(pixel_row.chunks_exact_mut(BYTES_PER_PIXEL))
                    .enumerate()
                {
                    let ray = camera.get_ray(i as u32, j as u32, &mut rng);
                    *sum += ray_color(&ray, scene, max_depth, &mut rng);
                    rgba.copy_from_slice(&color_to_rgba(*sum * scale));
                }
            });
    }
}
