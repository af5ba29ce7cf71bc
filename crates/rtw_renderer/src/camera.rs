//! Viewing basis derived from a [`CameraConfig`].

use rand::Rng;
use rtw_core::ffi::CameraConfig;
use rtw_math::{DVec3, Ray};

/// Precomputed viewport for one render.
#[derive(Debug, Clone, Copy)]
pub struct RayCamera {
    pub image_width: u32,
    pub image_height: u32,
    center: DVec3,
    pixel00_loc: DVec3,
    pixel_delta_u: DVec3,
    pixel_delta_v: DVec3,
    defocus_angle: f64,
    defocus_disk_u: DVec3,
    defocus_disk_v: DVec3,
}

impl RayCamera {
    /// `image_height` is passed in rather than derived so the engine and the
    /// caller agree on the exact buffer size.
    pub fn new(config: &CameraConfig, image_height: u32) -> Self {
        let image_width = config.image_width.max(1) as u32;
        let image_height = image_height.max(1);

        let look_from: DVec3 = config.lookfrom.into();
        let look_at: DVec3 = config.lookat.into();
        let vup: DVec3 = config.vup.into();
        let center = look_from;

        // Calculate viewport dimensions
        let theta = config.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * config.focus_dist;
        let viewport_width = viewport_height * (image_width as f64 / image_height as f64);

        // Calculate camera basis vectors
        let w = (look_from - look_at).normalize_or_zero();
        let u = vup.cross(w).normalize_or_zero();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        let pixel_delta_u = viewport_u / image_width as f64;
        let pixel_delta_v = viewport_v / image_height as f64;

        let viewport_upper_left =
            center - config.focus_dist * w - viewport_u / 2.0 - viewport_v / 2.0;
        let pixel00_loc = viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);

        let defocus_radius = config.focus_dist * (config.defocus_angle / 2.0).to_radians().tan();

        Self {
            image_width,
            image_height,
            center,
            pixel00_loc,
            pixel_delta_u,
            pixel_delta_v,
            defocus_angle: config.defocus_angle,
            defocus_disk_u: u * defocus_radius,
            defocus_disk_v: v * defocus_radius,
        }
    }

    /// Jittered ray through pixel (i, j).
    pub fn get_ray<R: Rng + ?Sized>(&self, i: u32, j: u32, rng: &mut R) -> Ray {
        let (ox, oy) = (rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5);

        let pixel_sample = self.pixel00_loc
            + (i as f64 + ox) * self.pixel_delta_u
            + (j as f64 + oy) * self.pixel_delta_v;

        let ray_origin = if self.defocus_angle <= 0.0 {
            self.center
        } else {
            self.defocus_disk_sample(rng)
        };

        Ray::new(ray_origin, pixel_sample - ray_origin)
    }

    fn defocus_disk_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec3 {
        let (px, py) = random_in_unit_disk(rng);
        self.center + px * self.defocus_disk_u + py * self.defocus_disk_v
    }
}

fn random_in_unit_disk<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    loop {
        let p = (rng.gen::<f64>() * 2.0 - 1.0, rng.gen::<f64>() * 2.0 - 1.0);
        if p.0 * p.0 + p.1 * p.1 < 1.0 {
            return p;
        }
    }
}
