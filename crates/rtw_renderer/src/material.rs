//! Engine-side materials and their preview response.

use rand::Rng;
use rtw_math::{DVec3, Ray};

use crate::renderer::sky_gradient;
use crate::sphere::HitRecord;

/// Color type alias (RGB values typically 0-1)
pub(crate) type Color = DVec3;

/// Direction of the key light used for diffuse preview shading.
const KEY_LIGHT: DVec3 = DVec3::new(0.4, 1.0, 0.3);

/// Fraction of the albedo visible without direct light.
const AMBIENT: f64 = 0.25;

/// A material as stored behind an engine handle.
#[derive(Debug, Clone, PartialEq)]
pub enum SoftMaterial {
    Lambertian { albedo: Color },
    Metal { albedo: Color, fuzz: f64 },
    Dielectric { ior: f64 },
}

impl SoftMaterial {
    pub fn lambertian(albedo: Color) -> Self {
        SoftMaterial::Lambertian { albedo }
    }

    /// Fuzz is clamped to [0, 1].
    pub fn metal(albedo: Color, fuzz: f64) -> Self {
        SoftMaterial::Metal {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }

    pub fn dielectric(ior: f64) -> Self {
        SoftMaterial::Dielectric { ior }
    }

    /// Color seen along `ray` at a hit, with a single environment lookup
    /// instead of recursive scattering.
    pub fn shade<R: Rng + ?Sized>(&self, ray: &Ray, rec: &HitRecord, rng: &mut R) -> Color {
        match *self {
            SoftMaterial::Lambertian { albedo } => {
                let diffuse = rec.normal.dot(KEY_LIGHT.normalize()).max(0.0);
                albedo * (AMBIENT + (1.0 - AMBIENT) * diffuse)
            }
            SoftMaterial::Metal { albedo, fuzz } => {
                let reflected = reflect(ray.direction().normalize(), rec.normal);
                let scattered = reflected + fuzz * random_unit_vector(rng);
                if scattered.dot(rec.normal) > 0.0 {
                    albedo * sky_gradient(scattered)
                } else {
                    Color::ZERO
                }
            }
            SoftMaterial::Dielectric { ior } => {
                let ratio = if rec.front_face { 1.0 / ior } else { ior };
                let unit_direction = ray.direction().normalize();
                let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

                let cannot_refract = ratio * sin_theta > 1.0;
                let direction = if cannot_refract || reflectance(cos_theta, ratio) > rng.gen::<f64>() {
                    reflect(unit_direction, rec.normal)
                } else {
                    refract(unit_direction, rec.normal, ratio)
                };
                sky_gradient(direction)
            }
        }
    }
}

/// Schlick's approximation for reflectance.
fn reflectance(cosine: f64, ior: f64) -> f64 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

#[inline]
fn reflect(v: DVec3, n: DVec3) -> DVec3 {
    v - 2.0 * v.dot(n) * n
}

#[inline]
fn refract(uv: DVec3, n: DVec3, etai_over_etat: f64) -> DVec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Uniform random direction on the unit sphere (rejection sampling).
fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> DVec3 {
    loop {
        let v = DVec3::new(
            rng.gen::<f64>() * 2.0 - 1.0,
            rng.gen::<f64>() * 2.0 - 1.0,
            rng.gen::<f64>() * 2.0 - 1.0,
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-12 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}
