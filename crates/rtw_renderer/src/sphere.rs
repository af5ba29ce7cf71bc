//! Sphere primitive and the flat scene list the engine keeps behind a
//! scene handle.

use std::sync::Arc;

use rtw_math::{DVec3, Interval, Ray};

use crate::material::SoftMaterial;

/// Hit record for ray-sphere intersections.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    pub t: f64,
    pub p: DVec3,
    /// Always points against the incoming ray.
    pub normal: DVec3,
    pub front_face: bool,
    /// Index of the sphere in its scene.
    pub sphere: usize,
}

impl HitRecord {
    fn set_face_normal(&mut self, ray: &Ray, outward_normal: DVec3) {
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// A sphere with a shared reference to its material, so the material
/// outlives its own handle while any scene still uses it.
#[derive(Debug, Clone)]
pub struct SoftSphere {
    pub center: DVec3,
    pub radius: f64,
    pub material: Arc<SoftMaterial>,
}

impl SoftSphere {
    pub fn new(center: DVec3, radius: f64, material: Arc<SoftMaterial>) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
        }
    }

    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<(f64, DVec3)> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let p = ray.at(root);
        Some((root, (p - self.center) / self.radius))
    }
}

/// Everything behind a scene handle.
#[derive(Debug, Default)]
pub struct SoftScene {
    pub spheres: Vec<SoftSphere>,
}

impl SoftScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sphere: SoftSphere) {
        self.spheres.push(sphere);
    }

    /// Closest hit over all spheres.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let mut closest: Option<HitRecord> = None;
        let mut closest_so_far = ray_t.max;

        for (index, sphere) in self.spheres.iter().enumerate() {
            if let Some((t, outward_normal)) = sphere.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = t;
                let mut rec = HitRecord {
                    t,
                    p: ray.at(t),
                    normal: outward_normal,
                    front_face: true,
                    sphere: index,
                };
                rec.set_face_normal(ray, outward_normal);
                closest = Some(rec);
            }
        }

        closest
    }

    pub fn material(&self, rec: &HitRecord) -> &SoftMaterial {
        &self.spheres[rec.sphere].material
    }
}
