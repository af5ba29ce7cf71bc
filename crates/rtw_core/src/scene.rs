//! Scenes: an engine scene handle plus the spheres added to it.

use std::sync::Arc;

use rtw_math::Triplet;

use crate::engine::{Engine, RawHandle};
use crate::error::{RenderError, RenderResult};
use crate::lifecycle::{same_engine, LifecycleState, OwnedHandle, ResourceKind};
use crate::material::{MaterialId, MaterialRegistry};

/// A sphere as recorded on the Rust side. The material is borrowed by id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Triplet,
    pub radius: f64,
    pub material: MaterialId,
}

/// An engine scene.
///
/// The scene never owns materials: it keeps their ids and checks they are
/// still alive in the registry before every render.
#[derive(Debug)]
pub struct Scene {
    handle: OwnedHandle,
    spheres: Vec<Sphere>,
}

impl Scene {
    pub(crate) fn create(engine: Arc<dyn Engine>) -> RenderResult<Self> {
        let ptr = engine.create_scene();
        let handle = OwnedHandle::adopt(engine, ResourceKind::Scene, ptr)?;
        Ok(Self {
            handle,
            spheres: Vec::new(),
        })
    }

    /// Append a sphere using a material from `materials`.
    pub fn add_sphere(
        &mut self,
        materials: &MaterialRegistry,
        center: Triplet,
        radius: f64,
        material: MaterialId,
    ) -> RenderResult<()> {
        let scene = self.handle.get()?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RenderError::invalid("radius", format!("must be finite and > 0, got {}", radius)));
        }
        if !center.is_finite() {
            return Err(RenderError::invalid("center", format!("components must be finite, got {:?}", center)));
        }
        if !same_engine(self.handle.engine(), materials.engine()) {
            return Err(RenderError::ForeignResource {
                resource: ResourceKind::Material,
            });
        }
        let raw_material = materials.raw(material)?;

        // SAFETY: both handles were just checked live and come from the same
        // engine; `materials` is borrowed across the call.
        unsafe {
            self.handle.engine().add_sphere(scene, center, radius, raw_material);
        }
        log::trace!("sphere #{} at {:?} r={}", self.spheres.len(), center, radius);
        self.spheres.push(Sphere {
            center,
            radius,
            material,
        });
        Ok(())
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    pub fn state(&self) -> LifecycleState {
        self.handle.state()
    }

    /// Release the engine scene. Repeated calls are no-ops.
    ///
    /// Returns `true` if this call released the engine resource.
    pub fn dispose(&mut self) -> bool {
        self.handle.dispose()
    }

    /// Ensure the scene and every material it references are still live.
    pub fn check_live(&self, materials: &MaterialRegistry) -> RenderResult<()> {
        self.handle.get()?;
        if !same_engine(self.handle.engine(), materials.engine()) {
            return Err(RenderError::ForeignResource {
                resource: ResourceKind::Material,
            });
        }
        for (index, sphere) in self.spheres.iter().enumerate() {
            if let Err(err) = materials.get(sphere.material) {
                log::warn!("sphere #{} references a dead material: {}", index, err);
                return Err(err);
            }
        }
        Ok(())
    }

    pub(crate) fn raw(&self) -> RenderResult<RawHandle> {
        self.handle.get()
    }

    pub(crate) fn engine(&self) -> &Arc<dyn Engine> {
        self.handle.engine()
    }
}
