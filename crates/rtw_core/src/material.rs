//! Materials and the registry that owns them.
//!
//! Every [`Material`] owns one engine handle. Materials live in a
//! [`MaterialRegistry`] arena and are referred to by [`MaterialId`]: a slot
//! index plus a generation, so an id that outlives its material is detected
//! as stale instead of reaching the engine as a dangling pointer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rtw_math::Color;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, RawHandle};
use crate::error::{RenderError, RenderResult};
use crate::lifecycle::{LifecycleState, OwnedHandle, ResourceKind};

/// Surface description passed to the engine at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialKind {
    /// Diffuse surface.
    Lambertian { color: Color },
    /// Reflective surface. `fuzz` 0 is a perfect mirror.
    Metal { color: Color, fuzz: f64 },
    /// Refractive surface such as glass (1.5) or water (1.33).
    Dielectric { refractive_index: f64 },
}

impl MaterialKind {
    /// Reject values the engine has no defined behaviour for.
    pub fn validate(&self) -> RenderResult<()> {
        match *self {
            MaterialKind::Lambertian { color } => validate_color(color),
            MaterialKind::Metal { color, fuzz } => {
                validate_color(color)?;
                if !fuzz.is_finite() || fuzz < 0.0 {
                    return Err(RenderError::invalid("fuzz", format!("must be finite and >= 0, got {}", fuzz)));
                }
                Ok(())
            }
            MaterialKind::Dielectric { refractive_index } => {
                if !refractive_index.is_finite() || refractive_index <= 0.0 {
                    return Err(RenderError::invalid(
                        "refractive_index",
                        format!("must be finite and > 0, got {}", refractive_index),
                    ));
                }
                Ok(())
            }
        }
    }

    fn construct(&self, engine: &dyn Engine) -> crate::ffi::RawPtr {
        match *self {
            MaterialKind::Lambertian { color } => engine.create_lambertian(color.r, color.g, color.b),
            MaterialKind::Metal { color, fuzz } => engine.create_metal(color.r, color.g, color.b, fuzz),
            MaterialKind::Dielectric { refractive_index } => engine.create_dielectric(refractive_index),
        }
    }
}

fn validate_color(color: Color) -> RenderResult<()> {
    if color.r.is_finite() && color.g.is_finite() && color.b.is_finite() {
        Ok(())
    } else {
        Err(RenderError::invalid("color", format!("components must be finite, got {:?}", color)))
    }
}

/// An engine material. Immutable after construction.
#[derive(Debug)]
pub struct Material {
    kind: MaterialKind,
    handle: OwnedHandle,
}

impl Material {
    fn create(engine: Arc<dyn Engine>, kind: MaterialKind) -> RenderResult<Self> {
        kind.validate()?;
        let ptr = kind.construct(engine.as_ref());
        let handle = OwnedHandle::adopt(engine, ResourceKind::Material, ptr)?;
        Ok(Self { kind, handle })
    }

    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    pub fn state(&self) -> LifecycleState {
        self.handle.state()
    }

    pub(crate) fn raw(&self) -> RenderResult<RawHandle> {
        self.handle.get()
    }

    fn dispose(&mut self) -> bool {
        self.handle.dispose()
    }
}

/// Stable reference to a material inside one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId {
    registry: u32,
    index: u32,
    generation: u32,
}

impl MaterialId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

struct Slot {
    generation: u32,
    material: Option<Material>,
}

static NEXT_REGISTRY: AtomicU32 = AtomicU32::new(1);

/// Owns every material created through it.
///
/// Disposing a material bumps its slot generation, so all ids handed out for
/// it become stale. Slots are reused through a free list.
pub struct MaterialRegistry {
    id: u32,
    engine: Arc<dyn Engine>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl MaterialRegistry {
    pub(crate) fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            engine,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn create_lambertian(&mut self, color: Color) -> RenderResult<MaterialId> {
        self.create(MaterialKind::Lambertian { color })
    }

    pub fn create_metal(&mut self, color: Color, fuzz: f64) -> RenderResult<MaterialId> {
        self.create(MaterialKind::Metal { color, fuzz })
    }

    pub fn create_dielectric(&mut self, refractive_index: f64) -> RenderResult<MaterialId> {
        self.create(MaterialKind::Dielectric { refractive_index })
    }

    /// Create a material of any kind.
    pub fn create(&mut self, kind: MaterialKind) -> RenderResult<MaterialId> {
        let material = Material::create(self.engine.clone(), kind)?;

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].material = Some(material);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    material: Some(material),
                });
                (self.slots.len() - 1) as u32
            }
        };

        Ok(MaterialId {
            registry: self.id,
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Release a material. Repeated or stale disposals are no-ops.
    ///
    /// Returns `true` if this call released the engine resource.
    pub fn dispose(&mut self, id: MaterialId) -> bool {
        if id.registry != self.id {
            log::warn!("ignoring dispose of material from registry {} in registry {}", id.registry, self.id);
            return false;
        }
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation {
            return false;
        }
        let Some(mut material) = slot.material.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        material.dispose()
    }

    /// Release every material still alive.
    pub fn dispose_all(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(mut material) = slot.material.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                if material.dispose() {
                    released += 1;
                }
            }
        }
        released
    }

    /// Look up a live material.
    pub fn get(&self, id: MaterialId) -> RenderResult<&Material> {
        if id.registry != self.id {
            return Err(RenderError::ForeignResource {
                resource: ResourceKind::Material,
            });
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.material.as_ref())
            .ok_or(RenderError::UseAfterDispose {
                resource: ResourceKind::Material,
            })
    }

    pub fn state(&self, id: MaterialId) -> LifecycleState {
        match self.get(id) {
            Ok(material) => material.state(),
            Err(_) => LifecycleState::Disposed,
        }
    }

    pub fn is_active(&self, id: MaterialId) -> bool {
        self.state(id) == LifecycleState::Active
    }

    /// Number of live materials.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.material.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn raw(&self, id: MaterialId) -> RenderResult<RawHandle> {
        self.get(id)?.raw()
    }

    pub(crate) fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }
}

impl std::fmt::Debug for MaterialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialRegistry")
            .field("id", &self.id)
            .field("engine", &self.engine.name())
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;

    fn registry() -> (Arc<MockEngine>, MaterialRegistry) {
        let engine = Arc::new(MockEngine::new());
        let registry = MaterialRegistry::new(engine.clone());
        (engine, registry)
    }

    #[test]
    fn test_create_each_variant() {
        let (engine, mut materials) = registry();

        let a = materials.create_lambertian(Color::gray(0.5)).unwrap();
        let b = materials.create_metal(Color::new(0.7, 0.6, 0.5), 0.0).unwrap();
        let c = materials.create_dielectric(1.5).unwrap();

        assert_eq!(materials.len(), 3);
        assert_eq!(engine.calls().materials_created, 3);
        assert!(matches!(materials.get(b).unwrap().kind(), MaterialKind::Metal { fuzz, .. } if *fuzz == 0.0));
        assert!(materials.is_active(a) && materials.is_active(c));
    }

    #[test]
    fn test_double_dispose_releases_once_for_every_variant() {
        let (engine, mut materials) = registry();
        let ids = [
            materials.create_lambertian(Color::gray(0.5)).unwrap(),
            materials.create_metal(Color::gray(0.8), 0.3).unwrap(),
            materials.create_dielectric(1.5).unwrap(),
        ];

        for id in ids {
            assert!(materials.dispose(id));
            assert!(!materials.dispose(id));
            assert_eq!(materials.state(id), LifecycleState::Disposed);
        }

        assert_eq!(engine.calls().materials_destroyed, 3);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_get_after_dispose_is_use_after_dispose() {
        let (_engine, mut materials) = registry();
        let id = materials.create_lambertian(Color::gray(0.5)).unwrap();
        materials.dispose(id);

        assert!(matches!(
            materials.get(id),
            Err(RenderError::UseAfterDispose {
                resource: ResourceKind::Material
            })
        ));
    }

    #[test]
    fn test_stale_id_after_slot_reuse() {
        let (_engine, mut materials) = registry();
        let old = materials.create_lambertian(Color::gray(0.1)).unwrap();
        materials.dispose(old);
        let new = materials.create_lambertian(Color::gray(0.9)).unwrap();

        assert_eq!(old.index(), new.index());
        assert!(materials.get(old).is_err());
        assert!(materials.get(new).is_ok());
        // Disposing through the stale id must not touch the new material.
        assert!(!materials.dispose(old));
        assert!(materials.is_active(new));
    }

    #[test]
    fn test_foreign_id_rejected() {
        let (_engine, mut first) = registry();
        let (_engine2, second) = registry();
        let id = first.create_dielectric(1.5).unwrap();

        assert!(matches!(
            second.get(id),
            Err(RenderError::ForeignResource {
                resource: ResourceKind::Material
            })
        ));
    }

    #[test]
    fn test_allocation_failure() {
        let (engine, mut materials) = registry();
        engine.fail_allocations(true);

        let err = materials.create_lambertian(Color::gray(0.5)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::AllocationFailure {
                resource: ResourceKind::Material
            }
        ));
        assert!(materials.is_empty());
    }

    #[test]
    fn test_invalid_parameters_never_reach_engine() {
        let (engine, mut materials) = registry();

        assert!(matches!(
            materials.create_metal(Color::gray(0.5), -0.1),
            Err(RenderError::InvalidParameter { name: "fuzz", .. })
        ));
        assert!(matches!(
            materials.create_dielectric(0.0),
            Err(RenderError::InvalidParameter {
                name: "refractive_index",
                ..
            })
        ));
        assert!(matches!(
            materials.create_lambertian(Color::new(f64::NAN, 0.0, 0.0)),
            Err(RenderError::InvalidParameter { name: "color", .. })
        ));
        assert_eq!(engine.calls().materials_created, 0);
    }

    #[test]
    fn test_drop_registry_releases_everything() {
        let engine = Arc::new(MockEngine::new());
        {
            let mut materials = MaterialRegistry::new(engine.clone());
            materials.create_lambertian(Color::gray(0.5)).unwrap();
            materials.create_dielectric(1.5).unwrap();
        }
        assert_eq!(engine.calls().materials_destroyed, 2);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_dispose_all() {
        let (engine, mut materials) = registry();
        let a = materials.create_lambertian(Color::gray(0.5)).unwrap();
        materials.create_dielectric(1.5).unwrap();
        materials.dispose(a);

        assert_eq!(materials.dispose_all(), 1);
        assert!(materials.is_empty());
        assert_eq!(engine.calls().materials_destroyed, 2);
    }

    #[test]
    fn test_material_kind_json() {
        let kind: MaterialKind = serde_json::from_str(r#"{"type":"metal","color":{"r":0.7,"g":0.6,"b":0.5},"fuzz":0.0}"#).unwrap();
        assert_eq!(
            kind,
            MaterialKind::Metal {
                color: Color::new(0.7, 0.6, 0.5),
                fuzz: 0.0
            }
        );
    }
}
