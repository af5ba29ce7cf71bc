//! [`SoftwareEngine`]: the boundary implemented in-process.
//!
//! Materials live behind `Box<Arc<SoftMaterial>>` handles and scenes behind
//! `Box<SoftScene>` handles. Every handle address is tracked, so a stale or
//! mistyped handle is logged and ignored instead of dereferenced.

use std::collections::HashSet;
use std::ffi::{c_void, CStr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{debug, error, trace, warn};
use rtw_core::ffi::{CameraConfig, RawPtr, RenderCallback, SAVE_INVALID_ARGUMENT, SAVE_IO_ERROR, SAVE_OK};
use rtw_core::{image_height, Engine, RawHandle};
use rtw_math::{DVec3, Triplet};

use crate::camera::RayCamera;
use crate::material::SoftMaterial;
use crate::renderer::{Accumulator, BYTES_PER_PIXEL};
use crate::sphere::{SoftScene, SoftSphere};

/// Seed used unless [`SoftwareEngine::with_seed`] overrides it.
pub const DEFAULT_SEED: u64 = 0x5EED_0F_2A7;

/// Counters of boundary traffic, for leak and double-free checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub materials_created: usize,
    pub materials_destroyed: usize,
    pub scenes_created: usize,
    pub scenes_destroyed: usize,
    pub spheres_added: usize,
    pub renders: usize,
    pub images_saved: usize,
    /// Calls that named a handle this engine does not consider live.
    pub invalid_handle_calls: usize,
    /// Constructor calls refused by the allocation limit.
    pub refused_allocations: usize,
}

impl EngineStats {
    pub fn live_materials(&self) -> usize {
        self.materials_created - self.materials_destroyed
    }

    pub fn live_scenes(&self) -> usize {
        self.scenes_created - self.scenes_destroyed
    }
}

#[derive(Debug, Default)]
struct HandleTable {
    materials: HashSet<usize>,
    scenes: HashSet<usize>,
    stats: EngineStats,
}

/// CPU engine with progressive passes.
#[derive(Debug)]
pub struct SoftwareEngine {
    seed: u64,
    allocation_limit: Option<usize>,
    table: Mutex<HandleTable>,
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareEngine {
    pub fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            allocation_limit: None,
            table: Mutex::new(HandleTable::default()),
        }
    }

    /// Seed for sample jitter; equal seeds give byte-identical frames.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Refuse (return null from) constructors once `limit` materials and
    /// scenes have been created in total.
    pub fn with_allocation_limit(mut self, limit: usize) -> Self {
        self.allocation_limit = Some(limit);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stats(&self) -> EngineStats {
        self.table().stats
    }

    fn table(&self) -> MutexGuard<'_, HandleTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve an allocation slot, or refuse it at the limit.
    fn admit(&self, table: &mut HandleTable) -> bool {
        let created = table.stats.materials_created + table.stats.scenes_created;
        if self.allocation_limit.is_some_and(|limit| created >= limit) {
            table.stats.refused_allocations += 1;
            warn!("allocation limit reached ({created} handles), refusing");
            return false;
        }
        true
    }

    fn allocate_material(&self, material: SoftMaterial) -> RawPtr {
        let mut table = self.table();
        if !self.admit(&mut table) {
            return std::ptr::null_mut();
        }
        trace!("create material {material:?}");
        let ptr = Box::into_raw(Box::new(Arc::new(material))).cast::<c_void>();
        table.materials.insert(ptr as usize);
        table.stats.materials_created += 1;
        ptr
    }
}

impl Engine for SoftwareEngine {
    fn name(&self) -> &'static str {
        "software"
    }

    fn create_lambertian(&self, r: f64, g: f64, b: f64) -> RawPtr {
        self.allocate_material(SoftMaterial::lambertian(DVec3::new(r, g, b)))
    }

    fn create_metal(&self, r: f64, g: f64, b: f64, fuzz: f64) -> RawPtr {
        self.allocate_material(SoftMaterial::metal(DVec3::new(r, g, b), fuzz))
    }

    fn create_dielectric(&self, refractive_index: f64) -> RawPtr {
        self.allocate_material(SoftMaterial::dielectric(refractive_index))
    }

    fn create_scene(&self) -> RawPtr {
        let mut table = self.table();
        if !self.admit(&mut table) {
            return std::ptr::null_mut();
        }
        let ptr = Box::into_raw(Box::new(SoftScene::new())).cast::<c_void>();
        table.scenes.insert(ptr as usize);
        table.stats.scenes_created += 1;
        ptr
    }

    unsafe fn destroy_material(&self, material: RawHandle) {
        let mut table = self.table();
        if !table.materials.remove(&material.addr()) {
            table.stats.invalid_handle_calls += 1;
            error!("destroy of unknown material {:#x} ignored", material.addr());
            return;
        }
        table.stats.materials_destroyed += 1;
        // Spheres that reference this material keep it alive through their Arc.
        drop(Box::from_raw(material.as_ptr().cast::<Arc<SoftMaterial>>()));
    }

    unsafe fn add_sphere(&self, scene: RawHandle, center: Triplet, radius: f64, material: RawHandle) {
        let mut table = self.table();
        if !table.scenes.contains(&scene.addr()) || !table.materials.contains(&material.addr()) {
            table.stats.invalid_handle_calls += 1;
            error!(
                "add_sphere with unknown handle (scene {:#x}, material {:#x}) ignored",
                scene.addr(),
                material.addr()
            );
            return;
        }
        let shared = Arc::clone(&*material.as_ptr().cast::<Arc<SoftMaterial>>());
        let scene = &mut *scene.as_ptr().cast::<SoftScene>();
        scene.add(SoftSphere::new(DVec3::from(center), radius, shared));
        table.stats.spheres_added += 1;
    }

    unsafe fn render(&self, camera: CameraConfig, scene: RawHandle, buffer: *mut u8, callback: RenderCallback) {
        {
            let mut table = self.table();
            if !table.scenes.contains(&scene.addr()) {
                table.stats.invalid_handle_calls += 1;
                error!("render of unknown scene {:#x} ignored", scene.addr());
                return;
            }
            table.stats.renders += 1;
        }

        if buffer.is_null() || camera.image_width <= 0 || camera.samples_per_pixel <= 0 {
            error!("render rejected: invalid camera or null buffer");
            return;
        }
        let width = camera.image_width as u32;
        let height = match image_height(width, camera.aspect_ratio) {
            Ok(height) => height,
            Err(err) => {
                error!("render rejected: {err}");
                return;
            }
        };
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        let spp = camera.samples_per_pixel as u32;
        let max_depth = camera.max_depth.max(0) as u32;

        let scene = &*scene.as_ptr().cast::<SoftScene>();
        let ray_camera = RayCamera::new(&camera, height);
        let mut accum = Accumulator::new(width, height);
        let start = Instant::now();
        debug!(
            "software render {width}x{height}, {spp} spp, {} spheres",
            scene.spheres.len()
        );

        for pass in 1..=spp {
            {
                let pixels = std::slice::from_raw_parts_mut(buffer, len);
                accum.render_pass(&ray_camera, scene, max_depth, self.seed, pass, pixels);
            }
            // The slice is gone before the observer reads through `buffer`.
            callback(pass as i32, buffer);
        }

        debug!("software render done in {:.2?}", start.elapsed());
    }

    unsafe fn destroy_scene(&self, scene: RawHandle) {
        let mut table = self.table();
        if !table.scenes.remove(&scene.addr()) {
            table.stats.invalid_handle_calls += 1;
            error!("destroy of unknown scene {:#x} ignored", scene.addr());
            return;
        }
        table.stats.scenes_destroyed += 1;
        drop(Box::from_raw(scene.as_ptr().cast::<SoftScene>()));
    }

    unsafe fn save_image(&self, width: i32, height: i32, buffer: *const u8, path: &CStr) -> i32 {
        if width <= 0 || height <= 0 || buffer.is_null() {
            return SAVE_INVALID_ARGUMENT;
        }
        let Ok(path) = path.to_str() else {
            return SAVE_INVALID_ARGUMENT;
        };

        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        let pixels = std::slice::from_raw_parts(buffer, len);
        match image::save_buffer_with_format(
            path,
            pixels,
            width as u32,
            height as u32,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        ) {
            Ok(()) => {
                self.table().stats.images_saved += 1;
                debug!("wrote {width}x{height} PNG to {path}");
                SAVE_OK
            }
            Err(err) => {
                warn!("failed to write {path}: {err}");
                SAVE_IO_ERROR
            }
        }
    }
}

impl Drop for SoftwareEngine {
    fn drop(&mut self) {
        let table = self.table.get_mut().unwrap_or_else(PoisonError::into_inner);
        if table.materials.is_empty() && table.scenes.is_empty() {
            return;
        }
        warn!(
            "engine dropped with {} materials and {} scenes live, reclaiming",
            table.materials.len(),
            table.scenes.len()
        );
        for addr in table.scenes.drain() {
            // SAFETY: tracked addresses came from Box::into_raw and were not freed.
            unsafe { drop(Box::from_raw(addr as *mut SoftScene)) };
        }
        for addr in table.materials.drain() {
            // SAFETY: as above.
            unsafe { drop(Box::from_raw(addr as *mut Arc<SoftMaterial>)) };
        }
    }
}
