//! C ABI of the ray-tracing engine.
//!
//! Layouts mirror the engine's exported structs field for field. Everything
//! here is plain data; ownership rules live in [`crate::lifecycle`].

use std::ffi::c_void;
#[cfg(feature = "native")]
use std::ffi::c_char;

use rtw_math::Triplet;

/// Progress notification: cumulative samples and the buffer being written.
pub type RenderCallback = unsafe extern "C" fn(samples: i32, buffer: *mut u8);

/// Opaque engine pointer as it appears on the wire.
pub type RawPtr = *mut c_void;

/// Status returned by a successful image save.
pub const SAVE_OK: i32 = 0;

/// Status for a save that could not write the file.
pub const SAVE_IO_ERROR: i32 = 1;

/// Status for a save rejected because of its arguments.
pub const SAVE_INVALID_ARGUMENT: i32 = -1;

/// Camera description passed by value to `RenderScene`.
///
/// Field order and types are fixed by the engine (8-byte packing): four bytes
/// of padding follow `max_depth`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraConfig {
    pub aspect_ratio: f64,
    pub image_width: i32,
    pub samples_per_pixel: i32,
    pub max_depth: i32,
    pub vfov: f64,
    pub lookfrom: Triplet,
    pub lookat: Triplet,
    pub vup: Triplet,
    pub defocus_angle: f64,
    pub focus_dist: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.0,
            image_width: 100,
            samples_per_pixel: 10,
            max_depth: 10,
            vfov: 90.0,
            lookfrom: Triplet::new(0.0, 0.0, 0.0),
            lookat: Triplet::new(0.0, 0.0, -1.0),
            vup: Triplet::new(0.0, 1.0, 0.0),
            defocus_angle: 0.0,
            focus_dist: 10.0,
        }
    }
}

// ============================================================================
// Native engine entry points
// ============================================================================

#[cfg(feature = "native")]
extern "C" {
    #[link_name = "CreateLambertian"]
    pub fn create_lambertian(r: f64, g: f64, b: f64) -> RawPtr;

    #[link_name = "CreateMetal"]
    pub fn create_metal(r: f64, g: f64, b: f64, fuzz: f64) -> RawPtr;

    #[link_name = "CreateDielectric"]
    pub fn create_dielectric(refraction_index: f64) -> RawPtr;

    #[link_name = "DestroyMaterial"]
    pub fn destroy_material(material: RawPtr);

    #[link_name = "CreateScene"]
    pub fn create_scene() -> RawPtr;

    #[link_name = "SceneAddSphere"]
    pub fn scene_add_sphere(scene: RawPtr, center: Triplet, radius: f64, material: RawPtr);

    #[link_name = "RenderScene"]
    pub fn render_scene(config: CameraConfig, scene: RawPtr, buffer: *mut u8, callback: RenderCallback);

    #[link_name = "DestroyScene"]
    pub fn destroy_scene(scene: RawPtr);

    #[link_name = "SavePng"]
    pub fn save_png(w: i32, h: i32, buffer: *mut u8, pathname: *const c_char) -> i32;
}
