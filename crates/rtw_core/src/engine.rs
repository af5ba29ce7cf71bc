//! The engine seam: raw boundary operations behind a trait.
//!
//! [`Engine`] is the exact set of calls the C ABI offers, with pointers kept
//! raw. Nothing outside this crate's safe wrappers should call it directly:
//! the wrappers are what guarantee a handle is live, owned and released once.

use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

use rtw_math::Triplet;

use crate::ffi::{CameraConfig, RawPtr, RenderCallback};

/// A non-null pointer to an engine-owned resource.
///
/// Only an address token: it carries no ownership by itself.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

impl RawHandle {
    /// Wrap a pointer returned by an engine constructor. `None` for null.
    pub fn new(ptr: RawPtr) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub fn as_ptr(self) -> RawPtr {
        self.0.as_ptr()
    }

    /// Numeric address, for logging and bookkeeping.
    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

// SAFETY: a RawHandle is never dereferenced on the Rust side. The engine
// owns the pointee and its synchronisation; the wrappers decide who may
// release it.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

/// Boundary operations of a ray-tracing engine.
///
/// Constructors return the raw pointer unchecked (null means allocation
/// failed). Every operation taking a [`RawHandle`] is `unsafe` because the
/// engine trusts the pointer blindly.
pub trait Engine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn create_lambertian(&self, r: f64, g: f64, b: f64) -> RawPtr;

    fn create_metal(&self, r: f64, g: f64, b: f64, fuzz: f64) -> RawPtr;

    fn create_dielectric(&self, refractive_index: f64) -> RawPtr;

    fn create_scene(&self) -> RawPtr;

    /// # Safety
    /// `material` was created by this engine and has not been destroyed.
    unsafe fn destroy_material(&self, material: RawHandle);

    /// # Safety
    /// Both handles were created by this engine and are still live.
    unsafe fn add_sphere(&self, scene: RawHandle, center: Triplet, radius: f64, material: RawHandle);

    /// Blocking render. May invoke `callback` on the calling thread any
    /// number of times before returning.
    ///
    /// # Safety
    /// `scene` is live, and `buffer` points to at least
    /// `image_width * image_height * 4` writable bytes that stay in place
    /// until this call returns.
    unsafe fn render(&self, camera: CameraConfig, scene: RawHandle, buffer: *mut u8, callback: RenderCallback);

    /// # Safety
    /// `scene` was created by this engine and has not been destroyed.
    unsafe fn destroy_scene(&self, scene: RawHandle);

    /// Persist an RGBA8 buffer. Returns 0 on success.
    ///
    /// # Safety
    /// `buffer` points to at least `width * height * 4` readable bytes.
    unsafe fn save_image(&self, width: i32, height: i32, buffer: *const u8, path: &CStr) -> i32;
}

// ============================================================================
// Native engine
// ============================================================================

/// The linked `rt` library.
#[cfg(feature = "native")]
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEngine;

#[cfg(feature = "native")]
impl Engine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn create_lambertian(&self, r: f64, g: f64, b: f64) -> RawPtr {
        unsafe { crate::ffi::create_lambertian(r, g, b) }
    }

    fn create_metal(&self, r: f64, g: f64, b: f64, fuzz: f64) -> RawPtr {
        unsafe { crate::ffi::create_metal(r, g, b, fuzz) }
    }

    fn create_dielectric(&self, refractive_index: f64) -> RawPtr {
        unsafe { crate::ffi::create_dielectric(refractive_index) }
    }

    fn create_scene(&self) -> RawPtr {
        unsafe { crate::ffi::create_scene() }
    }

    unsafe fn destroy_material(&self, material: RawHandle) {
        crate::ffi::destroy_material(material.as_ptr());
    }

    unsafe fn add_sphere(&self, scene: RawHandle, center: Triplet, radius: f64, material: RawHandle) {
        crate::ffi::scene_add_sphere(scene.as_ptr(), center, radius, material.as_ptr());
    }

    unsafe fn render(&self, camera: CameraConfig, scene: RawHandle, buffer: *mut u8, callback: RenderCallback) {
        crate::ffi::render_scene(camera, scene.as_ptr(), buffer, callback);
    }

    unsafe fn destroy_scene(&self, scene: RawHandle) {
        crate::ffi::destroy_scene(scene.as_ptr());
    }

    unsafe fn save_image(&self, width: i32, height: i32, buffer: *const u8, path: &CStr) -> i32 {
        // SavePng forwards stb_image_write's result: non-zero means written.
        let written = crate::ffi::save_png(width, height, buffer as *mut u8, path.as_ptr());
        if written != 0 {
            crate::ffi::SAVE_OK
        } else {
            crate::ffi::SAVE_IO_ERROR
        }
    }
}
