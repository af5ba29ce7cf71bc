//! Recording engine for unit tests.

use std::collections::HashSet;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rtw_math::Triplet;

use crate::engine::{Engine, RawHandle};
use crate::ffi::{CameraConfig, RawPtr, RenderCallback};

/// Counts of every boundary call the mock has seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MockCalls {
    pub materials_created: usize,
    pub materials_destroyed: usize,
    pub scenes_created: usize,
    pub scenes_destroyed: usize,
    pub spheres_added: usize,
    pub renders: usize,
    pub saves: usize,
    pub last_camera: Option<CameraConfig>,
    pub last_save_path: Option<String>,
}

#[derive(Default)]
struct MockState {
    calls: MockCalls,
    live: HashSet<usize>,
    progress_script: Vec<i32>,
    save_status: i32,
}

pub(crate) struct MockEngine {
    state: Mutex<MockState>,
    fail_allocations: AtomicBool,
    callback_off_thread: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            fail_allocations: AtomicBool::new(false),
            callback_off_thread: AtomicBool::new(false),
        }
    }

    /// Samples reported by the next renders, in order.
    pub fn with_progress(self, script: &[i32]) -> Self {
        self.state.lock().unwrap().progress_script = script.to_vec();
        self
    }

    pub fn with_save_status(self, status: i32) -> Self {
        self.state.lock().unwrap().save_status = status;
        self
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::SeqCst);
    }

    pub fn callback_off_thread(&self, enabled: bool) {
        self.callback_off_thread.store(enabled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> MockCalls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn live_handles(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    fn allocate(&self, material: bool) -> RawPtr {
        if self.fail_allocations.load(Ordering::SeqCst) {
            return std::ptr::null_mut();
        }
        let ptr = Box::into_raw(Box::new(0u64)) as RawPtr;
        let mut state = self.state.lock().unwrap();
        state.live.insert(ptr as usize);
        if material {
            state.calls.materials_created += 1;
        } else {
            state.calls.scenes_created += 1;
        }
        ptr
    }

    fn release(&self, handle: RawHandle) {
        let mut state = self.state.lock().unwrap();
        assert!(
            state.live.remove(&handle.addr()),
            "engine received dead handle {:#x}",
            handle.addr()
        );
        drop(unsafe { Box::from_raw(handle.as_ptr() as *mut u64) });
    }

    fn assert_live(&self, handle: RawHandle) {
        let state = self.state.lock().unwrap();
        assert!(
            state.live.contains(&handle.addr()),
            "engine received dead handle {:#x}",
            handle.addr()
        );
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn create_lambertian(&self, _r: f64, _g: f64, _b: f64) -> RawPtr {
        self.allocate(true)
    }

    fn create_metal(&self, _r: f64, _g: f64, _b: f64, _fuzz: f64) -> RawPtr {
        self.allocate(true)
    }

    fn create_dielectric(&self, _refractive_index: f64) -> RawPtr {
        self.allocate(true)
    }

    fn create_scene(&self) -> RawPtr {
        self.allocate(false)
    }

    unsafe fn destroy_material(&self, material: RawHandle) {
        self.release(material);
        self.state.lock().unwrap().calls.materials_destroyed += 1;
    }

    unsafe fn add_sphere(&self, scene: RawHandle, _center: Triplet, _radius: f64, material: RawHandle) {
        self.assert_live(scene);
        self.assert_live(material);
        self.state.lock().unwrap().calls.spheres_added += 1;
    }

    unsafe fn render(&self, camera: CameraConfig, scene: RawHandle, buffer: *mut u8, callback: RenderCallback) {
        self.assert_live(scene);
        let script = {
            let mut state = self.state.lock().unwrap();
            state.calls.renders += 1;
            state.calls.last_camera = Some(camera);
            state.progress_script.clone()
        };

        let width = camera.image_width as usize;
        let height = ((camera.image_width as f64 / camera.aspect_ratio) as usize).max(1);
        let len = width * height * 4;

        for samples in script {
            std::ptr::write_bytes(buffer, samples.clamp(0, 255) as u8, len);
            if self.callback_off_thread.load(Ordering::SeqCst) {
                let addr = buffer as usize;
                std::thread::scope(|s| {
                    s.spawn(move || unsafe { callback(samples, addr as *mut u8) });
                });
            } else {
                callback(samples, buffer);
            }
        }
    }

    unsafe fn destroy_scene(&self, scene: RawHandle) {
        self.release(scene);
        self.state.lock().unwrap().calls.scenes_destroyed += 1;
    }

    unsafe fn save_image(&self, _width: i32, _height: i32, _buffer: *const u8, path: &CStr) -> i32 {
        let mut state = self.state.lock().unwrap();
        state.calls.saves += 1;
        state.calls.last_save_path = Some(path.to_string_lossy().into_owned());
        state.save_status
    }
}
