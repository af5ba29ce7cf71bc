//! The blocking render call and its progress callback.
//!
//! The engine only accepts a bare `extern "C" fn(i32, *mut u8)`, so the
//! caller's observer is parked in a thread-local for the duration of the
//! call and reached through [`progress_trampoline`]. The engine calls back on
//! the render thread; a callback arriving on any other thread finds nothing
//! installed and is dropped.

use std::any::Any;
use std::cell::Cell;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::framebuffer::FrameBuffer;
use crate::material::MaterialRegistry;
use crate::scene::Scene;

/// Read-only view of the frame buffer during a render.
///
/// The engine may still be writing pixels from its own threads, so the view
/// never hands out a slice; it only copies bytes out.
pub struct FrameView<'a> {
    ptr: *const u8,
    len: usize,
    width: u32,
    height: u32,
    _buffer: PhantomData<&'a FrameBuffer>,
}

impl FrameView<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Length of the full buffer in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy up to `dst.len()` bytes from the start of the buffer.
    pub fn copy_to(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len);
        // SAFETY: `ptr` addresses `len` bytes of the pinned frame buffer,
        // which is borrowed for the whole render; `dst` is a separate allocation.
        unsafe { ptr::copy_nonoverlapping(self.ptr, dst.as_mut_ptr(), n) };
        n
    }

    /// Copy the whole buffer.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut pixels = vec![0u8; self.len];
        self.copy_to(&mut pixels);
        pixels
    }
}

/// One progress notification.
pub struct Progress<'a> {
    /// Cumulative samples per pixel finished so far.
    pub samples_completed: u32,
    pub samples_per_pixel: u32,
    pub frame: FrameView<'a>,
}

impl Progress<'_> {
    /// Completed fraction in [0, 1].
    pub fn fraction(&self) -> f64 {
        self.samples_completed as f64 / self.samples_per_pixel as f64
    }

    pub fn is_complete(&self) -> bool {
        self.samples_completed == self.samples_per_pixel
    }
}

/// Summary of a finished render call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Notifications delivered to the observer.
    pub notifications: u32,
    /// Notifications dropped for going backwards or out of range.
    pub rejected: u32,
    /// Sample count of the last delivered notification.
    pub last_samples: Option<u32>,
    pub elapsed: Duration,
}

struct ActiveRender<'a> {
    observer: &'a mut dyn FnMut(&Progress<'_>),
    buffer: *const u8,
    len: usize,
    width: u32,
    height: u32,
    samples_per_pixel: u32,
    last: Option<u32>,
    notifications: u32,
    rejected: u32,
    panic: Option<Box<dyn Any + Send + 'static>>,
}

impl ActiveRender<'_> {
    fn dispatch(&mut self, samples: i32, reported: *mut u8) {
        if self.panic.is_some() {
            return;
        }
        if reported as *const u8 != self.buffer {
            log::warn!(
                "engine reported buffer {:p}, pinned buffer is {:p}; using the pinned one",
                reported,
                self.buffer
            );
        }

        let accepted = u32::try_from(samples)
            .ok()
            .filter(|&s| s <= self.samples_per_pixel && self.last.map_or(true, |last| s >= last));
        let Some(samples) = accepted else {
            log::warn!(
                "dropping progress notification: {} samples (last {:?}, max {})",
                samples,
                self.last,
                self.samples_per_pixel
            );
            self.rejected += 1;
            return;
        };

        self.last = Some(samples);
        self.notifications += 1;
        log::trace!("progress {}/{}", samples, self.samples_per_pixel);

        let progress = Progress {
            samples_completed: samples,
            samples_per_pixel: self.samples_per_pixel,
            frame: FrameView {
                ptr: self.buffer,
                len: self.len,
                width: self.width,
                height: self.height,
                _buffer: PhantomData,
            },
        };
        let observer = &mut *self.observer;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(&progress))) {
            log::error!("progress observer panicked; ignoring further notifications from this render");
            self.panic = Some(payload);
        }
    }
}

thread_local! {
    static ACTIVE: Cell<*mut c_void> = const { Cell::new(ptr::null_mut()) };
}

/// Installs an [`ActiveRender`] for the current thread and restores the
/// previous one on drop, so nested renders on one thread unwind correctly.
struct Installed {
    previous: *mut c_void,
}

impl Installed {
    fn new(active: *mut ActiveRender<'_>) -> Self {
        let previous = ACTIVE.with(|slot| slot.replace(active as *mut c_void));
        Self { previous }
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        ACTIVE.with(|slot| slot.set(self.previous));
    }
}

/// Callback handed to the engine for every render.
unsafe extern "C" fn progress_trampoline(samples: i32, buffer: *mut u8) {
    let active = ACTIVE
        .try_with(|slot| slot.get())
        .unwrap_or(ptr::null_mut()) as *mut ActiveRender<'static>;
    if active.is_null() {
        log::warn!(
            "progress callback ({} samples) arrived outside a render on this thread; ignored",
            samples
        );
        return;
    }
    // SAFETY: the pointer was installed by `render_scene` on this thread and
    // stays valid until that call's engine render returns.
    (*active).dispatch(samples, buffer);
}

/// Run one blocking render.
///
/// `scene` and `buffer` are borrowed exclusively and `materials` shared for
/// the whole engine call, so none of them can be disposed, moved or reused
/// by another render until it returns.
pub(crate) fn render_scene(
    camera: &Camera,
    scene: &mut Scene,
    materials: &MaterialRegistry,
    buffer: &mut FrameBuffer,
    observer: &mut dyn FnMut(&Progress<'_>),
) -> RenderResult<RenderReport> {
    let config = camera.to_config()?;
    if !buffer.matches(camera) {
        return Err(RenderError::invalid(
            "buffer",
            format!(
                "is {}x{}, camera renders {}x{}",
                buffer.width(),
                buffer.height(),
                camera.image_width,
                camera.image_height()?
            ),
        ));
    }
    scene.check_live(materials)?;
    let raw_scene = scene.raw()?;
    let engine = scene.engine().clone();

    log::info!(
        "render start: {}x{} @ {} spp, depth {}, {} spheres ({} engine)",
        buffer.width(),
        buffer.height(),
        camera.samples_per_pixel,
        camera.max_depth,
        scene.len(),
        engine.name()
    );

    let (len, width, height) = (buffer.len(), buffer.width(), buffer.height());
    // Last access to `buffer` before the engine call: any later reborrow would
    // invalidate this pointer.
    let pixels = buffer.as_mut_ptr();
    let mut active = ActiveRender {
        observer,
        buffer: pixels as *const u8,
        len,
        width,
        height,
        samples_per_pixel: camera.samples_per_pixel,
        last: None,
        notifications: 0,
        rejected: 0,
        panic: None,
    };

    let start = Instant::now();
    {
        let _installed = Installed::new(&mut active);
        // SAFETY: the scene and every material it references were checked
        // live above and stay borrowed; `pixels` addresses exactly the
        // camera's buffer size and the buffer is borrowed mutably until return.
        unsafe { engine.render(config, raw_scene, pixels, progress_trampoline) };
    }
    let elapsed = start.elapsed();

    let ActiveRender {
        last,
        notifications,
        rejected,
        panic: observer_panic,
        ..
    } = active;
    if let Some(payload) = observer_panic {
        panic::resume_unwind(payload);
    }

    log::info!(
        "render finished in {:.2?}: {} notifications, {} rejected",
        elapsed,
        notifications,
        rejected
    );
    Ok(RenderReport {
        notifications,
        rejected,
        last_samples: last,
        elapsed,
    })
}

#[cfg(test)]
fn render_installed() -> bool {
    ACTIVE.with(|slot| !slot.get().is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ResourceKind;
    use crate::mock::MockEngine;
    use crate::Context;
    use rtw_math::{Color, Triplet};
    use std::sync::Arc;

    struct Fixture {
        engine: Arc<MockEngine>,
        ctx: Context,
        materials: MaterialRegistry,
        scene: Scene,
        camera: Camera,
    }

    fn fixture(engine: MockEngine) -> Fixture {
        let engine = Arc::new(engine);
        let ctx = Context::from_arc(engine.clone());
        let mut materials = ctx.material_registry();
        let mut scene = ctx.create_scene().unwrap();
        let ground = materials.create_lambertian(Color::gray(0.5)).unwrap();
        scene
            .add_sphere(&materials, Triplet::new(0.0, -1000.0, 0.0), 1000.0, ground)
            .unwrap();
        let camera = Camera::new().with_resolution(16, 2.0).with_quality(10, 5);
        Fixture {
            engine,
            ctx,
            materials,
            scene,
            camera,
        }
    }

    #[test]
    fn test_progress_in_order_is_delivered() {
        let mut f = fixture(MockEngine::new().with_progress(&[0, 1, 1, 5, 10]));
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let mut seen = Vec::new();

        let report = f
            .ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |p| {
                seen.push((p.samples_completed, p.frame.snapshot()[0]));
            })
            .unwrap();

        assert_eq!(seen, vec![(0, 0), (1, 1), (1, 1), (5, 5), (10, 10)]);
        assert_eq!(report.notifications, 5);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.last_samples, Some(10));
        assert!(!render_installed());
    }

    #[test]
    fn test_out_of_order_and_out_of_range_are_dropped() {
        let mut f = fixture(MockEngine::new().with_progress(&[0, 3, 2, 11, -1, 5, 10]));
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let mut seen = Vec::new();

        let report = f
            .ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |p| {
                seen.push(p.samples_completed)
            })
            .unwrap();

        assert_eq!(seen, vec![0, 3, 5, 10]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(report.rejected, 3);
    }

    #[test]
    fn test_frame_view_sees_pinned_buffer() {
        let mut f = fixture(MockEngine::new().with_progress(&[7]));
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let addr = buffer.addr();
        let mut dims = None;

        f.ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |p| {
                let mut first = [0u8; 4];
                assert_eq!(p.frame.copy_to(&mut first), 4);
                assert_eq!(first, [7, 7, 7, 7]);
                dims = Some((p.frame.width(), p.frame.height(), p.frame.len()));
            })
            .unwrap();

        assert_eq!(dims, Some((16, 8, 16 * 8 * 4)));
        assert_eq!(buffer.addr(), addr);
        assert!(buffer.as_bytes().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_disposed_scene_never_reaches_engine() {
        let mut f = fixture(MockEngine::new().with_progress(&[10]));
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        f.scene.dispose();

        let err = f
            .ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |_| {})
            .unwrap_err();

        assert!(matches!(
            err,
            RenderError::UseAfterDispose {
                resource: ResourceKind::Scene
            }
        ));
        assert_eq!(f.engine.calls().renders, 0);
    }

    #[test]
    fn test_disposed_material_never_reaches_engine() {
        let mut f = fixture(MockEngine::new().with_progress(&[10]));
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let ground = f.scene.spheres()[0].material;
        f.materials.dispose(ground);

        let err = f
            .ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |_| {})
            .unwrap_err();

        assert!(matches!(
            err,
            RenderError::UseAfterDispose {
                resource: ResourceKind::Material
            }
        ));
        assert_eq!(f.engine.calls().renders, 0);
    }

    #[test]
    fn test_buffer_camera_mismatch_rejected() {
        let mut f = fixture(MockEngine::new());
        let mut buffer = FrameBuffer::new(8, 8).unwrap();

        let err = f
            .ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |_| {})
            .unwrap_err();

        assert!(matches!(err, RenderError::InvalidParameter { name: "buffer", .. }));
        assert_eq!(f.engine.calls().renders, 0);
    }

    #[test]
    fn test_camera_passed_by_value() {
        let mut f = fixture(MockEngine::new());
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();

        f.ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |_| {})
            .unwrap();

        let sent = f.engine.calls().last_camera.unwrap();
        assert_eq!(sent, f.camera.to_config().unwrap());
    }

    #[test]
    fn test_callback_from_other_thread_is_ignored() {
        let mut f = fixture(MockEngine::new().with_progress(&[1, 2]));
        f.engine.callback_off_thread(true);
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let mut calls = 0;

        let report = f
            .ctx
            .render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |_| calls += 1)
            .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(report.notifications, 0);
    }

    #[test]
    fn test_observer_panic_resumes_after_engine_returns() {
        let mut f = fixture(MockEngine::new().with_progress(&[1, 2, 3]));
        let mut buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let mut calls = 0;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            f.ctx.render(&f.camera, &mut f.scene, &f.materials, &mut buffer, |_| {
                calls += 1;
                panic!("observer boom");
            })
        }));

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"observer boom"));
        assert_eq!(calls, 1);
        assert!(!render_installed());
        assert_eq!(f.engine.calls().renders, 1);
    }

    #[test]
    fn test_nested_render_restores_outer_observer() {
        let mut f = fixture(MockEngine::new().with_progress(&[0, 10]));
        let mut inner_scene = f.ctx.create_scene().unwrap();
        let mut outer_buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let mut inner_buffer = FrameBuffer::for_camera(&f.camera).unwrap();
        let mut outer = Vec::new();
        let mut inner = Vec::new();

        let ctx = &f.ctx;
        let materials = &f.materials;
        let camera = f.camera;
        ctx.render(&camera, &mut f.scene, materials, &mut outer_buffer, |p| {
            outer.push(p.samples_completed);
            if p.samples_completed == 0 {
                ctx.render(&camera, &mut inner_scene, materials, &mut inner_buffer, |q| {
                    inner.push(q.samples_completed)
                })
                .unwrap();
            }
        })
        .unwrap();

        assert_eq!(outer, vec![0, 10]);
        assert_eq!(inner, vec![0, 10]);
        assert!(!render_installed());
    }

    #[test]
    fn test_progress_fraction() {
        let view = FrameView {
            ptr: ptr::null(),
            len: 0,
            width: 0,
            height: 0,
            _buffer: PhantomData,
        };
        let p = Progress {
            samples_completed: 5,
            samples_per_pixel: 10,
            frame: view,
        };
        assert_eq!(p.fraction(), 0.5);
        assert!(!p.is_complete());
        assert!(p.frame.is_empty());
    }
}
