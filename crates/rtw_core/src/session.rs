//! One-shot render jobs for display and export consumers.
//!
//! A [`RenderSession`] owns the whole buffer lifecycle: it allocates the
//! pinned buffer, streams snapshots and status lines to a [`RenderObserver`]
//! while the engine works, exports the result if asked to, and hands the
//! buffer back once every user is done with it.

use std::path::{Path, PathBuf};

use crate::camera::Camera;
use crate::context::Context;
use crate::error::RenderResult;
use crate::framebuffer::FrameBuffer;
use crate::material::MaterialRegistry;
use crate::render::{Progress, RenderReport};
use crate::scene::Scene;

/// Consumer of progressive frames and status text, e.g. a preview window.
pub trait RenderObserver {
    /// Called on the render thread for every accepted progress notification.
    fn on_frame(&mut self, _progress: &Progress<'_>) {}

    fn on_status(&mut self, _status: &str) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl RenderObserver for Silent {}

/// Writes status lines to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RenderObserver for LogObserver {
    fn on_status(&mut self, status: &str) {
        log::info!("{}", status);
    }
}

/// Result of [`RenderSession::run`].
#[derive(Debug)]
pub struct RenderOutcome {
    pub buffer: FrameBuffer,
    pub report: RenderReport,
    /// `None` when no save path was set. An export failure lands here and
    /// does not invalidate `buffer`.
    pub export: Option<RenderResult<PathBuf>>,
}

impl RenderOutcome {
    /// Path of the written image, if the export succeeded.
    pub fn exported(&self) -> Option<&Path> {
        match &self.export {
            Some(Ok(path)) => Some(path),
            _ => None,
        }
    }
}

/// Camera plus an optional destination file.
#[derive(Debug, Clone)]
pub struct RenderSession {
    camera: Camera,
    save_path: Option<PathBuf>,
}

impl RenderSession {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            save_path: None,
        }
    }

    /// Export the finished frame to `path`.
    pub fn save_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Allocate, render, optionally export.
    ///
    /// Errors before or during the render abort the session. An export
    /// failure is reported through the observer and in the outcome.
    pub fn run(
        &self,
        ctx: &Context,
        scene: &mut Scene,
        materials: &MaterialRegistry,
        observer: &mut dyn RenderObserver,
    ) -> RenderResult<RenderOutcome> {
        let mut buffer = FrameBuffer::for_camera(&self.camera)?;
        observer.on_status(&format!(
            "Rendering {}x{} @ {} spp",
            buffer.width(),
            buffer.height(),
            self.camera.samples_per_pixel
        ));

        let report = ctx.render(&self.camera, scene, materials, &mut buffer, |progress| {
            observer.on_frame(progress);
            observer.on_status(&format!(
                "Sample {}/{}",
                progress.samples_completed, progress.samples_per_pixel
            ));
        })?;
        observer.on_status(&format!("Render finished in {:.2?}", report.elapsed));

        let export = self.save_path.as_ref().map(|path| {
            let result = ctx.export(&buffer, path).map(|()| path.clone());
            match &result {
                Ok(path) => observer.on_status(&format!("Saved {}", path.display())),
                Err(err) => observer.on_status(&format!("Export failed: {}", err)),
            }
            result
        });

        Ok(RenderOutcome {
            buffer,
            report,
            export,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::mock::MockEngine;
    use rtw_math::{Color, Triplet};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<u32>,
        status: Vec<String>,
    }

    impl RenderObserver for Recorder {
        fn on_frame(&mut self, progress: &Progress<'_>) {
            self.frames.push(progress.samples_completed);
        }

        fn on_status(&mut self, status: &str) {
            self.status.push(status.to_string());
        }
    }

    fn scene(ctx: &Context) -> (MaterialRegistry, Scene) {
        let mut materials = ctx.material_registry();
        let mut scene = ctx.create_scene().unwrap();
        let m = materials.create_lambertian(Color::gray(0.5)).unwrap();
        scene.add_sphere(&materials, Triplet::ZERO, 1.0, m).unwrap();
        (materials, scene)
    }

    #[test]
    fn test_session_streams_frames_and_status() {
        let ctx = Context::new(MockEngine::new().with_progress(&[1, 2]));
        let (materials, mut scene) = scene(&ctx);
        let session = RenderSession::new(Camera::new().with_resolution(8, 2.0).with_quality(2, 1));
        let mut recorder = Recorder::default();

        let outcome = session.run(&ctx, &mut scene, &materials, &mut recorder).unwrap();

        assert_eq!(recorder.frames, vec![1, 2]);
        assert_eq!(recorder.status[0], "Rendering 8x4 @ 2 spp");
        assert_eq!(recorder.status[1], "Sample 1/2");
        assert!(recorder.status[3].starts_with("Render finished in"));
        assert!(outcome.export.is_none());
        assert_eq!(outcome.buffer.len(), 8 * 4 * 4);
    }

    #[test]
    fn test_session_export_failure_is_reported_not_raised() {
        let engine = Arc::new(MockEngine::new().with_progress(&[1]).with_save_status(1));
        let ctx = Context::from_arc(engine.clone());
        let (materials, mut scene) = scene(&ctx);
        let session = RenderSession::new(Camera::new().with_quality(1, 1)).save_to("/no/such/dir/out.png");
        let mut recorder = Recorder::default();

        let outcome = session.run(&ctx, &mut scene, &materials, &mut recorder).unwrap();

        assert!(matches!(outcome.export, Some(Err(RenderError::ExportFailure { status: 1, .. }))));
        assert!(outcome.exported().is_none());
        assert!(recorder.status.last().unwrap().starts_with("Export failed"));
        assert!(outcome.buffer.as_bytes().iter().all(|&b| b == 1));
        assert_eq!(engine.calls().saves, 1);
    }

    #[test]
    fn test_session_export_success() {
        let ctx = Context::new(MockEngine::new());
        let (materials, mut scene) = scene(&ctx);
        let session = RenderSession::new(Camera::new()).save_to("frame.png");

        let outcome = session.run(&ctx, &mut scene, &materials, &mut Silent).unwrap();

        assert_eq!(outcome.exported(), Some(Path::new("frame.png")));
        assert_eq!(session.save_path(), Some(Path::new("frame.png")));
    }

    #[test]
    fn test_session_invalid_camera_fails_before_engine() {
        let engine = Arc::new(MockEngine::new());
        let ctx = Context::from_arc(engine.clone());
        let (materials, mut scene) = scene(&ctx);
        let session = RenderSession::new(Camera::new().with_resolution(0, 1.0));

        let err = session.run(&ctx, &mut scene, &materials, &mut LogObserver).unwrap_err();

        assert!(matches!(err, RenderError::InvalidParameter { .. }));
        assert_eq!(engine.calls().renders, 0);
    }
}
