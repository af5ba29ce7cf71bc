//! Entry point tying an engine to the safe wrappers.

use std::path::Path;
use std::sync::Arc;

use crate::camera::Camera;
use crate::engine::Engine;
use crate::error::{RenderError, RenderResult};
use crate::export::export_frame;
use crate::framebuffer::FrameBuffer;
use crate::lifecycle::{same_engine, ResourceKind};
use crate::material::MaterialRegistry;
use crate::render::{render_scene, Progress, RenderReport};
use crate::scene::Scene;

/// Shared handle to one engine. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    engine: Arc<dyn Engine>,
}

impl Context {
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_arc(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Context backed by the linked native library.
    #[cfg(feature = "native")]
    pub fn native() -> Self {
        Self::new(crate::engine::NativeEngine)
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// New, empty material registry on this engine.
    pub fn material_registry(&self) -> MaterialRegistry {
        MaterialRegistry::new(self.engine.clone())
    }

    pub fn create_scene(&self) -> RenderResult<Scene> {
        Scene::create(self.engine.clone())
    }

    /// Render `scene` into `buffer`, blocking until the engine returns.
    ///
    /// `on_progress` runs on this thread for every accepted notification.
    /// It must return quickly: the engine waits for it.
    pub fn render(
        &self,
        camera: &Camera,
        scene: &mut Scene,
        materials: &MaterialRegistry,
        buffer: &mut FrameBuffer,
        mut on_progress: impl FnMut(&Progress<'_>),
    ) -> RenderResult<RenderReport> {
        if !same_engine(&self.engine, scene.engine()) {
            return Err(RenderError::ForeignResource {
                resource: ResourceKind::Scene,
            });
        }
        render_scene(camera, scene, materials, buffer, &mut on_progress)
    }

    /// Write `buffer` to `path`. Failure leaves the buffer untouched.
    pub fn export(&self, buffer: &FrameBuffer, path: impl AsRef<Path>) -> RenderResult<()> {
        export_frame(self.engine.as_ref(), buffer, path.as_ref())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("engine", &self.engine.name()).finish()
    }
}
