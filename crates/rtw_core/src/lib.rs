//! RTW Core - safe handles around an opaque ray-tracing engine.
//!
//! The engine lives on the far side of a C ABI and owns its own allocator.
//! This crate makes that boundary safe to use:
//!
//! - **Handles**: every engine material and scene is owned by exactly one
//!   wrapper and released exactly once, on `dispose` or drop
//! - **Materials**: a generational arena, so a scene referencing a disposed
//!   material is caught before render instead of dangling
//! - **Render**: one blocking call over a pinned buffer, with progress
//!   notifications filtered to be monotonic and kept on the caller's thread
//! - **Export**: persistence failures are reported without touching the frame
//!
//! # Example
//!
//! ```ignore
//! use rtw_core::{Camera, Context, FrameBuffer};
//! use rtw_math::{Color, Triplet};
//!
//! let ctx = Context::new(engine);
//! let mut materials = ctx.material_registry();
//! let ground = materials.create_lambertian(Color::gray(0.5))?;
//!
//! let mut scene = ctx.create_scene()?;
//! scene.add_sphere(&materials, Triplet::new(0.0, -1000.0, 0.0), 1000.0, ground)?;
//!
//! let camera = Camera::new().with_resolution(500, 16.0 / 9.0);
//! let mut buffer = FrameBuffer::for_camera(&camera)?;
//! ctx.render(&camera, &mut scene, &materials, &mut buffer, |p| {
//!     println!("{}/{}", p.samples_completed, p.samples_per_pixel);
//! })?;
//! ctx.export(&buffer, "output.png")?;
//! ```

pub mod camera;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod framebuffer;
pub mod lifecycle;
pub mod material;
pub mod scene;
pub mod session;

mod context;
mod export;
mod render;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use camera::{buffer_size, image_height, Camera};
pub use context::Context;
#[cfg(feature = "native")]
pub use engine::NativeEngine;
pub use engine::{Engine, RawHandle};
pub use error::{RenderError, RenderResult};
pub use framebuffer::FrameBuffer;
pub use lifecycle::{LifecycleState, ResourceKind};
pub use material::{Material, MaterialId, MaterialKind, MaterialRegistry};
pub use render::{FrameView, Progress, RenderReport};
pub use scene::{Scene, Sphere};
pub use session::{LogObserver, RenderObserver, RenderOutcome, RenderSession, Silent};
