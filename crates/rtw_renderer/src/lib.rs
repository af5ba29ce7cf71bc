//! RTW software engine.
//!
//! An in-process [`Engine`](rtw_core::Engine) that needs no native library:
//! progressive preview shading over a flat sphere list, one pass per sample,
//! with PNG export through the `image` crate.
//!
//! ```no_run
//! use rtw_core::{Camera, Context, FrameBuffer};
//! use rtw_math::{Color, Triplet};
//! use rtw_renderer::SoftwareEngine;
//!
//! let ctx = Context::new(SoftwareEngine::new());
//! let mut materials = ctx.material_registry();
//! let ground = materials.create_lambertian(Color::gray(0.5)).unwrap();
//! let mut scene = ctx.create_scene().unwrap();
//! scene
//!     .add_sphere(&materials, Triplet::new(0.0, -1000.0, 0.0), 1000.0, ground)
//!     .unwrap();
//!
//! let camera = Camera::default();
//! let mut buffer = FrameBuffer::for_camera(&camera).unwrap();
//! ctx.render(&camera, &mut scene, &materials, &mut buffer, |_| {}).unwrap();
//! ctx.export(&buffer, "out.png").unwrap();
//! ```

mod camera;
mod engine;
mod material;
mod renderer;
mod sphere;

pub use camera::RayCamera;
pub use engine::{EngineStats, SoftwareEngine, DEFAULT_SEED};
pub use material::SoftMaterial;
pub use renderer::{color_to_rgba, linear_to_gamma, ray_color, sky_gradient, Accumulator};
pub use sphere::{HitRecord, SoftScene, SoftSphere};
