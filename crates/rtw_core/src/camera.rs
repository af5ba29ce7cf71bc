//! Camera configuration and the image dimensions derived from it.

use rtw_math::Triplet;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::ffi::CameraConfig;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Viewpoint, lens and sampling parameters for one render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Ratio of image width over height
    pub aspect_ratio: f64,
    /// Rendered image width in pixels
    pub image_width: u32,
    /// Random samples per pixel
    pub samples_per_pixel: u32,
    /// Maximum ray bounces into the scene
    pub max_depth: u32,

    /// Vertical field of view in degrees
    pub vfov: f64,
    pub lookfrom: Triplet,
    pub lookat: Triplet,
    /// Camera-relative "up" direction
    pub vup: Triplet,

    /// Variation angle of rays through each pixel
    pub defocus_angle: f64,
    /// Distance from the camera to the plane of perfect focus
    pub focus_dist: f64,
}

impl Default for Camera {
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

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set image width and aspect ratio.
    pub fn with_resolution(mut self, image_width: u32, aspect_ratio: f64) -> Self {
        self.image_width = image_width;
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set sampling settings.
    pub fn with_quality(mut self, samples_per_pixel: u32, max_depth: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self.max_depth = max_depth;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, lookfrom: Triplet, lookat: Triplet, vup: Triplet) -> Self {
        self.lookfrom = lookfrom;
        self.lookat = lookat;
        self.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f64, defocus_angle: f64, focus_dist: f64) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self
    }

    /// Derived image height, see [`image_height`].
    pub fn image_height(&self) -> RenderResult<u32> {
        image_height(self.image_width, self.aspect_ratio)
    }

    /// Size in bytes of the RGBA8 buffer this camera renders into.
    pub fn buffer_size(&self) -> RenderResult<usize> {
        buffer_size(self.image_width, self.aspect_ratio)
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> RenderResult<()> {
        self.buffer_size()?;
        if self.samples_per_pixel == 0 {
            return Err(RenderError::invalid("samples_per_pixel", "must be > 0"));
        }
        to_i32("samples_per_pixel", self.samples_per_pixel)?;
        to_i32("max_depth", self.max_depth)?;
        if !self.vfov.is_finite() {
            return Err(RenderError::invalid("vfov", format!("must be finite, got {}", self.vfov)));
        }
        if !self.defocus_angle.is_finite() || self.defocus_angle < 0.0 {
            return Err(RenderError::invalid(
                "defocus_angle",
                format!("must be finite and >= 0, got {}", self.defocus_angle),
            ));
        }
        if !self.focus_dist.is_finite() || self.focus_dist <= 0.0 {
            return Err(RenderError::invalid(
                "focus_dist",
                format!("must be finite and > 0, got {}", self.focus_dist),
            ));
        }
        for (name, v) in [("lookfrom", self.lookfrom), ("lookat", self.lookat), ("vup", self.vup)] {
            if !v.is_finite() {
                return Err(RenderError::invalid(name, format!("components must be finite, got {:?}", v)));
            }
        }
        Ok(())
    }

    /// Validate and convert to the engine's wire layout.
    pub fn to_config(&self) -> RenderResult<CameraConfig> {
        self.validate()?;
        Ok(CameraConfig {
            aspect_ratio: self.aspect_ratio,
            image_width: to_i32("image_width", self.image_width)?,
            samples_per_pixel: to_i32("samples_per_pixel", self.samples_per_pixel)?,
            max_depth: to_i32("max_depth", self.max_depth)?,
            vfov: self.vfov,
            lookfrom: self.lookfrom,
            lookat: self.lookat,
            vup: self.vup,
            defocus_angle: self.defocus_angle,
            focus_dist: self.focus_dist,
        })
    }
}

fn to_i32(name: &'static str, value: u32) -> RenderResult<i32> {
    i32::try_from(value).map_err(|_| RenderError::invalid(name, format!("{} does not fit in i32", value)))
}

/// Image height for a width and aspect ratio.
///
/// The quotient is truncated toward zero and clamped to at least 1, so
/// width 500 at 16:9 gives 281 and extreme ratios still give one row.
pub fn image_height(image_width: u32, aspect_ratio: f64) -> RenderResult<u32> {
    if image_width == 0 {
        return Err(RenderError::invalid("image_width", "must be > 0"));
    }
    to_i32("image_width", image_width)?;
    if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
        return Err(RenderError::invalid(
            "aspect_ratio",
            format!("must be finite and > 0, got {}", aspect_ratio),
        ));
    }
    let height = (image_width as f64 / aspect_ratio).trunc();
    if height > i32::MAX as f64 {
        return Err(RenderError::invalid(
            "aspect_ratio",
            format!("{} gives an image height that does not fit in i32", aspect_ratio),
        ));
    }
    Ok((height as u32).max(1))
}

/// RGBA8 buffer size in bytes: `image_width * image_height * 4`.
pub fn buffer_size(image_width: u32, aspect_ratio: f64) -> RenderResult<usize> {
    let height = image_height(image_width, aspect_ratio)?;
    (image_width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| RenderError::invalid("aspect_ratio", "buffer size overflows usize"))
}
