//! Caller-owned RGBA8 pixel storage with a fixed address.

use crate::camera::{Camera, BYTES_PER_PIXEL};
use crate::error::{RenderError, RenderResult};

/// RGBA8 image storage handed to the engine.
///
/// Backed by a boxed slice: it is allocated once at its final size and can
/// never grow, so the pixel address stays put for the buffer's whole life.
/// Boundary calls borrow the buffer, which keeps it alive and unmoved until
/// they return.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Box<[u8]>,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer of `width * height * 4` bytes.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::invalid(
                "dimensions",
                format!("must be > 0, got {}x{}", width, height),
            ));
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(RenderError::invalid(
                "dimensions",
                format!("{}x{} does not fit in i32", width, height),
            ));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| RenderError::invalid("dimensions", "buffer size overflows usize"))?;

        Ok(Self {
            width,
            height,
            pixels: vec![0u8; len].into_boxed_slice(),
        })
    }

    /// Allocate a buffer sized for a camera. Fails before allocating if the
    /// camera dimensions are invalid.
    pub fn for_camera(camera: &Camera) -> RenderResult<Self> {
        let height = camera.image_height()?;
        Self::new(camera.image_width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA of one pixel, `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        Some(rgba)
    }

    /// True if this buffer has exactly the dimensions `camera` renders.
    pub fn matches(&self, camera: &Camera) -> bool {
        camera.image_width == self.width && camera.image_height().ok() == Some(self.height)
    }

    /// Start address, for identity checks across the boundary.
    pub fn addr(&self) -> usize {
        self.pixels.as_ptr() as usize
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.pixels.into_vec()
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.pixels.as_ptr()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.pixels.as_mut_ptr()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}
