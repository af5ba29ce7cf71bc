//! Persisting a finished frame through the engine's image writer.

use std::ffi::CString;
use std::path::Path;

use crate::engine::Engine;
use crate::error::{RenderError, RenderResult};
use crate::ffi::SAVE_OK;
use crate::framebuffer::FrameBuffer;

pub(crate) fn export_frame(engine: &dyn Engine, buffer: &FrameBuffer, path: &Path) -> RenderResult<()> {
    let path_str = path
        .to_str()
        .ok_or_else(|| RenderError::invalid("path", format!("{} is not valid UTF-8", path.display())))?;
    let c_path = CString::new(path_str).map_err(|_| RenderError::invalid("path", "contains a NUL byte"))?;

    // FrameBuffer dimensions are checked to fit in i32 at allocation.
    let (width, height) = (buffer.width() as i32, buffer.height() as i32);
    // SAFETY: the buffer holds exactly width * height * 4 bytes and stays
    // borrowed for the call.
    let status = unsafe { engine.save_image(width, height, buffer.as_ptr(), &c_path) };

    if status != SAVE_OK {
        log::warn!("export to {} failed with status {}", path.display(), status);
        return Err(RenderError::ExportFailure {
            path: path.to_path_buf(),
            status,
        });
    }
    log::info!("saved {}x{} image to {}", width, height, path.display());
    Ok(())
}
