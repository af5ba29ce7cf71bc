//! Error types for boundary operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::ResourceKind;

/// Errors raised by the wrapper before, during or after a boundary call.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The engine returned a null handle from a constructor.
    #[error("engine failed to allocate a {resource}")]
    AllocationFailure { resource: ResourceKind },

    /// The handle was disposed; the call never reached the engine.
    #[error("{resource} used after dispose")]
    UseAfterDispose { resource: ResourceKind },

    /// A caller-supplied value is outside its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The resource belongs to a different registry or engine.
    #[error("{resource} belongs to a different registry or engine")]
    ForeignResource { resource: ResourceKind },

    /// The engine could not persist the image. Buffer and scene remain valid.
    #[error("failed to export image to {}: engine status {status}", path.display())]
    ExportFailure { path: PathBuf, status: i32 },
}

impl RenderError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        RenderError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Export failures leave every resource usable; everything else aborts the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::ExportFailure { .. })
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
