//! Single-owner handles to engine resources.
//!
//! An [`OwnedHandle`] is the only thing allowed to release an engine
//! resource. It moves `active -> disposed` exactly once, either through
//! [`OwnedHandle::dispose`] or on drop, and refuses to hand out the raw
//! pointer afterwards.

use std::fmt;
use std::sync::Arc;

use crate::engine::{Engine, RawHandle};
use crate::error::{RenderError, RenderResult};
use crate::ffi::RawPtr;

/// Which engine resource a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Material,
    Scene,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Material => f.write_str("material"),
            ResourceKind::Scene => f.write_str("scene"),
        }
    }
}

/// Observable state of a handle. Construction either yields `Active` or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Disposed,
}

/// Owns exactly one engine resource and releases it exactly once.
pub(crate) struct OwnedHandle {
    raw: Option<RawHandle>,
    kind: ResourceKind,
    engine: Arc<dyn Engine>,
}

impl OwnedHandle {
    /// Take ownership of a pointer fresh from an engine constructor.
    pub(crate) fn adopt(engine: Arc<dyn Engine>, kind: ResourceKind, ptr: RawPtr) -> RenderResult<Self> {
        let raw = RawHandle::new(ptr).ok_or(RenderError::AllocationFailure { resource: kind })?;
        log::debug!("{} created: {} handle {:#x}", kind, engine.name(), raw.addr());
        Ok(Self {
            raw: Some(raw),
            kind,
            engine,
        })
    }

    pub(crate) fn state(&self) -> LifecycleState {
        if self.raw.is_some() {
            LifecycleState::Active
        } else {
            LifecycleState::Disposed
        }
    }

    pub(crate) fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Borrow the raw pointer for a boundary call.
    ///
    /// The returned value must not outlive the `&self` borrow it came from.
    pub(crate) fn get(&self) -> RenderResult<RawHandle> {
        self.raw
            .ok_or(RenderError::UseAfterDispose { resource: self.kind })
    }

    /// Release the resource. Returns `true` if this call did the release,
    /// `false` if it had already happened.
    pub(crate) fn dispose(&mut self) -> bool {
        let Some(raw) = self.raw.take() else {
            return false;
        };
        log::debug!("{} released: {} handle {:#x}", self.kind, self.engine.name(), raw.addr());
        // SAFETY: `raw` came from this engine's constructor for this kind and
        // `take()` guarantees it is released only here.
        unsafe {
            match self.kind {
                ResourceKind::Material => self.engine.destroy_material(raw),
                ResourceKind::Scene => self.engine.destroy_scene(raw),
            }
        }
        true
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("kind", &self.kind)
            .field("engine", &self.engine.name())
            .field("raw", &self.raw.map(RawHandle::addr))
            .finish()
    }
}

/// True when two engine references point at the same engine instance.
pub(crate) fn same_engine(a: &Arc<dyn Engine>, b: &Arc<dyn Engine>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
