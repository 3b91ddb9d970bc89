//! # Resource Handles
//!
//! A handle is an `(id, kind)` pair. Id `0` is reserved for
//! [`ResourceHandle::INVALID`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::kind::ResourceKind;
use crate::registry::ResourceRegistry;

/// Opaque reference to a registry-managed resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u32,
    kind: ResourceKind,
}

impl ResourceHandle {
    /// The "no resource" handle.
    pub const INVALID: Self = Self {
        id: 0,
        kind: ResourceKind::Unknown,
    };

    #[inline]
    pub(crate) const fn new(id: u32, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    /// Registry-unique id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Kind of the resource.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> ResourceKind {
        self.kind
    }

    /// Returns `false` for [`INVALID`](Self::INVALID).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.id != 0
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}#{}", self.kind, self.id)
        } else {
            f.write_str("invalid")
        }
    }
}

/// Holds one reference to a resource for its lifetime.
///
/// Releases the reference on drop. Moveable, not clonable.
///
/// # Example
///
/// ```rust,ignore
/// let guard = registry.load_scoped("/textures/grass.png", ResourceKind::Texture)?;
/// let bytes = guard.get_as::<Vec<u8>>();
/// // released here
/// ```
pub struct ResourceGuard<'a> {
    registry: &'a ResourceRegistry,
    handle: ResourceHandle,
}

impl<'a> ResourceGuard<'a> {
    /// Takes an additional reference to `handle`.
    #[must_use]
    pub fn new(registry: &'a ResourceRegistry, handle: ResourceHandle) -> Self {
        registry.add_ref(handle);
        Self { registry, handle }
    }

    /// Wraps a reference the caller already owns.
    pub(crate) fn adopt(registry: &'a ResourceRegistry, handle: ResourceHandle) -> Self {
        Self { registry, handle }
    }

    /// The guarded handle.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> ResourceHandle {
        self.handle
    }

    /// The resource's data, if loaded.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.registry.get(self.handle)
    }

    /// The resource's data downcast to `T`, if loaded and of that type.
    #[must_use]
    pub fn get_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.registry.get_as(self.handle)
    }

    /// Gives up the guard without releasing, returning the handle.
    #[must_use]
    pub fn into_handle(self) -> ResourceHandle {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(self.handle);
    }
}

impl fmt::Debug for ResourceGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceGuard").field(&self.handle).finish()
    }
}
