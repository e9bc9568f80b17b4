//! Type registry for resolving classes by name.
//!
//! ## Menu
//!
//! - [`TypeRegistry`]: the store of registered [`ClassInfo`]s.
//! - [`ClassResolver`]: the capability a session needs from a registry.
//! - [`TypeRegistryArc`]: a registry behind `Arc<RwLock<_>>`, requires `std`.
//! - [`export_class!`](crate::export_class): static registration, requires `auto_register`.
//!
//! ## auto_register
//!
//! See [`TypeRegistry::auto_register`] .
//!
//! We use the [`inventory`] crate to implement static registration,
//! not all platforms support it (although major platforms do).
//! If it is not supported, `auto_register` returns `false` and registers nothing.

use core::any::TypeId;

use crate::class::ClassInfo;

// -----------------------------------------------------------------------------
// Modules

mod type_registry;

#[cfg(feature = "auto_register")]
#[doc(hidden)]
pub mod auto_register;

/// Register a class for [`TypeRegistry::auto_register`].
///
/// The `auto_register` feature is disabled, this expands to nothing.
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! export_class {
    ($ty:ty) => {};
}

// -----------------------------------------------------------------------------
// Exports

pub use type_registry::TypeRegistry;

#[cfg(feature = "std")]
pub use type_registry::TypeRegistryArc;

// -----------------------------------------------------------------------------
// ClassResolver

/// What a session needs to know about the classes outside its stream.
///
/// Implemented by [`TypeRegistry`]. A session borrows a resolver for its whole
/// lifetime, so an application may also implement this over its own tables.
pub trait ClassResolver {
    /// Find the class of a polymorphic pointee by its export name.
    fn resolve_by_name(&self, name: &str) -> Option<&ClassInfo>;

    /// Whether the class can be loaded through a pointer.
    fn is_registered(&self, type_id: TypeId) -> bool;
}

impl<R: ClassResolver + ?Sized> ClassResolver for &R {
    #[inline]
    fn resolve_by_name(&self, name: &str) -> Option<&ClassInfo> {
        (**self).resolve_by_name(name)
    }

    #[inline]
    fn is_registered(&self, type_id: TypeId) -> bool {
        (**self).is_registered(type_id)
    }
}
