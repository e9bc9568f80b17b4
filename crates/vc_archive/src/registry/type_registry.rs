use core::any::TypeId;

use crate::class::{Archived, ClassInfo, TypeKey};
use crate::hash::{HashMap, new_map};
use crate::registry::ClassResolver;

// -----------------------------------------------------------------------------
// TypeRegistry

/// Process-wide store of the classes that can be loaded through pointers.
///
/// Registration is idempotent: registering a type again returns the key of
/// the existing entry and changes nothing. Sessions do not own the registry,
/// they borrow it as a [`ClassResolver`] for their whole lifetime.
///
/// Registering a class has one more effect: classes declared with
/// [`Tracking::WhenPointer`](crate::Tracking::WhenPointer) become tracked.
///
/// # Example
///
/// ```
/// use vc_archive::{Archived, ArchiveError, InputArchive, OutputArchive, TypeRegistry};
///
/// struct Circle(f64);
///
/// impl Archived for Circle {
///     const POLYMORPHIC: bool = true;
///     const EXPORT_NAME: Option<&'static str> = Some("shape::Circle");
///
///     fn construct() -> Self {
///         Circle(0.0)
///     }
///     fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
///         ar.load(&mut self.0)
///     }
///     fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
///         ar.save(&self.0)
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// let key = registry.register::<Circle>();
///
/// assert_eq!(registry.register::<Circle>(), key);
/// assert!(registry.get_with_export_name("shape::Circle").is_some());
/// ```
#[derive(Debug)]
pub struct TypeRegistry {
    classes: HashMap<TypeId, ClassInfo>,
    type_path_to_id: HashMap<&'static str, TypeId>,
    export_name_to_id: HashMap<&'static str, TypeId>,
    #[cfg(feature = "auto_register")]
    auto_registered: bool,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`] .
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create an empty [`TypeRegistry`].
    #[inline]
    pub const fn new() -> Self {
        Self {
            classes: new_map(),
            type_path_to_id: new_map(),
            export_name_to_id: new_map(),
            #[cfg(feature = "auto_register")]
            auto_registered: false,
        }
    }

    /// Registers `T` if it is not registered yet.
    ///
    /// Returns the key of `T` in either case.
    #[inline]
    pub fn register<T: Archived>(&mut self) -> TypeKey {
        if let Some(existing) = self.classes.get(&TypeId::of::<T>()) {
            return existing.key();
        }
        self.insert(ClassInfo::of::<T>())
    }

    /// Registers a class description if its type is not registered yet.
    ///
    /// An existing entry is left untouched, even if `class` carries a
    /// different export name. Returns the key of the type in either case.
    pub fn insert(&mut self, class: ClassInfo) -> TypeKey {
        let key = class.key();
        if self.classes.contains_key(&key.type_id()) {
            return key;
        }

        self.type_path_to_id.insert(key.type_path(), key.type_id());

        if let Some(name) = class.export_name() {
            match self.export_name_to_id.get(name) {
                Some(other) => {
                    log::warn!(
                        "export name `{name}` of `{}` is already taken by `{}`, keeping the first",
                        key.type_path(),
                        self.classes
                            .get(other)
                            .map(ClassInfo::type_path)
                            .unwrap_or("<unknown>"),
                    );
                }
                None => {
                    self.export_name_to_id.insert(name, key.type_id());
                }
            }
        }

        log::trace!("registered class `{}`", key.type_path());
        self.classes.insert(key.type_id(), class);
        key
    }

    /// Registers every class exported through [`export_class!`](crate::export_class).
    ///
    /// Repeated calls are cheap and will not insert duplicates.
    ///
    /// Returns `true` if automatic registration works on the current platform.
    /// Without the `auto_register` feature this does nothing and returns `false`.
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            if self.auto_registered {
                return true;
            }
            self.auto_registered = super::auto_register::register_exported(self);
            self.auto_registered
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    /// Whether the type with given [`TypeId`] has been registered.
    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.classes.contains_key(&type_id)
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&ClassInfo> {
        self.classes.get(&type_id)
    }

    /// Returns the class registered under the given full type path.
    pub fn get_with_type_path(&self, type_path: &str) -> Option<&ClassInfo> {
        match self.type_path_to_id.get(type_path) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Returns the class registered under the given export name.
    pub fn get_with_export_name(&self, name: &str) -> Option<&ClassInfo> {
        match self.export_name_to_id.get(name) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Number of registered classes.
    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns an iterator over the registered classes, in arbitrary order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ClassInfo> {
        self.classes.values()
    }
}

impl ClassResolver for TypeRegistry {
    #[inline]
    fn resolve_by_name(&self, name: &str) -> Option<&ClassInfo> {
        self.get_with_export_name(name)
    }

    #[inline]
    fn is_registered(&self, type_id: TypeId) -> bool {
        self.contains(type_id)
    }
}

// -----------------------------------------------------------------------------
// TypeRegistryArc

#[cfg(feature = "std")]
pub use arc::TypeRegistryArc;

#[cfg(feature = "std")]
mod arc {
    use std::sync::{Arc, PoisonError};
    use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

    use super::TypeRegistry;

    /// A [`TypeRegistry`] shared between threads.
    ///
    /// Registration takes the write lock, sessions run against a read guard:
    ///
    /// ```
    /// use vc_archive::TypeRegistryArc;
    ///
    /// let shared = TypeRegistryArc::default();
    /// shared.write().register::<u32>();
    ///
    /// let registry = shared.read();
    /// assert_eq!(registry.len(), 1);
    /// ```
    #[derive(Clone, Default)]
    pub struct TypeRegistryArc {
        /// The wrapped [`TypeRegistry`].
        pub internal: Arc<RwLock<TypeRegistry>>,
    }

    impl TypeRegistryArc {
        /// Takes a read lock on the underlying [`TypeRegistry`].
        pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
            self.internal.read().unwrap_or_else(PoisonError::into_inner)
        }

        /// Takes a write lock on the underlying [`TypeRegistry`].
        pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
            self.internal
                .write()
                .unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl core::fmt::Debug for TypeRegistryArc {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            let registry = self.read();
            f.debug_list()
                .entries(registry.iter().map(|class| class.type_path()))
                .finish()
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
