use alloc::boxed::Box;
use core::alloc::Layout;
use core::any::TypeId;
use core::fmt;
use core::ptr::NonNull;

use crate::class::{Archived, TypeKey};
use crate::de::InputArchive;
use crate::error::ArchiveError;
use crate::flags::{ArchiveFlags, ImplementationLevel, Tracking};
use crate::ptr::ObjectPtr;
use crate::registry::ClassResolver;
use crate::ser::OutputArchive;

type LoadFn = unsafe fn(&mut dyn InputArchive, ObjectPtr, u32) -> Result<(), ArchiveError>;
type SaveFn = unsafe fn(&mut dyn OutputArchive, ObjectPtr, u32) -> Result<(), ArchiveError>;

// -----------------------------------------------------------------------------
// ClassInfo

/// Type-erased description of an [`Archived`] type.
///
/// Holds the class declaration together with function pointers that
/// allocate, destroy, load and save instances through an [`ObjectPtr`].
/// It is `Copy`, sessions keep their own copies in their class tables.
///
/// # Example
///
/// ```
/// use vc_archive::{ClassInfo, ImplementationLevel};
///
/// let info = ClassInfo::of::<u32>();
/// assert_eq!(info.type_path(), "u32");
/// assert_eq!(info.level(), ImplementationLevel::Primitive);
/// ```
#[derive(Clone, Copy)]
pub struct ClassInfo {
    key: TypeKey,
    export_name: Option<&'static str>,
    polymorphic: bool,
    version: u32,
    tracking: Tracking,
    level: ImplementationLevel,
    layout: Layout,
    allocate: fn() -> Option<ObjectPtr>,
    destroy: unsafe fn(ObjectPtr),
    load: LoadFn,
    save: SaveFn,
}

impl ClassInfo {
    /// Describe `T`.
    pub fn of<T: Archived>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            export_name: T::EXPORT_NAME,
            polymorphic: T::POLYMORPHIC,
            version: T::VERSION,
            tracking: T::TRACKING,
            level: T::LEVEL,
            layout: Layout::new::<T>(),
            allocate: allocate_fn::<T>,
            destroy: destroy_fn::<T>,
            load: load_fn::<T>,
            save: save_fn::<T>,
        }
    }

    /// Replace the export name, e.g. to register a type under a name
    /// chosen by the application.
    #[inline]
    pub const fn with_export_name(mut self, name: &'static str) -> Self {
        self.export_name = Some(name);
        self
    }

    #[inline(always)]
    pub const fn key(&self) -> TypeKey {
        self.key
    }

    #[inline(always)]
    pub const fn type_id(&self) -> TypeId {
        self.key.type_id()
    }

    #[inline(always)]
    pub const fn type_path(&self) -> &'static str {
        self.key.type_path()
    }

    #[inline(always)]
    pub const fn export_name(&self) -> Option<&'static str> {
        self.export_name
    }

    #[inline(always)]
    pub const fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    /// The version this build writes.
    #[inline(always)]
    pub const fn version(&self) -> u32 {
        self.version
    }

    #[inline(always)]
    pub const fn tracking(&self) -> Tracking {
        self.tracking
    }

    #[inline(always)]
    pub const fn level(&self) -> ImplementationLevel {
        self.level
    }

    /// Whether the tracking flag and version are written into the stream.
    #[inline(always)]
    pub fn has_class_info(&self) -> bool {
        self.level == ImplementationLevel::ClassInfo
    }

    #[inline(always)]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns `true` if this describes `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }

    /// Whether instances of this class get an identity in a session
    /// created with `flags` over `resolver`.
    ///
    /// [`Tracking::WhenPointer`] resolves to "registered in the resolver",
    /// since only registered classes can be loaded through pointers.
    pub fn is_tracked(&self, flags: ArchiveFlags, resolver: &dyn ClassResolver) -> bool {
        if self.level == ImplementationLevel::Primitive || flags.contains(ArchiveFlags::NO_TRACKING)
        {
            return false;
        }
        match self.tracking {
            Tracking::Never => false,
            Tracking::Always => true,
            Tracking::WhenPointer => resolver.is_registered(self.type_id()),
        }
    }

    /// Allocate storage and construct a fresh instance in it.
    pub fn allocate(&self) -> Result<ObjectPtr, ArchiveError> {
        (self.allocate)().ok_or(ArchiveError::AllocationFailure {
            type_path: self.type_path(),
            size: self.layout.size(),
        })
    }

    /// Drop the instance and release its storage.
    ///
    /// # Safety
    /// `ptr` must come from [`allocate`](Self::allocate) of this class and
    /// must not be used afterwards.
    #[inline]
    pub unsafe fn destroy(&self, ptr: ObjectPtr) {
        // SAFETY: upheld by the caller.
        unsafe { (self.destroy)(ptr) }
    }

    /// Fill the instance at `ptr` from `ar`.
    ///
    /// # Safety
    /// `ptr` must point to a live instance of this class that is not
    /// borrowed elsewhere for the duration of the call.
    #[inline]
    pub unsafe fn load(
        &self,
        ar: &mut dyn InputArchive,
        ptr: ObjectPtr,
        file_version: u32,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        unsafe { (self.load)(ar, ptr, file_version) }
    }

    /// Write the instance at `ptr` into `ar`.
    ///
    /// # Safety
    /// `ptr` must point to a live instance of this class that is not
    /// mutably borrowed for the duration of the call.
    #[inline]
    pub unsafe fn save(
        &self,
        ar: &mut dyn OutputArchive,
        ptr: ObjectPtr,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        unsafe { (self.save)(ar, ptr, self.version) }
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("type_path", &self.type_path())
            .field("export_name", &self.export_name)
            .field("polymorphic", &self.polymorphic)
            .field("version", &self.version)
            .field("tracking", &self.tracking)
            .field("level", &self.level)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Erased functions

fn allocate_fn<T: Archived>() -> Option<ObjectPtr> {
    let layout = Layout::new::<T>();
    let ptr = if layout.size() == 0 {
        NonNull::<T>::dangling()
    } else {
        // SAFETY: the layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc::alloc(layout) }.cast::<T>())?
    };
    // SAFETY: freshly allocated with the layout of `T`.
    unsafe { ptr.as_ptr().write(T::construct()) };
    Some(ObjectPtr::from(ptr))
}

unsafe fn destroy_fn<T: Archived>(ptr: ObjectPtr) {
    // SAFETY: `allocate_fn` uses the global allocator with `Layout::new::<T>()`,
    // which is exactly what `Box<T>` expects.
    drop(unsafe { Box::from_raw(ptr.cast::<T>().as_ptr()) });
}

unsafe fn load_fn<T: Archived>(
    ar: &mut dyn InputArchive,
    ptr: ObjectPtr,
    file_version: u32,
) -> Result<(), ArchiveError> {
    // SAFETY: the caller guarantees a live, unborrowed `T`.
    let value = unsafe { ptr.as_mut::<T>() };
    value.load(ar, file_version)
}

unsafe fn save_fn<T: Archived>(
    ar: &mut dyn OutputArchive,
    ptr: ObjectPtr,
    version: u32,
) -> Result<(), ArchiveError> {
    // SAFETY: the caller guarantees a live `T`.
    let value = unsafe { ptr.as_ref::<T>() };
    value.save(ar, version)
}
