//! The output side: flattening an object graph into a stream.
//!
//! An [`OutputSession`] emits exactly the sequence an
//! [`InputSession`](crate::InputSession) with the same flags and registry
//! consumes. Fill code ([`Archived::save`]) sees it as
//! `&mut dyn OutputArchive`.

use core::ptr::NonNull;

use crate::class::{Archived, ClassInfo};
use crate::error::ArchiveError;
use crate::flags::ImplementationLevel;
use crate::ptr::{DynPtr, ObjectPtr};
use crate::stream::ArchiveWriter;

// -----------------------------------------------------------------------------
// Modules

mod class_table;
mod object_table;
mod session;

// -----------------------------------------------------------------------------
// Exports

pub use session::OutputSession;

// -----------------------------------------------------------------------------
// OutputArchive

/// The session interface seen by fill code.
pub trait OutputArchive {
    /// The underlying stream, for writing primitives directly.
    fn writer(&mut self) -> &mut dyn ArchiveWriter;

    /// Save the instance of `class` at `ptr` as a value.
    ///
    /// # Safety
    /// `ptr` must point to a live instance of `class` that is not mutated
    /// for the duration of the call.
    unsafe fn save_object(&mut self, ptr: ObjectPtr, class: &ClassInfo) -> Result<(), ArchiveError>;

    /// Save a pointer whose static type is `base`.
    ///
    /// `None` for `base` stands for an abstract base. The pointee class is
    /// named by its export name when `base` is abstract or polymorphic.
    ///
    /// # Safety
    /// The pointee must be live and not mutated for the duration of the call.
    unsafe fn save_pointer(
        &mut self,
        ptr: Option<DynPtr>,
        base: Option<&ClassInfo>,
    ) -> Result<(), ArchiveError>;
}

impl dyn OutputArchive + '_ {
    /// Save a value.
    #[inline]
    pub fn save<T: Archived>(&mut self, value: &T) -> Result<(), ArchiveError> {
        if T::LEVEL == ImplementationLevel::Primitive {
            return Archived::save(value, self, T::VERSION);
        }
        // SAFETY: `value` is a live `T`, shared-borrowed for the call.
        unsafe { self.save_object(ObjectPtr::from_ref(value), &ClassInfo::of::<T>()) }
    }

    /// Save a pointer to a `T`.
    ///
    /// # Safety
    /// See [`OutputArchive::save_pointer`].
    #[inline]
    pub unsafe fn save_ptr<T: Archived>(
        &mut self,
        ptr: Option<NonNull<T>>,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        unsafe {
            let ptr = ptr.map(|ptr| DynPtr::of(ptr));
            self.save_pointer(ptr, Some(&ClassInfo::of::<T>()))
        }
    }

    /// Save a pointer to an object of any registered class.
    ///
    /// # Safety
    /// See [`OutputArchive::save_pointer`].
    #[inline]
    pub unsafe fn save_dyn_ptr(
        &mut self,
        ptr: Option<DynPtr>,
        base: Option<&ClassInfo>,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        unsafe { self.save_pointer(ptr, base) }
    }
}
