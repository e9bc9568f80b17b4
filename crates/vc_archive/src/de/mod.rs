//! The input side: rebuilding an object graph from a stream.
//!
//! An [`InputSession`] drives one stream. Fill code ([`Archived::load`])
//! only sees it as `&mut dyn InputArchive` and uses the helpers on
//! `dyn InputArchive` to read nested values and pointers.
//!
//! ## Ownership
//!
//! Objects created by pointer loads belong to the session until the
//! outermost call returns. On success they belong to the caller, who must
//! free them (usually through [`DynPtr::destroy`]). On failure the session
//! destroys all of them before returning the error, so the value passed to
//! the failed call may hold dangling pointers and must not be followed.

use core::ptr::NonNull;

use crate::class::{Archived, ClassInfo};
use crate::error::ArchiveError;
use crate::flags::ImplementationLevel;
use crate::ptr::{DynPtr, ObjectPtr};
use crate::stream::ArchiveReader;

// -----------------------------------------------------------------------------
// Modules

mod class_table;
mod ledger;
mod object_table;
mod session;

// -----------------------------------------------------------------------------
// Exports

pub use class_table::ClassEntry;
pub use session::InputSession;

// -----------------------------------------------------------------------------
// InputArchive

/// The session interface seen by fill code.
pub trait InputArchive {
    /// The underlying stream, for reading primitives directly.
    fn reader(&mut self) -> &mut dyn ArchiveReader;

    /// Library version of the stream header.
    ///
    /// [`LIBRARY_VERSION`](crate::LIBRARY_VERSION) for streams without header.
    fn library_version(&self) -> u16;

    /// Load a value of `class` into the live instance at `ptr`.
    ///
    /// # Safety
    /// `ptr` must point to a live instance of `class` that is not borrowed
    /// elsewhere for the duration of the call.
    unsafe fn load_object(&mut self, ptr: ObjectPtr, class: &ClassInfo) -> Result<(), ArchiveError>;

    /// Load a pointer whose static type is `base`.
    ///
    /// `None` for `base` stands for an abstract base: the dynamic class is
    /// always resolved by its export name. Returns `None` for a null pointer.
    fn load_pointer(&mut self, base: Option<&ClassInfo>) -> Result<Option<DynPtr>, ArchiveError>;

    /// Tell the session that the most recently loaded value moved from
    /// `old` to `new`, so that later back-references to it (or to tracked
    /// values inside it) resolve to the new location.
    fn reset_object_address(&mut self, new: ObjectPtr, old: ObjectPtr);
}

impl dyn InputArchive + '_ {
    /// Load a value in place.
    #[inline]
    pub fn load<T: Archived>(&mut self, value: &mut T) -> Result<(), ArchiveError> {
        if T::LEVEL == ImplementationLevel::Primitive {
            return Archived::load(value, self, T::VERSION);
        }
        // SAFETY: `value` is a live `T`, exclusively borrowed for the call.
        unsafe { self.load_object(ObjectPtr::from_mut(value), &ClassInfo::of::<T>()) }
    }

    /// Load a pointer to a `T`.
    ///
    /// Fails with [`ArchiveError::TypeMismatch`] when the stream holds an
    /// object of another class, use [`load_dyn_ptr`](Self::load_dyn_ptr)
    /// for polymorphic pointers.
    pub fn load_ptr<T: Archived>(&mut self) -> Result<Option<NonNull<T>>, ArchiveError> {
        let base = ClassInfo::of::<T>();
        let Some(loaded) = self.load_pointer(Some(&base))? else {
            return Ok(None);
        };
        match loaded.downcast::<T>() {
            Some(ptr) => Ok(Some(ptr)),
            None => Err(ArchiveError::TypeMismatch {
                expected: base.type_path(),
                found: loaded.class().type_path(),
            }),
        }
    }

    /// Load a pointer to an object of any registered class.
    #[inline]
    pub fn load_dyn_ptr(
        &mut self,
        base: Option<&ClassInfo>,
    ) -> Result<Option<DynPtr>, ArchiveError> {
        self.load_pointer(base)
    }
}
