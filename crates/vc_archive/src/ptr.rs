use core::any::TypeId;
use core::fmt;
use core::ptr::NonNull;

use crate::class::{Archived, ClassInfo};

// -----------------------------------------------------------------------------
// ObjectPtr

/// The address of an archived object, with its type erased.
///
/// Sessions compare these by address to decide object identity. An
/// `ObjectPtr` carries no lifetime: the objects created by an input session
/// outlive it and are owned by whatever the caller links them into.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectPtr(NonNull<u8>);

impl ObjectPtr {
    /// Wrap a raw non-null pointer.
    #[inline(always)]
    pub const fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr)
    }

    /// Address of a mutable reference.
    #[inline(always)]
    pub fn from_mut<T>(value: &mut T) -> Self {
        Self(NonNull::from(value).cast())
    }

    /// Address of a shared reference.
    ///
    /// The result must only be used for reading, as in the output session.
    #[inline(always)]
    pub fn from_ref<T>(value: &T) -> Self {
        Self(NonNull::from(value).cast())
    }

    /// Returns the underlying pointer.
    #[inline(always)]
    pub const fn as_non_null(self) -> NonNull<u8> {
        self.0
    }

    /// Cast to a typed pointer.
    #[inline(always)]
    pub const fn cast<T>(self) -> NonNull<T> {
        self.0.cast()
    }

    /// Numeric address, for comparisons and logging.
    #[inline(always)]
    pub fn addr(self) -> usize {
        self.0.as_ptr().addr()
    }

    /// Move this address from the block starting at `old` to the block starting
    /// at `new`, keeping its displacement inside the block.
    ///
    /// The provenance of the result is taken from `new`.
    #[inline]
    pub(crate) fn rebase(self, old: ObjectPtr, new: ObjectPtr) -> ObjectPtr {
        let displacement = self.addr().wrapping_sub(old.addr()) as isize;
        let moved = new.0.as_ptr().wrapping_byte_offset(displacement);
        // A null result would need a wrapping block, which no allocation is.
        match NonNull::new(moved) {
            Some(ptr) => ObjectPtr(ptr),
            None => new,
        }
    }

    /// Borrow the pointee.
    ///
    /// # Safety
    /// - The pointer must point to a live, initialized `T`.
    /// - No mutable reference to the pointee may exist for `'a`.
    #[inline(always)]
    pub unsafe fn as_ref<'a, T>(self) -> &'a T {
        debug_assert!(self.0.as_ptr().cast::<T>().is_aligned());
        // SAFETY: upheld by the caller.
        unsafe { self.0.cast::<T>().as_ref() }
    }

    /// Mutably borrow the pointee.
    ///
    /// # Safety
    /// - The pointer must point to a live, initialized `T`.
    /// - No other reference to the pointee may exist for `'a`.
    #[inline(always)]
    pub unsafe fn as_mut<'a, T>(self) -> &'a mut T {
        debug_assert!(self.0.as_ptr().cast::<T>().is_aligned());
        // SAFETY: upheld by the caller.
        unsafe { self.0.cast::<T>().as_mut() }
    }
}

impl<T> From<NonNull<T>> for ObjectPtr {
    #[inline(always)]
    fn from(ptr: NonNull<T>) -> Self {
        Self(ptr.cast())
    }
}

impl From<ObjectPtr> for NonNull<u8> {
    #[inline(always)]
    fn from(ptr: ObjectPtr) -> Self {
        ptr.0
    }
}

impl fmt::Pointer for ObjectPtr {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

impl fmt::Debug for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPtr({:?})", self.0)
    }
}

// -----------------------------------------------------------------------------
// DynPtr

/// An object address paired with the class describing its dynamic type.
///
/// This is what a pointer load resolves to when the static type of the
/// pointer does not name the dynamic type (abstract bases, polymorphic
/// classes), and what a polymorphic pointer save consumes.
#[derive(Clone, Copy)]
pub struct DynPtr {
    ptr: ObjectPtr,
    class: ClassInfo,
}

impl DynPtr {
    /// Pair an address with its class.
    ///
    /// # Safety
    /// `ptr` must point to an instance of the type described by `class`
    /// for as long as the result is used.
    #[inline]
    pub const unsafe fn new(ptr: ObjectPtr, class: ClassInfo) -> Self {
        Self { ptr, class }
    }

    /// Pair a typed pointer with the class of `T`.
    ///
    /// # Safety
    /// `ptr` must point to a live `T` for as long as the result is used.
    #[inline]
    pub unsafe fn of<T: Archived>(ptr: NonNull<T>) -> Self {
        Self {
            ptr: ObjectPtr::from(ptr),
            class: ClassInfo::of::<T>(),
        }
    }

    /// The object address.
    #[inline(always)]
    pub const fn ptr(&self) -> ObjectPtr {
        self.ptr
    }

    /// The class of the pointee.
    #[inline(always)]
    pub const fn class(&self) -> &ClassInfo {
        &self.class
    }

    /// Returns `true` if the dynamic type is `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.class.type_id() == TypeId::of::<T>()
    }

    /// Returns the typed pointer if the dynamic type is `T`.
    #[inline]
    pub fn downcast<T: 'static>(&self) -> Option<NonNull<T>> {
        if self.is::<T>() {
            Some(self.ptr.cast())
        } else {
            None
        }
    }

    /// Destroy the pointee and release its storage.
    ///
    /// # Safety
    /// The pointee must have been allocated by [`ClassInfo::allocate`] of the
    /// same class, be owned by the caller and not be used afterwards.
    #[inline]
    pub unsafe fn destroy(self) {
        // SAFETY: upheld by the caller.
        unsafe { self.class.destroy(self.ptr) }
    }
}

impl PartialEq for DynPtr {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.class.key() == other.class.key()
    }
}

impl Eq for DynPtr {}

impl fmt::Debug for DynPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynPtr({}, {:?})", self.class.type_path(), self.ptr.0)
    }
}
