use core::fmt::{Debug, Display};

/// Wire value of a class id that stands for a null pointer.
pub const NULL_POINTER_TAG: i16 = -1;

// -----------------------------------------------------------------------------
// ClassId

/// Session-local index of a class.
///
/// Assigned densely, in the order classes are first encountered in the
/// stream. Reader and writer assign the same ids because they visit the
/// classes in the same order.
///
/// On the wire a class id is an `i16` so that [`NULL_POINTER_TAG`] fits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClassId(u16);

impl ClassId {
    /// The largest number of classes a single stream can mention.
    pub const MAX_CLASSES: usize = i16::MAX as usize + 1;

    #[inline(always)]
    pub(crate) const fn from_index(index: usize) -> Self {
        debug_assert!(index < Self::MAX_CLASSES);
        Self(index as u16)
    }

    /// Gets the index of the class in the session table.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The value written into the stream.
    #[inline(always)]
    pub const fn to_wire(self) -> i16 {
        self.0 as i16
    }
}

impl Debug for ClassId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl Display for ClassId {
    #[inline(always)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// -----------------------------------------------------------------------------
// ObjectId

/// Session-local index of a tracked object.
///
/// Assigned densely in the order tracked objects first appear. An incoming
/// id smaller than the number of known objects is a back-reference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    #[inline(always)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Gets the index of the object in the session table.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The value written into the stream.
    #[inline(always)]
    pub const fn to_wire(self) -> u32 {
        self.0
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl Display for ObjectId {
    #[inline(always)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
