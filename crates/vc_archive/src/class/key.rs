use core::any::TypeId;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::class::Archived;

/// Stable identifier of an archived type.
///
/// Two keys are equal iff they denote the same static type. The order is
/// total: by type path first, then by [`TypeId`] for the rare case of two
/// types sharing a path (e.g. different versions of one crate).
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_path: &'static str,
}

impl TypeKey {
    /// Key of `T`.
    #[inline]
    pub fn of<T: Archived>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_path: T::type_path(),
        }
    }

    /// The runtime type id.
    #[inline(always)]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The full type path, `core::any::type_name` unless overridden.
    #[inline(always)]
    pub const fn type_path(&self) -> &'static str {
        self.type_path
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.type_id == other.type_id {
            return Ordering::Equal;
        }
        self.type_path
            .cmp(other.type_path)
            .then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_path)
    }
}

impl fmt::Display for TypeKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_path)
    }
}

// -----------------------------------------------------------------------------
// Tests
