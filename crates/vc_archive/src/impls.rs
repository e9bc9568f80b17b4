use alloc::string::String;
use alloc::vec::Vec;

use crate::class::Archived;
use crate::de::InputArchive;
use crate::error::ArchiveError;
use crate::flags::{ImplementationLevel, Tracking};
use crate::ptr::ObjectPtr;
use crate::ser::OutputArchive;

// -----------------------------------------------------------------------------
// Primitives

macro_rules! impl_primitive {
    ($($ty:ty => $read:ident, $write:ident;)*) => {
        $(
            impl Archived for $ty {
                const TRACKING: Tracking = Tracking::Never;
                const LEVEL: ImplementationLevel = ImplementationLevel::Primitive;

                #[inline]
                fn construct() -> Self {
                    Default::default()
                }

                #[inline]
                fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
                    *self = ar.reader().$read()?;
                    Ok(())
                }

                #[inline]
                fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
                    ar.writer().$write(*self)
                }
            }
        )*
    };
}

impl_primitive! {
    bool => read_bool, write_bool;
    u8 => read_u8, write_u8;
    u16 => read_u16, write_u16;
    u32 => read_u32, write_u32;
    u64 => read_u64, write_u64;
    i8 => read_i8, write_i8;
    i16 => read_i16, write_i16;
    i32 => read_i32, write_i32;
    i64 => read_i64, write_i64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
    char => read_char, write_char;
}

impl Archived for String {
    const TRACKING: Tracking = Tracking::Never;
    const LEVEL: ImplementationLevel = ImplementationLevel::Primitive;

    #[inline]
    fn construct() -> Self {
        String::new()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        *self = ar.reader().read_string()?;
        Ok(())
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.writer().write_str(self)
    }
}

// -----------------------------------------------------------------------------
// Collections

/// Length, item version, then the elements.
///
/// Elements are loaded into a temporary and moved into the vector, the
/// session is told about each move so that back-references to tracked
/// elements land in the vector. Storage is reserved up front, bounded by
/// [`ArchiveReader::remaining_hint`](crate::ArchiveReader::remaining_hint).
impl<T: Archived> Archived for Vec<T> {
    const TRACKING: Tracking = Tracking::Never;
    const LEVEL: ImplementationLevel = ImplementationLevel::Serializable;

    #[inline]
    fn construct() -> Self {
        Vec::new()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        let len = ar.reader().read_len()?;
        // Item version, unused by the current element encodings.
        let _ = ar.reader().read_version()?;

        // The claimed length is untrusted, never reserve past the input.
        let reserve = ar.reader().remaining_hint().map_or(len, |hint| len.min(hint));
        self.clear();
        self.try_reserve_exact(reserve)
            .map_err(|_| ArchiveError::AllocationFailure {
                type_path: core::any::type_name::<T>(),
                size: reserve.saturating_mul(size_of::<T>()),
            })?;

        for _ in 0..len {
            let mut item = T::construct();
            ar.load(&mut item)?;
            let old = ObjectPtr::from_mut(&mut item);
            self.push(item);
            if T::LEVEL != ImplementationLevel::Primitive
                && let Some(last) = self.last_mut()
            {
                ar.reset_object_address(ObjectPtr::from_mut(last), old);
            }
        }
        Ok(())
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.writer().write_len(self.len())?;
        ar.writer().write_version(T::VERSION)?;
        self.iter().try_for_each(|item| ar.save(item))
    }
}

/// Presence flag, then the value.
impl<T: Archived> Archived for Option<T> {
    const TRACKING: Tracking = Tracking::Never;
    const LEVEL: ImplementationLevel = ImplementationLevel::Serializable;

    #[inline]
    fn construct() -> Self {
        None
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        if ar.reader().read_bool()? {
            let value = self.get_or_insert_with(T::construct);
            ar.load(value)
        } else {
            *self = None;
            Ok(())
        }
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.writer().write_bool(self.is_some())?;
        match self {
            Some(value) => ar.save(value),
            None => Ok(()),
        }
    }
}
