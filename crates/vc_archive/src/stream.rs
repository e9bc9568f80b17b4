//! The primitive reads and writes a wire format provides to the sessions.
//!
//! A format only has to implement the data primitives. The session-level
//! reads (class ids, object ids, versions, tracking flags, export names)
//! have default implementations on top of them, a format overrides those
//! when it encodes them differently (e.g. as tagged attributes).
//!
//! Both traits are object safe: fill code sees them as
//! `&mut dyn ArchiveReader` / `&mut dyn ArchiveWriter`.

use alloc::string::String;

use crate::error::{ArchiveError, StreamError};

// -----------------------------------------------------------------------------
// ArchiveReader

/// Pull-based cursor over an archive stream.
pub trait ArchiveReader {
    fn read_bool(&mut self) -> Result<bool, ArchiveError>;
    fn read_u8(&mut self) -> Result<u8, ArchiveError>;
    fn read_u16(&mut self) -> Result<u16, ArchiveError>;
    fn read_u32(&mut self) -> Result<u32, ArchiveError>;
    fn read_u64(&mut self) -> Result<u64, ArchiveError>;
    fn read_i8(&mut self) -> Result<i8, ArchiveError>;
    fn read_i16(&mut self) -> Result<i16, ArchiveError>;
    fn read_i32(&mut self) -> Result<i32, ArchiveError>;
    fn read_i64(&mut self) -> Result<i64, ArchiveError>;
    fn read_f32(&mut self) -> Result<f32, ArchiveError>;
    fn read_f64(&mut self) -> Result<f64, ArchiveError>;
    fn read_string(&mut self) -> Result<String, ArchiveError>;

    fn read_char(&mut self) -> Result<char, ArchiveError> {
        let v = self.read_u32()?;
        char::from_u32(v).ok_or(ArchiveError::Malformed(StreamError::InvalidChar(v)))
    }

    /// A collection length.
    fn read_len(&mut self) -> Result<usize, ArchiveError> {
        let v = self.read_u64()?;
        usize::try_from(v).map_err(|_| ArchiveError::Malformed(StreamError::LengthOverflow(v)))
    }

    /// Upper bound on the number of items left in the stream, if known.
    ///
    /// Containers reserve at most this many slots up front, whatever length
    /// the stream claims.
    #[inline]
    fn remaining_hint(&self) -> Option<usize> {
        None
    }

    /// A class id, or [`NULL_POINTER_TAG`](crate::NULL_POINTER_TAG).
    #[inline]
    fn read_class_id(&mut self) -> Result<i16, ArchiveError> {
        self.read_i16()
    }

    /// The redundant class id in front of a class preamble.
    #[inline]
    fn read_class_id_optional(&mut self) -> Result<i16, ArchiveError> {
        self.read_i16()
    }

    #[inline]
    fn read_object_id(&mut self) -> Result<u32, ArchiveError> {
        self.read_u32()
    }

    #[inline]
    fn read_version(&mut self) -> Result<u32, ArchiveError> {
        self.read_u32()
    }

    #[inline]
    fn read_tracking(&mut self) -> Result<bool, ArchiveError> {
        self.read_bool()
    }

    #[inline]
    fn read_export_name(&mut self) -> Result<String, ArchiveError> {
        self.read_string()
    }
}

// -----------------------------------------------------------------------------
// ArchiveWriter

/// Push-based sink of an archive stream.
pub trait ArchiveWriter {
    fn write_bool(&mut self, v: bool) -> Result<(), ArchiveError>;
    fn write_u8(&mut self, v: u8) -> Result<(), ArchiveError>;
    fn write_u16(&mut self, v: u16) -> Result<(), ArchiveError>;
    fn write_u32(&mut self, v: u32) -> Result<(), ArchiveError>;
    fn write_u64(&mut self, v: u64) -> Result<(), ArchiveError>;
    fn write_i8(&mut self, v: i8) -> Result<(), ArchiveError>;
    fn write_i16(&mut self, v: i16) -> Result<(), ArchiveError>;
    fn write_i32(&mut self, v: i32) -> Result<(), ArchiveError>;
    fn write_i64(&mut self, v: i64) -> Result<(), ArchiveError>;
    fn write_f32(&mut self, v: f32) -> Result<(), ArchiveError>;
    fn write_f64(&mut self, v: f64) -> Result<(), ArchiveError>;
    fn write_str(&mut self, v: &str) -> Result<(), ArchiveError>;

    #[inline]
    fn write_char(&mut self, v: char) -> Result<(), ArchiveError> {
        self.write_u32(v as u32)
    }

    #[inline]
    fn write_len(&mut self, len: usize) -> Result<(), ArchiveError> {
        self.write_u64(len as u64)
    }

    #[inline]
    fn write_class_id(&mut self, v: i16) -> Result<(), ArchiveError> {
        self.write_i16(v)
    }

    #[inline]
    fn write_class_id_optional(&mut self, v: i16) -> Result<(), ArchiveError> {
        self.write_i16(v)
    }

    #[inline]
    fn write_object_id(&mut self, v: u32) -> Result<(), ArchiveError> {
        self.write_u32(v)
    }

    #[inline]
    fn write_version(&mut self, v: u32) -> Result<(), ArchiveError> {
        self.write_u32(v)
    }

    #[inline]
    fn write_tracking(&mut self, v: bool) -> Result<(), ArchiveError> {
        self.write_bool(v)
    }

    #[inline]
    fn write_export_name(&mut self, v: &str) -> Result<(), ArchiveError> {
        self.write_str(v)
    }
}

// -----------------------------------------------------------------------------
// Forwarding

impl<R: ArchiveReader + ?Sized> ArchiveReader for &mut R {
    fn read_bool(&mut self) -> Result<bool, ArchiveError> {
        (**self).read_bool()
    }
    fn read_u8(&mut self) -> Result<u8, ArchiveError> {
        (**self).read_u8()
    }
    fn read_u16(&mut self) -> Result<u16, ArchiveError> {
        (**self).read_u16()
    }
    fn read_u32(&mut self) -> Result<u32, ArchiveError> {
        (**self).read_u32()
    }
    fn read_u64(&mut self) -> Result<u64, ArchiveError> {
        (**self).read_u64()
    }
    fn read_i8(&mut self) -> Result<i8, ArchiveError> {
        (**self).read_i8()
    }
    fn read_i16(&mut self) -> Result<i16, ArchiveError> {
        (**self).read_i16()
    }
    fn read_i32(&mut self) -> Result<i32, ArchiveError> {
        (**self).read_i32()
    }
    fn read_i64(&mut self) -> Result<i64, ArchiveError> {
        (**self).read_i64()
    }
    fn read_f32(&mut self) -> Result<f32, ArchiveError> {
        (**self).read_f32()
    }
    fn read_f64(&mut self) -> Result<f64, ArchiveError> {
        (**self).read_f64()
    }
    fn read_string(&mut self) -> Result<String, ArchiveError> {
        (**self).read_string()
    }
    fn read_char(&mut self) -> Result<char, ArchiveError> {
        (**self).read_char()
    }
    fn read_len(&mut self) -> Result<usize, ArchiveError> {
        (**self).read_len()
    }
    fn remaining_hint(&self) -> Option<usize> {
        (**self).remaining_hint()
    }
    fn read_class_id(&mut self) -> Result<i16, ArchiveError> {
        (**self).read_class_id()
    }
    fn read_class_id_optional(&mut self) -> Result<i16, ArchiveError> {
        (**self).read_class_id_optional()
    }
    fn read_object_id(&mut self) -> Result<u32, ArchiveError> {
        (**self).read_object_id()
    }
    fn read_version(&mut self) -> Result<u32, ArchiveError> {
        (**self).read_version()
    }
    fn read_tracking(&mut self) -> Result<bool, ArchiveError> {
        (**self).read_tracking()
    }
    fn read_export_name(&mut self) -> Result<String, ArchiveError> {
        (**self).read_export_name()
    }
}

impl<W: ArchiveWriter + ?Sized> ArchiveWriter for &mut W {
    fn write_bool(&mut self, v: bool) -> Result<(), ArchiveError> {
        (**self).write_bool(v)
    }
    fn write_u8(&mut self, v: u8) -> Result<(), ArchiveError> {
        (**self).write_u8(v)
    }
    fn write_u16(&mut self, v: u16) -> Result<(), ArchiveError> {
        (**self).write_u16(v)
    }
    fn write_u32(&mut self, v: u32) -> Result<(), ArchiveError> {
        (**self).write_u32(v)
    }
    fn write_u64(&mut self, v: u64) -> Result<(), ArchiveError> {
        (**self).write_u64(v)
    }
    fn write_i8(&mut self, v: i8) -> Result<(), ArchiveError> {
        (**self).write_i8(v)
    }
    fn write_i16(&mut self, v: i16) -> Result<(), ArchiveError> {
        (**self).write_i16(v)
    }
    fn write_i32(&mut self, v: i32) -> Result<(), ArchiveError> {
        (**self).write_i32(v)
    }
    fn write_i64(&mut self, v: i64) -> Result<(), ArchiveError> {
        (**self).write_i64(v)
    }
    fn write_f32(&mut self, v: f32) -> Result<(), ArchiveError> {
        (**self).write_f32(v)
    }
    fn write_f64(&mut self, v: f64) -> Result<(), ArchiveError> {
        (**self).write_f64(v)
    }
    fn write_str(&mut self, v: &str) -> Result<(), ArchiveError> {
        (**self).write_str(v)
    }
    fn write_char(&mut self, v: char) -> Result<(), ArchiveError> {
        (**self).write_char(v)
    }
    fn write_len(&mut self, len: usize) -> Result<(), ArchiveError> {
        (**self).write_len(len)
    }
    fn write_class_id(&mut self, v: i16) -> Result<(), ArchiveError> {
        (**self).write_class_id(v)
    }
    fn write_class_id_optional(&mut self, v: i16) -> Result<(), ArchiveError> {
        (**self).write_class_id_optional(v)
    }
    fn write_object_id(&mut self, v: u32) -> Result<(), ArchiveError> {
        (**self).write_object_id(v)
    }
    fn write_version(&mut self, v: u32) -> Result<(), ArchiveError> {
        (**self).write_version(v)
    }
    fn write_tracking(&mut self, v: bool) -> Result<(), ArchiveError> {
        (**self).write_tracking(v)
    }
    fn write_export_name(&mut self, v: &str) -> Result<(), ArchiveError> {
        (**self).write_export_name(v)
    }
}
