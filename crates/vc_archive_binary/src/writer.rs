use alloc::vec::Vec;

use vc_archive::{ArchiveError, ArchiveWriter};

/// Writes the little-endian binary format into a growable buffer.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    #[inline]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// The bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

macro_rules! write_le {
    ($($name:ident => $ty:ty;)*) => {
        $(
            #[inline]
            fn $name(&mut self, v: $ty) -> Result<(), ArchiveError> {
                self.buf.extend_from_slice(&v.to_le_bytes());
                Ok(())
            }
        )*
    };
}

impl ArchiveWriter for BinaryWriter {
    write_le! {
        write_u8 => u8;
        write_u16 => u16;
        write_u32 => u32;
        write_u64 => u64;
        write_i8 => i8;
        write_i16 => i16;
        write_i32 => i32;
        write_i64 => i64;
        write_f32 => f32;
        write_f64 => f64;
    }

    #[inline]
    fn write_bool(&mut self, v: bool) -> Result<(), ArchiveError> {
        self.buf.push(v as u8);
        Ok(())
    }

    fn write_str(&mut self, v: &str) -> Result<(), ArchiveError> {
        self.write_len(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }
}
