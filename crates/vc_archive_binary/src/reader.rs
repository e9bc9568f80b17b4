use alloc::string::String;

use vc_archive::{ArchiveError, ArchiveReader, StreamError};

// -----------------------------------------------------------------------------
// BinaryReader

/// Reads the little-endian binary format from a byte slice.
///
/// Nothing is allocated for a length read from the stream before it is
/// checked against the remaining input: strings are taken from the input
/// directly, containers reserve at most [`remaining`](Self::remaining) slots.
///
/// # Example
///
/// ```
/// use vc_archive::ArchiveReader;
/// use vc_archive_binary::BinaryReader;
///
/// let mut reader = BinaryReader::new(&[1, 0x2A, 0, 0, 0]);
/// assert!(reader.read_bool().unwrap());
/// assert_eq!(reader.read_u32().unwrap(), 42);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], ArchiveError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(StreamError::UnexpectedEof { needed, remaining }.into());
        }
        let bytes = &self.data[self.position..self.position + needed];
        self.position += needed;
        Ok(bytes)
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ArchiveError> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }
}

macro_rules! read_le {
    ($($name:ident => $ty:ty;)*) => {
        $(
            #[inline]
            fn $name(&mut self) -> Result<$ty, ArchiveError> {
                self.take_array().map(<$ty>::from_le_bytes)
            }
        )*
    };
}

impl ArchiveReader for BinaryReader<'_> {
    #[inline]
    fn remaining_hint(&self) -> Option<usize> {
        Some(self.remaining())
    }

    read_le! {
        read_u8 => u8;
        read_u16 => u16;
        read_u32 => u32;
        read_u64 => u64;
        read_i8 => i8;
        read_i16 => i16;
        read_i32 => i32;
        read_i64 => i64;
        read_f32 => f32;
        read_f64 => f64;
    }

    fn read_bool(&mut self) -> Result<bool, ArchiveError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(StreamError::InvalidBool(v).into()),
        }
    }

    fn read_string(&mut self) -> Result<String, ArchiveError> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        match core::str::from_utf8(bytes) {
            Ok(s) => Ok(String::from(s)),
            Err(_) => Err(StreamError::InvalidUtf8.into()),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
