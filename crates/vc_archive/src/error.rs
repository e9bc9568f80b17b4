use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// StreamError

/// A primitive read found bytes or tokens it could not make sense of.
///
/// Every variant is fatal for the session: no resynchronization is attempted
/// and the stream is left at an unspecified position.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamError {
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid boolean encoding {0:#04x}")]
    InvalidBool(u8),

    #[error("invalid char scalar value {0:#x}")]
    InvalidChar(u32),

    #[error("string data is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid class id {found}, {known} classes known in this session")]
    InvalidClassId { found: i16, known: usize },

    #[error("object id {found} skips ahead of the next id {expected}")]
    InvalidObjectId { found: u32, expected: u32 },

    #[error("object id {0} refers to an object whose address is not recorded yet")]
    ForwardReference(u32),

    #[error("object id {object} was loaded as class {expected}, not class {found}")]
    ObjectClassMismatch { object: u32, expected: i16, found: i16 },

    #[error("length {0} does not fit in memory")]
    LengthOverflow(u64),

    #[error("expected {expected}, found {found}")]
    TokenMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

// -----------------------------------------------------------------------------
// ArchiveError

/// The error type of every archive session operation.
///
/// The session performs no local recovery. When the outermost
/// `load`/`save` call returns one of these, the input session has already
/// destroyed every object it created during that call and refuses further
/// work with [`ArchiveError::Poisoned`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("class `{0}` is not registered or has no export name")]
    UnregisteredClass(String),

    #[error("malformed stream: {0}")]
    Malformed(#[from] StreamError),

    #[error("failed to allocate {size} bytes for `{type_path}`")]
    AllocationFailure {
        type_path: &'static str,
        size: usize,
    },

    #[error(
        "`{type_path}` was saved with version {file_version}, newer than the supported {current}"
    )]
    UnsupportedClassVersion {
        type_path: &'static str,
        file_version: u32,
        current: u32,
    },

    #[error("stream does not start with a valid archive signature")]
    InvalidSignature,

    #[error("archive library version {0} is newer than this build supports")]
    UnsupportedVersion(u16),

    #[error("`{0}` was first saved through a pointer and cannot be saved again by value")]
    PointerConflict(&'static str),

    #[error("expected an object of `{expected}`, the stream holds `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("a single stream cannot mention more than {0} classes")]
    ClassLimit(usize),

    #[error("the session was aborted by an earlier failure")]
    Poisoned,

    #[error("{0}")]
    Custom(String),
}

impl ArchiveError {
    /// Create a [`ArchiveError::Custom`] from user fill code.
    #[inline]
    pub fn custom(msg: impl core::fmt::Display) -> Self {
        use alloc::string::ToString;
        Self::Custom(msg.to_string())
    }
}
