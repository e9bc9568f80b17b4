//! Streams and archived types shared by the unit tests.

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::ptr::NonNull;

use crate::class::Archived;
use crate::de::InputArchive;
use crate::error::{ArchiveError, StreamError};
use crate::flags::{ImplementationLevel, Tracking};
use crate::ser::OutputArchive;
use crate::stream::{ArchiveReader, ArchiveWriter};

// -----------------------------------------------------------------------------
// Token stream

/// One primitive of a token stream, tagged with what wrote it.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(&'static str),
    ClassId(i16),
    ClassIdOptional(i16),
    ObjectId(u32),
    Version(u32),
    Tracking(bool),
    Name(&'static str),
}

impl Token {
    fn kind(&self) -> &'static str {
        match self {
            Token::Bool(_) => "bool",
            Token::U8(_) => "u8",
            Token::U16(_) => "u16",
            Token::U32(_) => "u32",
            Token::U64(_) => "u64",
            Token::I8(_) => "i8",
            Token::I16(_) => "i16",
            Token::I32(_) => "i32",
            Token::I64(_) => "i64",
            Token::F32(_) => "f32",
            Token::F64(_) => "f64",
            Token::Str(_) => "string",
            Token::ClassId(_) => "class id",
            Token::ClassIdOptional(_) => "optional class id",
            Token::ObjectId(_) => "object id",
            Token::Version(_) => "version",
            Token::Tracking(_) => "tracking",
            Token::Name(_) => "export name",
        }
    }
}

/// Reads a sequence of [`Token`]s, failing on any kind mismatch.
#[derive(Debug, Default)]
pub struct TokenReader {
    tokens: VecDeque<Token>,
}

impl TokenReader {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn next(&mut self) -> Result<Token, ArchiveError> {
        self.tokens.pop_front().ok_or(ArchiveError::Malformed(
            StreamError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            },
        ))
    }
}

fn mismatch(expected: &'static str, found: &Token) -> ArchiveError {
    ArchiveError::Malformed(StreamError::TokenMismatch {
        expected,
        found: found.kind(),
    })
}

macro_rules! read_token {
    ($($name:ident => $variant:ident : $ty:ty, $kind:literal;)*) => {
        $(
            fn $name(&mut self) -> Result<$ty, ArchiveError> {
                match self.next()? {
                    Token::$variant(v) => Ok(v),
                    other => Err(mismatch($kind, &other)),
                }
            }
        )*
    };
}

impl ArchiveReader for TokenReader {
    fn remaining_hint(&self) -> Option<usize> {
        Some(self.tokens.len())
    }

    read_token! {
        read_bool => Bool: bool, "bool";
        read_u8 => U8: u8, "u8";
        read_u16 => U16: u16, "u16";
        read_u32 => U32: u32, "u32";
        read_u64 => U64: u64, "u64";
        read_i8 => I8: i8, "i8";
        read_i16 => I16: i16, "i16";
        read_i32 => I32: i32, "i32";
        read_i64 => I64: i64, "i64";
        read_f32 => F32: f32, "f32";
        read_f64 => F64: f64, "f64";
        read_class_id => ClassId: i16, "class id";
        read_class_id_optional => ClassIdOptional: i16, "optional class id";
        read_object_id => ObjectId: u32, "object id";
        read_version => Version: u32, "version";
        read_tracking => Tracking: bool, "tracking";
    }

    fn read_string(&mut self) -> Result<String, ArchiveError> {
        match self.next()? {
            Token::Str(v) => Ok(v.to_string()),
            other => Err(mismatch("string", &other)),
        }
    }

    fn read_export_name(&mut self) -> Result<String, ArchiveError> {
        match self.next()? {
            Token::Name(v) => Ok(v.to_string()),
            other => Err(mismatch("export name", &other)),
        }
    }
}

/// Records every write as a [`Token`].
///
/// Strings are leaked to fit `Token::Str`, which is fine for tests.
#[derive(Debug, Default)]
pub struct TokenWriter {
    tokens: Vec<Token>,
}

impl TokenWriter {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_reader(self) -> TokenReader {
        TokenReader::new(self.tokens)
    }
}

fn leak(v: &str) -> &'static str {
    alloc::boxed::Box::leak(v.to_string().into_boxed_str())
}

macro_rules! write_token {
    ($($name:ident => $variant:ident : $ty:ty;)*) => {
        $(
            fn $name(&mut self, v: $ty) -> Result<(), ArchiveError> {
                self.tokens.push(Token::$variant(v));
                Ok(())
            }
        )*
    };
}

impl ArchiveWriter for TokenWriter {
    write_token! {
        write_bool => Bool: bool;
        write_u8 => U8: u8;
        write_u16 => U16: u16;
        write_u32 => U32: u32;
        write_u64 => U64: u64;
        write_i8 => I8: i8;
        write_i16 => I16: i16;
        write_i32 => I32: i32;
        write_i64 => I64: i64;
        write_f32 => F32: f32;
        write_f64 => F64: f64;
        write_class_id => ClassId: i16;
        write_class_id_optional => ClassIdOptional: i16;
        write_object_id => ObjectId: u32;
        write_version => Version: u32;
        write_tracking => Tracking: bool;
    }

    fn write_str(&mut self, v: &str) -> Result<(), ArchiveError> {
        self.tokens.push(Token::Str(leak(v)));
        Ok(())
    }

    fn write_export_name(&mut self, v: &str) -> Result<(), ArchiveError> {
        self.tokens.push(Token::Name(leak(v)));
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Drop log

std::thread_local! {
    static DROPS: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };
}

/// Tags of the [`Logged`] values dropped on this thread, oldest first.
pub fn take_drops() -> Vec<u32> {
    DROPS.with_borrow_mut(core::mem::take)
}

// -----------------------------------------------------------------------------
// Archived types

/// Tracked list node with a class preamble.
///
/// Version 0 streams carry no `value`.
#[derive(Debug, Default)]
pub struct Node {
    pub value: i32,
    pub next: Option<NonNull<Node>>,
    pub loaded_version: u32,
}

impl Archived for Node {
    const VERSION: u32 = 1;

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, version: u32) -> Result<(), ArchiveError> {
        self.loaded_version = version;
        if version >= 1 {
            ar.load(&mut self.value)?;
        }
        self.next = ar.load_ptr::<Node>()?;
        Ok(())
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.save(&self.value)?;
        // SAFETY: test graphs only link live nodes.
        unsafe { ar.save_ptr(self.next) }
    }
}

/// Class without a preamble, tracked when registered.
#[derive(Debug, Default, PartialEq)]
pub struct Leaf {
    pub value: u32,
}

impl Archived for Leaf {
    const VERSION: u32 = 2;
    const LEVEL: ImplementationLevel = ImplementationLevel::Serializable;

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.load(&mut self.value)
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.save(&self.value)
    }
}

/// Never tracked, every reference is a separate instance.
#[derive(Debug, Default, PartialEq)]
pub struct Plain {
    pub value: u32,
}

impl Archived for Plain {
    const TRACKING: Tracking = Tracking::Never;

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.load(&mut self.value)
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.save(&self.value)
    }
}

/// Abstract polymorphic base, never registered.
#[derive(Debug)]
pub struct Shape;

impl Archived for Shape {
    const POLYMORPHIC: bool = true;

    fn construct() -> Self {
        Shape
    }

    fn load(&mut self, _: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        Ok(())
    }

    fn save(&self, _: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Square {
    pub side: u32,
}

impl Archived for Square {
    const POLYMORPHIC: bool = true;
    const EXPORT_NAME: Option<&'static str> = Some("test::Square");

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.load(&mut self.side)
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.save(&self.side)
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Archived for Circle {
    const POLYMORPHIC: bool = true;
    const EXPORT_NAME: Option<&'static str> = Some("test::Circle");

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.load(&mut self.radius)
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.save(&self.radius)
    }
}

/// Registered through `export_class!`.
#[derive(Debug, Default)]
pub struct Exported;

impl Archived for Exported {
    const EXPORT_NAME: Option<&'static str> = Some("test::Exported");

    fn construct() -> Self {
        Exported
    }

    fn load(&mut self, _: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        Ok(())
    }

    fn save(&self, _: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        Ok(())
    }
}

crate::export_class!(Exported);

/// Tag that makes [`Logged::load`] fail.
pub const FAILING_TAG: u32 = u32::MAX;

/// Untracked value that records its tag in the drop log when dropped.
#[derive(Debug, Default)]
pub struct Logged {
    pub tag: u32,
}

impl Drop for Logged {
    fn drop(&mut self) {
        DROPS.with_borrow_mut(|drops| drops.push(self.tag));
    }
}

impl Archived for Logged {
    const TRACKING: Tracking = Tracking::Never;
    const LEVEL: ImplementationLevel = ImplementationLevel::Serializable;

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.load(&mut self.tag)?;
        if self.tag == FAILING_TAG {
            return Err(ArchiveError::custom("failing tag"));
        }
        Ok(())
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.save(&self.tag)
    }
}

/// A counted run of pointers to [`Logged`] values.
#[derive(Debug, Default)]
pub struct Batch {
    pub items: Vec<Option<NonNull<Logged>>>,
}

impl Batch {
    /// Free the loaded items.
    ///
    /// # Safety
    /// The items must be live objects owned by the caller.
    pub unsafe fn free(&mut self) {
        for item in self.items.drain(..).flatten() {
            // SAFETY: upheld by the caller.
            drop(unsafe { alloc::boxed::Box::from_raw(item.as_ptr()) });
        }
    }
}

impl Archived for Batch {
    const TRACKING: Tracking = Tracking::Never;
    const LEVEL: ImplementationLevel = ImplementationLevel::Serializable;

    fn construct() -> Self {
        Self::default()
    }

    fn load(&mut self, ar: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        let count = ar.reader().read_u32()?;
        for _ in 0..count {
            let item = ar.load_ptr::<Logged>()?;
            self.items.push(item);
        }
        Ok(())
    }

    fn save(&self, ar: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        ar.writer().write_u32(self.items.len() as u32)?;
        for item in &self.items {
            // SAFETY: test batches only hold live items.
            unsafe { ar.save_ptr(*item)? };
        }
        Ok(())
    }
}

/// Free a graph node allocated by a session.
///
/// # Safety
/// `ptr` must be a live node owned by the caller.
pub unsafe fn free<T>(ptr: NonNull<T>) {
    // SAFETY: upheld by the caller.
    drop(unsafe { alloc::boxed::Box::from_raw(ptr.as_ptr()) });
}
