#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![expect(unsafe_code, reason = "Archived objects are addressed through type-erased raw pointers.")]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod flags;
mod hash;
mod header;
mod ident;
mod impls;
mod ptr;

#[cfg(all(debug_assertions, feature = "debug"))]
mod trace;

pub mod class;
pub mod de;
pub mod registry;
pub mod ser;
pub mod stream;

#[cfg(test)]
mod testing;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::{ArchiveError, StreamError};
pub use flags::{ArchiveFlags, ImplementationLevel, Tracking};
pub use header::{ARCHIVE_SIGNATURE, LIBRARY_VERSION};
pub use ident::{ClassId, NULL_POINTER_TAG, ObjectId};
pub use ptr::{DynPtr, ObjectPtr};

pub use class::{Archived, ClassInfo, TypeKey};
pub use de::{InputArchive, InputSession};
pub use registry::{ClassResolver, TypeRegistry};
pub use ser::{OutputArchive, OutputSession};
pub use stream::{ArchiveReader, ArchiveWriter};

#[cfg(feature = "std")]
pub use registry::TypeRegistryArc;

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use crate::registry::auto_register;
}
