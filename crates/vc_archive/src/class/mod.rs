//! Class descriptions.
//!
//! - [`Archived`]: implemented by every type that can go through a session.
//! - [`ClassInfo`]: the type-erased, `Copy` description built from it.
//! - [`TypeKey`]: the comparable identifier of a type.

// -----------------------------------------------------------------------------
// Modules

mod archived;
mod info;
mod key;

// -----------------------------------------------------------------------------
// Exports

pub use archived::Archived;
pub use info::ClassInfo;
pub use key::TypeKey;
