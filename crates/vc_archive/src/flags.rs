use bitflags::bitflags;

// -----------------------------------------------------------------------------
// ArchiveFlags

bitflags! {
    /// Options fixed when a session is created.
    ///
    /// Both sides of a stream must agree on them, they are not written
    /// into the archive.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ArchiveFlags: u8 {
        /// Neither write nor expect the signature and library version.
        const NO_HEADER   = 1 << 0;
        /// Disable object tracking for every class that does not carry
        /// its tracking flag in the stream.
        const NO_TRACKING = 1 << 1;
    }
}

// -----------------------------------------------------------------------------
// Tracking

/// Declared identity policy of a class.
///
/// Tracked objects receive an [`ObjectId`](crate::ObjectId) the first time
/// they appear, later appearances are written as back-references and load
/// back as the same address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tracking {
    /// Every appearance is an independent instance.
    Never,
    /// Tracked only if the class is registered in the type registry,
    /// that is, if it can be serialized through a pointer at all.
    #[default]
    WhenPointer,
    /// Always tracked.
    Always,
}

// -----------------------------------------------------------------------------
// ImplementationLevel

/// How much class information a type writes into the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImplementationLevel {
    /// Written directly by the stream primitives. No class id, no version,
    /// never tracked.
    Primitive,
    /// Registered in the class tables but tracking and version come from
    /// the compiled-in declaration instead of the stream.
    Serializable,
    /// Tracking flag and version are written once per class per stream.
    #[default]
    ClassInfo,
}
