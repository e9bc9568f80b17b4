use crate::de::InputArchive;
use crate::error::ArchiveError;
use crate::flags::{ImplementationLevel, Tracking};
use crate::ser::OutputArchive;

/// A type that can be written to and restored from an archive session.
///
/// The associated constants are the compiled-in class declaration: they
/// decide how much class information the stream carries and whether
/// instances get an identity.
///
/// `load` receives the version the class was *saved* with, which may be
/// older than [`VERSION`](Archived::VERSION). `save` always receives
/// [`VERSION`](Archived::VERSION).
///
/// # Example
///
/// ```
/// use vc_archive::{Archived, ArchiveError, InputArchive, OutputArchive};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Archived for Point {
///     const VERSION: u32 = 1;
///
///     fn construct() -> Self {
///         Point { x: 0, y: 0 }
///     }
///
///     fn load(&mut self, ar: &mut dyn InputArchive, _version: u32) -> Result<(), ArchiveError> {
///         ar.load(&mut self.x)?;
///         ar.load(&mut self.y)
///     }
///
///     fn save(&self, ar: &mut dyn OutputArchive, _version: u32) -> Result<(), ArchiveError> {
///         ar.save(&self.x)?;
///         ar.save(&self.y)
///     }
/// }
/// ```
pub trait Archived: Sized + 'static {
    /// Version this build writes.
    const VERSION: u32 = 0;

    /// Identity policy.
    const TRACKING: Tracking = Tracking::WhenPointer;

    /// How much class information goes into the stream.
    const LEVEL: ImplementationLevel = ImplementationLevel::ClassInfo;

    /// Whether pointers to this type may need dynamic type resolution.
    ///
    /// Pointer fields of a polymorphic type always carry the export name of
    /// the class the first time it appears, so this type must also have an
    /// [`EXPORT_NAME`](Archived::EXPORT_NAME).
    const POLYMORPHIC: bool = false;

    /// Stable name used to find the class in a
    /// [`TypeRegistry`](crate::TypeRegistry) when reading polymorphic pointers.
    const EXPORT_NAME: Option<&'static str> = None;

    /// Full type path, used for diagnostics and registry lookup.
    #[inline]
    fn type_path() -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Create the instance a load fills in.
    fn construct() -> Self;

    /// Read the fields of one instance.
    fn load(&mut self, ar: &mut dyn InputArchive, version: u32) -> Result<(), ArchiveError>;

    /// Write the fields of one instance.
    fn save(&self, ar: &mut dyn OutputArchive, version: u32) -> Result<(), ArchiveError>;
}
