use core::any::TypeId;

use crate::class::ClassInfo;
use crate::de::InputArchive;
use crate::error::ArchiveError;
use crate::flags::ImplementationLevel;
use crate::registry::TypeRegistry;
use crate::ser::OutputArchive;
use crate::Archived;

pub use inventory;

/// A class submitted by [`export_class!`](crate::export_class).
pub struct ClassExport(pub fn() -> ClassInfo);

inventory::collect!(ClassExport);

/// Submitted by this crate itself, its presence tells that the platform
/// runs inventory constructors.
struct AvailFlag;

impl Archived for AvailFlag {
    const LEVEL: ImplementationLevel = ImplementationLevel::Primitive;

    fn construct() -> Self {
        AvailFlag
    }

    fn load(&mut self, _: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> {
        Ok(())
    }

    fn save(&self, _: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> {
        Ok(())
    }
}

inventory::submit! { ClassExport(ClassInfo::of::<AvailFlag>) }

/// Returns `false` if the availability flag was not collected.
pub(super) fn register_exported(registry: &mut TypeRegistry) -> bool {
    let mut available = false;
    for export in inventory::iter::<ClassExport> {
        let class = (export.0)();
        if class.type_id() == TypeId::of::<AvailFlag>() {
            available = true;
        } else {
            registry.insert(class);
        }
    }
    available
}

/// Register a class for [`TypeRegistry::auto_register`].
///
/// The type must be a concrete (non-generic) [`Archived`] type. Expands to
/// nothing when the `auto_register` feature is disabled.
///
/// ```
/// use vc_archive::{Archived, ArchiveError, InputArchive, OutputArchive, TypeRegistry};
///
/// struct Marker;
///
/// impl Archived for Marker {
///     const EXPORT_NAME: Option<&'static str> = Some("doc::Marker");
///     fn construct() -> Self { Marker }
///     fn load(&mut self, _: &mut dyn InputArchive, _: u32) -> Result<(), ArchiveError> { Ok(()) }
///     fn save(&self, _: &mut dyn OutputArchive, _: u32) -> Result<(), ArchiveError> { Ok(()) }
/// }
///
/// vc_archive::export_class!(Marker);
///
/// let mut registry = TypeRegistry::new();
/// if registry.auto_register() {
///     assert!(registry.get_with_export_name("doc::Marker").is_some());
/// }
/// ```
#[macro_export]
macro_rules! export_class {
    ($ty:ty) => {
        const _: () = {
            $crate::__macro_exports::auto_register::inventory::submit! {
                $crate::__macro_exports::auto_register::ClassExport(
                    $crate::ClassInfo::of::<$ty>
                )
            }
        };
    };
}
