use alloc::string::ToString;
use core::any::TypeId;
use core::ptr::NonNull;

use super::OutputArchive;
use super::class_table::ClassTable;
use super::object_table::{ObjectTable, Seen};
use crate::class::{Archived, ClassInfo};
use crate::error::ArchiveError;
use crate::flags::{ArchiveFlags, ImplementationLevel};
use crate::header::write_header;
use crate::ident::NULL_POINTER_TAG;
use crate::ptr::{DynPtr, ObjectPtr};
use crate::registry::ClassResolver;
use crate::stream::ArchiveWriter;

/// The pointee a pointer save is about to write.
#[derive(Debug, Clone, Copy)]
struct Pending {
    ptr: ObjectPtr,
    type_id: TypeId,
}

// -----------------------------------------------------------------------------
// OutputSession

/// Flattens an object graph into an [`ArchiveWriter`].
///
/// Objects of tracked classes are written once, later appearances become
/// back-references. A failed call leaves the stream incomplete, the
/// session then refuses further calls with [`ArchiveError::Poisoned`].
pub struct OutputSession<'r, W: ArchiveWriter> {
    writer: W,
    resolver: &'r dyn ClassResolver,
    flags: ArchiveFlags,
    classes: ClassTable,
    objects: ObjectTable,
    pending: Option<Pending>,
    depth: u32,
    poisoned: bool,
    #[cfg(all(debug_assertions, feature = "debug"))]
    trace: crate::trace::TypePathStack,
}

impl<'r, W: ArchiveWriter> OutputSession<'r, W> {
    /// Start a session, writing the header unless
    /// [`ArchiveFlags::NO_HEADER`] is set.
    pub fn new(
        mut writer: W,
        resolver: &'r dyn ClassResolver,
        flags: ArchiveFlags,
    ) -> Result<Self, ArchiveError> {
        if !flags.contains(ArchiveFlags::NO_HEADER) {
            write_header(&mut writer)?;
        }
        log::debug!("output session started, flags {flags:?}");

        Ok(Self {
            writer,
            resolver,
            flags,
            classes: ClassTable::new(),
            objects: ObjectTable::new(),
            pending: None,
            depth: 0,
            poisoned: false,
            #[cfg(all(debug_assertions, feature = "debug"))]
            trace: crate::trace::TypePathStack::new(),
        })
    }

    /// Save a top-level value.
    pub fn save<T: Archived>(&mut self, value: &T) -> Result<(), ArchiveError> {
        self.scoped(|session| {
            let ar: &mut dyn OutputArchive = session;
            ar.save(value)
        })
    }

    /// Save a top-level pointer to a `T`.
    ///
    /// # Safety
    /// The pointee must be live and not mutated for the duration of the call.
    pub unsafe fn save_pointer<T: Archived>(
        &mut self,
        ptr: Option<NonNull<T>>,
    ) -> Result<(), ArchiveError> {
        self.scoped(|session| {
            let ar: &mut dyn OutputArchive = session;
            // SAFETY: upheld by the caller.
            unsafe { ar.save_ptr(ptr) }
        })
    }

    /// Save a top-level pointer whose static type is `base`.
    ///
    /// # Safety
    /// See [`OutputArchive::save_pointer`].
    pub unsafe fn save_dyn_pointer(
        &mut self,
        ptr: Option<DynPtr>,
        base: Option<&ClassInfo>,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        self.scoped(|session| unsafe { session.pointer(ptr, base) })
    }

    #[inline]
    pub fn flags(&self) -> ArchiveFlags {
        self.flags
    }

    /// Number of classes written so far.
    #[inline]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of tracked objects written so far.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Consume the session and return the underlying writer.
    #[inline]
    pub fn into_writer(self) -> W {
        self.writer
    }

    // -------------------------------------------------------------------------
    // Scoping

    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ArchiveError>,
    ) -> Result<T, ArchiveError> {
        if self.poisoned {
            return Err(ArchiveError::Poisoned);
        }

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        if self.depth == 0 {
            match &result {
                Ok(_) => {
                    #[cfg(all(debug_assertions, feature = "debug"))]
                    self.trace.clear();
                }
                Err(err) => {
                    #[cfg(all(debug_assertions, feature = "debug"))]
                    {
                        let stack = self.trace.take_failure();
                        log::error!("save failed: {err} (stack:\n{stack:?})");
                    }
                    #[cfg(not(all(debug_assertions, feature = "debug")))]
                    log::error!("save failed: {err}");
                    self.poisoned = true;
                    self.pending = None;
                }
            }
        }
        result
    }

    unsafe fn fill(&mut self, class: &ClassInfo, ptr: ObjectPtr) -> Result<(), ArchiveError> {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.trace.push(class.type_path());

        // SAFETY: upheld by the caller.
        let result = unsafe { class.save(self, ptr) };

        #[cfg(all(debug_assertions, feature = "debug"))]
        self.trace.pop(result.is_err());

        result
    }

    // -------------------------------------------------------------------------
    // Value saver

    unsafe fn value(&mut self, ptr: ObjectPtr, class: &ClassInfo) -> Result<(), ArchiveError> {
        if class.level() == ImplementationLevel::Primitive {
            // SAFETY: upheld by the caller.
            return unsafe { class.save(self, ptr) };
        }

        let pending = self
            .pending
            .take_if(|pending| pending.ptr == ptr && pending.type_id == class.type_id());
        if pending.is_some() {
            // SAFETY: upheld by the caller.
            return unsafe { self.fill(class, ptr) };
        }

        let (class_id, _) = self.classes.register(class, self.flags, self.resolver)?;
        let tracking = self.classes.save_preamble(class_id, &mut self.writer)?;

        if tracking {
            match self.objects.insert(ptr, class_id) {
                Seen::New(id) => self.writer.write_object_id(id.to_wire())?,
                Seen::Saved(id) => {
                    // Loading it back would create a second copy.
                    if self.objects.is_pointer(id) {
                        return Err(ArchiveError::PointerConflict(class.type_path()));
                    }
                    return self.writer.write_object_id(id.to_wire());
                }
            }
        }

        // SAFETY: upheld by the caller.
        unsafe { self.fill(class, ptr) }
    }

    // -------------------------------------------------------------------------
    // Pointer saver

    unsafe fn pointer(
        &mut self,
        ptr: Option<DynPtr>,
        base: Option<&ClassInfo>,
    ) -> Result<(), ArchiveError> {
        let Some(ptr) = ptr else {
            return self.writer.write_class_id(NULL_POINTER_TAG);
        };
        let class = *ptr.class();

        // The reader reads a name exactly when the static type is abstract
        // or polymorphic.
        let named = match base {
            Some(base) if !base.is_polymorphic() => {
                if base.type_id() != class.type_id() {
                    return Err(ArchiveError::TypeMismatch {
                        expected: base.type_path(),
                        found: class.type_path(),
                    });
                }
                false
            }
            _ => true,
        };

        let (class_id, new) = self.classes.register(&class, self.flags, self.resolver)?;
        self.writer.write_class_id(class_id.to_wire())?;
        if new && named {
            let Some(name) = class.export_name() else {
                return Err(ArchiveError::UnregisteredClass(class.type_path().to_string()));
            };
            self.writer.write_export_name(name)?;
        }
        let tracking = self.classes.save_preamble(class_id, &mut self.writer)?;

        if tracking {
            match self.objects.insert(ptr.ptr(), class_id) {
                Seen::Saved(id) => return self.writer.write_object_id(id.to_wire()),
                Seen::New(id) => {
                    self.writer.write_object_id(id.to_wire())?;
                    self.objects.mark_pointer(id);
                }
            }
        }

        let outer = self.pending.replace(Pending {
            ptr: ptr.ptr(),
            type_id: class.type_id(),
        });
        // SAFETY: upheld by the caller.
        let result = unsafe { self.value(ptr.ptr(), &class) };
        self.pending = outer;
        result
    }
}

impl<W: ArchiveWriter> OutputArchive for OutputSession<'_, W> {
    #[inline]
    fn writer(&mut self) -> &mut dyn ArchiveWriter {
        &mut self.writer
    }

    unsafe fn save_object(
        &mut self,
        ptr: ObjectPtr,
        class: &ClassInfo,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        self.scoped(|session| unsafe { session.value(ptr, class) })
    }

    unsafe fn save_pointer(
        &mut self,
        ptr: Option<DynPtr>,
        base: Option<&ClassInfo>,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        self.scoped(|session| unsafe { session.pointer(ptr, base) })
    }
}

impl<W: ArchiveWriter> core::fmt::Debug for OutputSession<'_, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutputSession")
            .field("flags", &self.flags)
            .field("classes", &self.classes.len())
            .field("objects", &self.objects.len())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
