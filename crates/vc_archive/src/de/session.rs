use core::any::TypeId;
use core::ptr::NonNull;

use super::InputArchive;
use super::class_table::{ClassEntry, ClassTable};
use super::ledger::RollbackLedger;
use super::object_table::{ObjectTable, Track};
use crate::class::{Archived, ClassInfo};
use crate::error::{ArchiveError, StreamError};
use crate::flags::{ArchiveFlags, ImplementationLevel};
use crate::header::{LIBRARY_VERSION, read_header};
use crate::ident::{ClassId, NULL_POINTER_TAG, ObjectId};
use crate::ptr::{DynPtr, ObjectPtr};
use crate::registry::ClassResolver;
use crate::stream::ArchiveReader;

// -----------------------------------------------------------------------------
// Session state

/// The object a pointer load allocated and is about to fill.
///
/// The first value load of exactly this address and type is the fill
/// itself: its preamble and object id were handled by the pointer load.
#[derive(Debug, Clone, Copy)]
struct Pending {
    ptr: ObjectPtr,
    type_id: TypeId,
    file_version: u32,
}

/// Object-table range that `reset_object_address` may touch.
#[derive(Debug, Clone, Copy, Default)]
struct Moveable {
    /// First entry of the most recent value load.
    recent: usize,
    /// One past the last entry created by a tracked value load.
    end: usize,
}

// -----------------------------------------------------------------------------
// InputSession

/// Rebuilds an object graph from an [`ArchiveReader`].
///
/// A session lives for exactly one stream. Class ids and object ids are
/// session-local, two sessions never share them.
///
/// # Example
///
/// ```
/// use vc_archive::{ArchiveFlags, InputSession, OutputSession, TypeRegistry};
/// # use vc_archive::{ArchiveReader, ArchiveWriter, ArchiveError};
/// # #[derive(Default)]
/// # struct Queue(std::collections::VecDeque<u64>);
/// # impl ArchiveWriter for Queue {
/// #     fn write_bool(&mut self, v: bool) -> Result<(), ArchiveError> { self.write_u64(v as u64) }
/// #     fn write_u8(&mut self, v: u8) -> Result<(), ArchiveError> { self.write_u64(v as u64) }
/// #     fn write_u16(&mut self, v: u16) -> Result<(), ArchiveError> { self.write_u64(v as u64) }
/// #     fn write_u32(&mut self, v: u32) -> Result<(), ArchiveError> { self.write_u64(v as u64) }
/// #     fn write_u64(&mut self, v: u64) -> Result<(), ArchiveError> { self.0.push_back(v); Ok(()) }
/// #     fn write_i8(&mut self, v: i8) -> Result<(), ArchiveError> { self.write_i64(v as i64) }
/// #     fn write_i16(&mut self, v: i16) -> Result<(), ArchiveError> { self.write_i64(v as i64) }
/// #     fn write_i32(&mut self, v: i32) -> Result<(), ArchiveError> { self.write_i64(v as i64) }
/// #     fn write_i64(&mut self, v: i64) -> Result<(), ArchiveError> { self.write_u64(v as u64) }
/// #     fn write_f32(&mut self, v: f32) -> Result<(), ArchiveError> { self.write_f64(v as f64) }
/// #     fn write_f64(&mut self, v: f64) -> Result<(), ArchiveError> { self.write_u64(v.to_bits()) }
/// #     fn write_str(&mut self, v: &str) -> Result<(), ArchiveError> {
/// #         self.write_u64(v.len() as u64)?;
/// #         v.bytes().try_for_each(|b| self.write_u8(b))
/// #     }
/// # }
/// # impl ArchiveReader for Queue {
/// #     fn read_bool(&mut self) -> Result<bool, ArchiveError> { Ok(self.read_u64()? != 0) }
/// #     fn read_u8(&mut self) -> Result<u8, ArchiveError> { Ok(self.read_u64()? as u8) }
/// #     fn read_u16(&mut self) -> Result<u16, ArchiveError> { Ok(self.read_u64()? as u16) }
/// #     fn read_u32(&mut self) -> Result<u32, ArchiveError> { Ok(self.read_u64()? as u32) }
/// #     fn read_u64(&mut self) -> Result<u64, ArchiveError> {
/// #         self.0.pop_front().ok_or(ArchiveError::custom("eof"))
/// #     }
/// #     fn read_i8(&mut self) -> Result<i8, ArchiveError> { Ok(self.read_i64()? as i8) }
/// #     fn read_i16(&mut self) -> Result<i16, ArchiveError> { Ok(self.read_i64()? as i16) }
/// #     fn read_i32(&mut self) -> Result<i32, ArchiveError> { Ok(self.read_i64()? as i32) }
/// #     fn read_i64(&mut self) -> Result<i64, ArchiveError> { Ok(self.read_u64()? as i64) }
/// #     fn read_f32(&mut self) -> Result<f32, ArchiveError> { Ok(self.read_f64()? as f32) }
/// #     fn read_f64(&mut self) -> Result<f64, ArchiveError> { Ok(f64::from_bits(self.read_u64()?)) }
/// #     fn read_string(&mut self) -> Result<String, ArchiveError> {
/// #         let len = self.read_u64()? as usize;
/// #         let bytes = (0..len).map(|_| self.read_u8()).collect::<Result<Vec<_>, _>>()?;
/// #         String::from_utf8(bytes).map_err(ArchiveError::custom)
/// #     }
/// # }
/// let registry = TypeRegistry::new();
///
/// let mut output = OutputSession::new(Queue::default(), &registry, ArchiveFlags::empty()).unwrap();
/// output.save(&vec![1_u32, 2, 3]).unwrap();
///
/// let stream = output.into_writer();
/// let mut input = InputSession::new(stream, &registry, ArchiveFlags::empty()).unwrap();
///
/// let mut numbers: Vec<u32> = Vec::new();
/// input.load_into(&mut numbers).unwrap();
/// assert_eq!(numbers, [1, 2, 3]);
/// ```
pub struct InputSession<'r, R: ArchiveReader> {
    reader: R,
    resolver: &'r dyn ClassResolver,
    flags: ArchiveFlags,
    library_version: u16,
    classes: ClassTable,
    objects: ObjectTable,
    ledger: RollbackLedger,
    pending: Option<Pending>,
    moveable: Moveable,
    depth: u32,
    poisoned: bool,
    #[cfg(all(debug_assertions, feature = "debug"))]
    trace: crate::trace::TypePathStack,
}

impl<'r, R: ArchiveReader> InputSession<'r, R> {
    /// Start a session, reading the header unless
    /// [`ArchiveFlags::NO_HEADER`] is set.
    pub fn new(
        mut reader: R,
        resolver: &'r dyn ClassResolver,
        flags: ArchiveFlags,
    ) -> Result<Self, ArchiveError> {
        let library_version = if flags.contains(ArchiveFlags::NO_HEADER) {
            LIBRARY_VERSION
        } else {
            read_header(&mut reader)?
        };
        log::debug!("input session started, library version {library_version}, flags {flags:?}");

        Ok(Self {
            reader,
            resolver,
            flags,
            library_version,
            classes: ClassTable::new(),
            objects: ObjectTable::new(),
            ledger: RollbackLedger::new(),
            pending: None,
            moveable: Moveable::default(),
            depth: 0,
            poisoned: false,
            #[cfg(all(debug_assertions, feature = "debug"))]
            trace: crate::trace::TypePathStack::new(),
        })
    }

    /// Load a top-level value in place.
    ///
    /// On failure every object created through pointers during the call has
    /// already been destroyed, so `value` may hold dangling pointers and must
    /// not be dropped if it owns them.
    pub fn load_into<T: Archived>(&mut self, value: &mut T) -> Result<(), ArchiveError> {
        self.scoped(|session| {
            let ar: &mut dyn InputArchive = session;
            ar.load(value)
        })
    }

    /// Load a top-level pointer to a `T`.
    ///
    /// On success the caller owns the returned object.
    pub fn load_pointer<T: Archived>(&mut self) -> Result<Option<NonNull<T>>, ArchiveError> {
        self.scoped(|session| {
            let ar: &mut dyn InputArchive = session;
            ar.load_ptr::<T>()
        })
    }

    /// Load a top-level pointer whose static type is `base`.
    ///
    /// See [`InputArchive::load_pointer`].
    pub fn load_dyn_pointer(
        &mut self,
        base: Option<&ClassInfo>,
    ) -> Result<Option<DynPtr>, ArchiveError> {
        self.scoped(|session| session.pointer(base))
    }

    /// Roll back the current call and poison the session.
    ///
    /// Every object created by pointer loads since the last successful
    /// top-level call is destroyed. Returns the number of destroyed objects.
    /// Calling it again does nothing.
    pub fn abort(&mut self) -> usize {
        self.poisoned = true;
        self.pending = None;
        // SAFETY: the ledger only holds objects created during the current
        // top-level call, which has not handed them to the caller.
        let destroyed = unsafe { self.ledger.drain_and_destroy() };
        if destroyed > 0 {
            log::warn!("input session aborted, destroyed {destroyed} partially linked objects");
        }
        destroyed
    }

    // -------------------------------------------------------------------------
    // Introspection

    #[inline]
    pub fn flags(&self) -> ArchiveFlags {
        self.flags
    }

    /// Number of classes seen so far.
    #[inline]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of tracked objects seen so far.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of objects that would be destroyed by [`abort`](Self::abort).
    #[inline]
    pub fn pending_rollback(&self) -> usize {
        self.ledger.len()
    }

    #[inline]
    pub fn class_entry(&self, id: ClassId) -> Option<&ClassEntry> {
        self.classes.get(id)
    }

    /// The address recorded for a tracked object.
    #[inline]
    pub fn object_address(&self, id: ObjectId) -> Option<ObjectPtr> {
        self.objects.address(id)
    }

    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Consume the session and return the underlying reader.
    #[inline]
    pub fn into_reader(self) -> R {
        self.reader
    }

    // -------------------------------------------------------------------------
    // Scoping

    /// Run `f` as one nested call.
    ///
    /// When the outermost call returns, the ledger is committed on success
    /// and drained on failure.
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
                    if !self.ledger.is_empty() {
                        log::debug!("committing {} loaded objects", self.ledger.len());
                    }
                    self.ledger.commit();
                    #[cfg(all(debug_assertions, feature = "debug"))]
                    self.trace.clear();
                }
                Err(err) => {
                    #[cfg(all(debug_assertions, feature = "debug"))]
                    {
                        let stack = self.trace.take_failure();
                        log::error!("load failed: {err} (stack:\n{stack:?})");
                    }
                    #[cfg(not(all(debug_assertions, feature = "debug")))]
                    log::error!("load failed: {err}");
                    self.abort();
                }
            }
        }
        result
    }

    /// Call the fill function of `class`.
    unsafe fn fill(
        &mut self,
        class: &ClassInfo,
        ptr: ObjectPtr,
        file_version: u32,
    ) -> Result<(), ArchiveError> {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.trace.push(class.type_path());

        // SAFETY: upheld by the caller.
        let result = unsafe { class.load(self, ptr, file_version) };

        #[cfg(all(debug_assertions, feature = "debug"))]
        self.trace.pop(result.is_err());

        result
    }

    // -------------------------------------------------------------------------
    // Value loader

    unsafe fn value(&mut self, ptr: ObjectPtr, class: &ClassInfo) -> Result<(), ArchiveError> {
        if class.level() == ImplementationLevel::Primitive {
            // SAFETY: upheld by the caller.
            return unsafe { class.load(self, ptr, class.version()) };
        }

        let pending = self
            .pending
            .take_if(|pending| pending.ptr == ptr && pending.type_id == class.type_id());
        if let Some(pending) = pending {
            // SAFETY: upheld by the caller.
            return unsafe { self.fill(class, ptr, pending.file_version) };
        }

        let class_id = self.classes.register(class)?;
        let (tracking, file_version) =
            self.classes
                .load_preamble(class_id, &mut self.reader, self.flags, self.resolver)?;

        let this_id = self.objects.len();
        if tracking {
            if let Track::Existing(id, _) = self.objects.track(&mut self.reader)? {
                return self.objects.check_class(id, class_id);
            }
            let id = self.objects.reserve(class_id);
            self.objects.record(id, ptr);
            self.moveable.end = self.objects.len();
        }

        // SAFETY: upheld by the caller.
        unsafe { self.fill(class, ptr, file_version)? };
        self.moveable.recent = this_id;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Pointer loader

    /// Map a class id read in front of a pointee to its class, registering
    /// the class on first sight.
    fn pointer_class(
        &mut self,
        raw: i16,
        base: Option<&ClassInfo>,
    ) -> Result<ClassId, ArchiveError> {
        let known = self.classes.len();
        let invalid = StreamError::InvalidClassId { found: raw, known };

        let Ok(index) = usize::try_from(raw) else {
            return Err(invalid.into());
        };
        if index < known {
            return Ok(ClassId::from_index(index));
        }
        if index > known {
            return Err(invalid.into());
        }

        let class = match base {
            Some(base) if !base.is_polymorphic() => *base,
            _ => {
                let name = self.reader.read_export_name()?;
                match self.resolver.resolve_by_name(&name) {
                    Some(class) => *class,
                    None => return Err(ArchiveError::UnregisteredClass(name)),
                }
            }
        };

        // The class may already be known under an older id.
        let id = self.classes.register(&class)?;
        if id.index() != index {
            return Err(invalid.into());
        }
        Ok(id)
    }

    fn pointer(&mut self, base: Option<&ClassInfo>) -> Result<Option<DynPtr>, ArchiveError> {
        let raw = self.reader.read_class_id()?;
        if raw == NULL_POINTER_TAG {
            return Ok(None);
        }

        let class_id = self.pointer_class(raw, base)?;
        let class = match self.classes.get(class_id) {
            Some(entry) => *entry.class(),
            None => {
                let known = self.classes.len();
                return Err(StreamError::InvalidClassId { found: raw, known }.into());
            }
        };
        let (tracking, file_version) =
            self.classes
                .load_preamble(class_id, &mut self.reader, self.flags, self.resolver)?;

        if tracking && let Track::Existing(id, ptr) = self.objects.track(&mut self.reader)? {
            self.objects.check_class(id, class_id)?;
            // SAFETY: the object was created as an instance of this class.
            return Ok(Some(unsafe { DynPtr::new(ptr, class) }));
        }

        let first = self.objects.len();
        let ptr = class.allocate()?;
        let object_id = tracking.then(|| {
            let id = self.objects.reserve(class_id);
            self.objects.record(id, ptr);
            id
        });

        let moveable = self.moveable;
        let outer = self.pending.replace(Pending {
            ptr,
            type_id: class.type_id(),
            file_version,
        });

        // SAFETY: `ptr` is a fresh instance of `class`, owned by this call.
        let result = unsafe { self.value(ptr, &class) };

        self.pending = outer;
        self.moveable = moveable;

        match result {
            Ok(()) => {
                if let Some(id) = object_id {
                    self.objects.mark_pointer(id);
                }
                self.ledger.push(class_id, class, ptr);
                // SAFETY: `ptr` was allocated by `class`.
                Ok(Some(unsafe { DynPtr::new(ptr, class) }))
            }
            Err(err) => {
                // Back-references into the destroyed block must not resolve.
                self.objects.forget_block(first, ptr, class.layout().size());
                // SAFETY: the object never left this call.
                unsafe { class.destroy(ptr) };
                Err(err)
            }
        }
    }
}

impl<R: ArchiveReader> InputArchive for InputSession<'_, R> {
    #[inline]
    fn reader(&mut self) -> &mut dyn ArchiveReader {
        &mut self.reader
    }

    #[inline]
    fn library_version(&self) -> u16 {
        self.library_version
    }

    unsafe fn load_object(
        &mut self,
        ptr: ObjectPtr,
        class: &ClassInfo,
    ) -> Result<(), ArchiveError> {
        // SAFETY: upheld by the caller.
        self.scoped(|session| unsafe { session.value(ptr, class) })
    }

    fn load_pointer(&mut self, base: Option<&ClassInfo>) -> Result<Option<DynPtr>, ArchiveError> {
        self.scoped(|session| session.pointer(base))
    }

    fn reset_object_address(&mut self, new: ObjectPtr, old: ObjectPtr) {
        let range = self.moveable.recent..self.moveable.end;
        self.objects.reset_address(range, old, new);
    }
}

impl<R: ArchiveReader> core::fmt::Debug for InputSession<'_, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputSession")
            .field("flags", &self.flags)
            .field("library_version", &self.library_version)
            .field("classes", &self.classes.len())
            .field("objects", &self.objects.len())
            .field("pending_rollback", &self.ledger.len())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
