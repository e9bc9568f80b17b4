use alloc::vec::Vec;
use core::any::TypeId;

use crate::class::ClassInfo;
use crate::error::ArchiveError;
use crate::flags::ArchiveFlags;
use crate::hash::{HashMap, new_map};
use crate::ident::ClassId;
use crate::registry::ClassResolver;
use crate::stream::ArchiveReader;

// -----------------------------------------------------------------------------
// ClassEntry

/// What an input session knows about one class of its stream.
///
/// Created the first time the class is encountered, its preamble fields are
/// filled the first time an instance is actually loaded.
#[derive(Debug, Clone, Copy)]
pub struct ClassEntry {
    class: ClassInfo,
    file_version: u32,
    tracking: bool,
    initialized: bool,
}

impl ClassEntry {
    #[inline(always)]
    pub const fn class(&self) -> &ClassInfo {
        &self.class
    }

    /// The version the class was saved with.
    ///
    /// Meaningless until [`is_initialized`](Self::is_initialized).
    #[inline(always)]
    pub const fn file_version(&self) -> u32 {
        self.file_version
    }

    /// Whether instances of the class carry object ids in this stream.
    ///
    /// Meaningless until [`is_initialized`](Self::is_initialized).
    #[inline(always)]
    pub const fn is_tracked(&self) -> bool {
        self.tracking
    }

    /// Whether the class preamble has been read.
    #[inline(always)]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }
}

// -----------------------------------------------------------------------------
// ClassTable

/// Class ids of one input session, in first-seen order.
#[derive(Debug)]
pub(crate) struct ClassTable {
    entries: Vec<ClassEntry>,
    index: HashMap<TypeId, ClassId>,
}

impl ClassTable {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: new_map(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn get(&self, id: ClassId) -> Option<&ClassEntry> {
        self.entries.get(id.index())
    }

    #[inline]
    pub fn find(&self, type_id: TypeId) -> Option<ClassId> {
        self.index.get(&type_id).copied()
    }

    /// Returns the id of `class`, appending an uninitialized entry the
    /// first time the class is seen.
    pub fn register(&mut self, class: &ClassInfo) -> Result<ClassId, ArchiveError> {
        if let Some(id) = self.find(class.type_id()) {
            return Ok(id);
        }
        if self.entries.len() >= ClassId::MAX_CLASSES {
            return Err(ArchiveError::ClassLimit(ClassId::MAX_CLASSES));
        }

        let id = ClassId::from_index(self.entries.len());
        self.entries.push(ClassEntry {
            class: *class,
            file_version: 0,
            tracking: false,
            initialized: false,
        });
        self.index.insert(class.type_id(), id);

        log::trace!("class {id} is `{}`", class.type_path());
        Ok(id)
    }

    /// Read the preamble of a class the first time it is needed.
    ///
    /// Returns the tracking flag and file version, cached after the
    /// first call.
    pub fn load_preamble(
        &mut self,
        id: ClassId,
        reader: &mut dyn ArchiveReader,
        flags: ArchiveFlags,
        resolver: &dyn ClassResolver,
    ) -> Result<(bool, u32), ArchiveError> {
        let entry = &mut self.entries[id.index()];
        if entry.initialized {
            return Ok((entry.tracking, entry.file_version));
        }

        if entry.class.has_class_info() {
            // Written for self-describing formats, the id is positional here.
            let _ = reader.read_class_id_optional()?;
            entry.tracking = reader.read_tracking()?;
            entry.file_version = reader.read_version()?;
        } else {
            entry.tracking = entry.class.is_tracked(flags, resolver);
            entry.file_version = entry.class.version();
        }

        if entry.file_version > entry.class.version() {
            return Err(ArchiveError::UnsupportedClassVersion {
                type_path: entry.class.type_path(),
                file_version: entry.file_version,
                current: entry.class.version(),
            });
        }

        entry.initialized = true;
        Ok((entry.tracking, entry.file_version))
    }
}

// -----------------------------------------------------------------------------
// Tests
