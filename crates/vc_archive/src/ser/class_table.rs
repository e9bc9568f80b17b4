use alloc::vec::Vec;
use core::any::TypeId;

use crate::class::ClassInfo;
use crate::error::ArchiveError;
use crate::flags::ArchiveFlags;
use crate::hash::{HashMap, new_map};
use crate::ident::ClassId;
use crate::registry::ClassResolver;
use crate::stream::ArchiveWriter;

#[derive(Debug, Clone, Copy)]
struct ClassSlot {
    class: ClassInfo,
    tracking: bool,
    written: bool,
}

/// Class ids of one output session, in first-written order.
#[derive(Debug)]
pub(crate) struct ClassTable {
    slots: Vec<ClassSlot>,
    index: HashMap<TypeId, ClassId>,
}

impl ClassTable {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: new_map(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns the id of `class` and whether it was assigned by this call.
    pub fn register(
        &mut self,
        class: &ClassInfo,
        flags: ArchiveFlags,
        resolver: &dyn ClassResolver,
    ) -> Result<(ClassId, bool), ArchiveError> {
        if let Some(id) = self.index.get(&class.type_id()) {
            return Ok((*id, false));
        }
        if self.slots.len() >= ClassId::MAX_CLASSES {
            return Err(ArchiveError::ClassLimit(ClassId::MAX_CLASSES));
        }

        let id = ClassId::from_index(self.slots.len());
        self.slots.push(ClassSlot {
            class: *class,
            tracking: class.is_tracked(flags, resolver),
            written: false,
        });
        self.index.insert(class.type_id(), id);

        log::trace!("class {id} is `{}`", class.type_path());
        Ok((id, true))
    }

    /// Write the class preamble the first time it is needed.
    ///
    /// Returns whether instances of the class are tracked.
    pub fn save_preamble(
        &mut self,
        id: ClassId,
        writer: &mut dyn ArchiveWriter,
    ) -> Result<bool, ArchiveError> {
        let slot = &mut self.slots[id.index()];
        if !slot.written && slot.class.has_class_info() {
            writer.write_class_id_optional(id.to_wire())?;
            writer.write_tracking(slot.tracking)?;
            writer.write_version(slot.class.version())?;
        }
        slot.written = true;
        Ok(slot.tracking)
    }
}
