use fixedbitset::FixedBitSet;
use hashbrown::hash_map::Entry;

use crate::hash::{HashMap, new_map};
use crate::ident::{ClassId, ObjectId};
use crate::ptr::ObjectPtr;

/// Result of looking up an object before writing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Seen {
    New(ObjectId),
    Saved(ObjectId),
}

/// Tracked objects of one output session.
///
/// Identity is the address together with the class, so that a value and
/// its first field are different objects.
#[derive(Debug)]
pub(crate) struct ObjectTable {
    ids: HashMap<(usize, ClassId), ObjectId>,
    through_pointer: FixedBitSet,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self {
            ids: new_map(),
            through_pointer: FixedBitSet::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Look `ptr` up, assigning the next id if it was not saved yet.
    pub fn insert(&mut self, ptr: ObjectPtr, class_id: ClassId) -> Seen {
        let next = ObjectId::from_index(self.ids.len());
        match self.ids.entry((ptr.addr(), class_id)) {
            Entry::Occupied(entry) => Seen::Saved(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(next);
                log::trace!("object {next} of class {class_id} at {ptr:p}");
                Seen::New(next)
            }
        }
    }

    pub fn mark_pointer(&mut self, id: ObjectId) {
        self.through_pointer.grow_and_insert(id.index());
    }

    /// Whether the object was first saved through a pointer.
    pub fn is_pointer(&self, id: ObjectId) -> bool {
        self.through_pointer.contains(id.index())
    }
}
