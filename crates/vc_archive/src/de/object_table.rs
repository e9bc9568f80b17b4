use alloc::vec::Vec;

use crate::error::{ArchiveError, StreamError};
use crate::ident::{ClassId, ObjectId};
use crate::ptr::ObjectPtr;
use crate::stream::ArchiveReader;

// -----------------------------------------------------------------------------
// ObjectEntry

#[derive(Debug, Clone, Copy)]
struct ObjectEntry {
    /// `None` between `reserve` and `record`.
    address: Option<ObjectPtr>,
    class_id: ClassId,
    loaded_as_pointer: bool,
}

/// Outcome of reading an object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Track {
    /// First appearance, the caller loads the object and records it.
    New(ObjectId),
    /// Back-reference to an object loaded earlier in the stream.
    Existing(ObjectId, ObjectPtr),
}

// -----------------------------------------------------------------------------
// ObjectTable

/// Tracked objects of one input session, in first-seen order.
#[derive(Debug)]
pub(crate) struct ObjectTable {
    entries: Vec<ObjectEntry>,
}

impl ObjectTable {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn address(&self, id: ObjectId) -> Option<ObjectPtr> {
        self.entries.get(id.index()).and_then(|entry| entry.address)
    }

    #[inline]
    pub fn class_id(&self, id: ObjectId) -> Option<ClassId> {
        self.entries.get(id.index()).map(|entry| entry.class_id)
    }

    /// Read an object id and decide between a new object and a back-reference.
    ///
    /// Ids are dense: the only valid new id is the current table size.
    pub fn track(&self, reader: &mut dyn ArchiveReader) -> Result<Track, ArchiveError> {
        let raw = reader.read_object_id()?;
        let len = self.entries.len();

        if (raw as usize) < len {
            return match self.entries[raw as usize].address {
                Some(address) => Ok(Track::Existing(ObjectId::from_index(raw as usize), address)),
                None => Err(StreamError::ForwardReference(raw).into()),
            };
        }
        if raw as usize == len {
            return Ok(Track::New(ObjectId::from_index(len)));
        }
        Err(StreamError::InvalidObjectId {
            found: raw,
            expected: len as u32,
        }
        .into())
    }

    /// A back-reference must name the class the object was loaded as.
    pub fn check_class(&self, id: ObjectId, class_id: ClassId) -> Result<(), ArchiveError> {
        match self.class_id(id) {
            Some(expected) if expected == class_id => Ok(()),
            Some(expected) => Err(StreamError::ObjectClassMismatch {
                object: id.to_wire(),
                expected: expected.to_wire(),
                found: class_id.to_wire(),
            }
            .into()),
            None => Err(StreamError::ForwardReference(id.to_wire()).into()),
        }
    }

    /// Assign the next object id before the object is filled.
    pub fn reserve(&mut self, class_id: ClassId) -> ObjectId {
        let id = ObjectId::from_index(self.entries.len());
        self.entries.push(ObjectEntry {
            address: None,
            class_id,
            loaded_as_pointer: false,
        });
        id
    }

    /// Bind the final address to a reserved id.
    ///
    /// Must happen before the object's own fields are loaded, so that a
    /// cycle back to the object resolves.
    pub fn record(&mut self, id: ObjectId, address: ObjectPtr) {
        let entry = &mut self.entries[id.index()];
        debug_assert!(entry.address.is_none(), "object {id} recorded twice");
        entry.address = Some(address);
        log::trace!("object {id} of class {} at {address:p}", entry.class_id);
    }

    /// Unbind every entry from `from` on whose address lies in the block of
    /// `size` bytes at `base`, after that block was destroyed.
    pub fn forget_block(&mut self, from: usize, base: ObjectPtr, size: usize) {
        let start = base.addr();
        let end = start.saturating_add(size.max(1));
        for entry in self.entries.iter_mut().skip(from) {
            if entry.address.is_some_and(|a| (start..end).contains(&a.addr())) {
                entry.address = None;
            }
        }
    }

    /// Heap objects created by pointer loads never move.
    pub fn mark_pointer(&mut self, id: ObjectId) {
        self.entries[id.index()].loaded_as_pointer = true;
    }

    /// Move the objects in `range`, starting at the one recorded at `old`,
    /// to the block at `new`.
    ///
    /// Entries before the one at `old` and entries loaded through pointers
    /// are left alone. Does nothing when `old` is not in the range.
    pub fn reset_address(
        &mut self,
        range: core::ops::Range<usize>,
        old: ObjectPtr,
        new: ObjectPtr,
    ) {
        let end = range.end.min(self.entries.len());
        let start = range.start.min(end);
        let entries = &mut self.entries[start..end];

        let Some(first) = entries.iter().position(|entry| entry.address == Some(old)) else {
            return;
        };

        for entry in &mut entries[first..] {
            if entry.loaded_as_pointer {
                continue;
            }
            if let Some(address) = entry.address {
                entry.address = Some(address.rebase(old, new));
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::ptr::NonNull;

    use super::{ObjectTable, Track};
    use crate::error::{ArchiveError, StreamError};
    use crate::ident::{ClassId, ObjectId};
    use crate::ptr::ObjectPtr;
    use crate::testing::{Token, TokenReader};

    fn addr(v: &mut [u64; 4], i: usize) -> ObjectPtr {
        ObjectPtr::from(NonNull::from(&mut v[i]))
    }

    #[test]
    fn new_then_back_reference() {
        let mut slots = [0u64; 4];
        let mut table = ObjectTable::new();
        let mut reader = TokenReader::new([Token::ObjectId(0), Token::ObjectId(0)]);

        assert_eq!(table.track(&mut reader).unwrap(), Track::New(ObjectId::from_index(0)));
        let id = table.reserve(ClassId::from_index(0));
        table.record(id, addr(&mut slots, 0));

        assert_eq!(
            table.track(&mut reader).unwrap(),
            Track::Existing(id, addr(&mut slots, 0))
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.class_id(id), Some(ClassId::from_index(0)));
    }

    #[test]
    fn back_reference_keeps_its_class() {
        let mut slots = [0u64; 4];
        let mut table = ObjectTable::new();
        let id = table.reserve(ClassId::from_index(0));
        table.record(id, addr(&mut slots, 0));

        assert!(table.check_class(id, ClassId::from_index(0)).is_ok());
        assert_eq!(
            table.check_class(id, ClassId::from_index(1)).unwrap_err(),
            ArchiveError::Malformed(StreamError::ObjectClassMismatch {
                object: 0,
                expected: 0,
                found: 1,
            })
        );
    }

    #[test]
    fn forgotten_block_is_not_resolvable() {
        let mut slots = [0u64; 4];
        let mut table = ObjectTable::new();
        for i in [0, 1, 3] {
            let id = table.reserve(ClassId::from_index(0));
            table.record(id, addr(&mut slots, i));
        }

        // Drop slots 1 and 2 from entry 1 on.
        table.forget_block(1, addr(&mut slots, 1), 2 * size_of::<u64>());

        assert!(table.address(ObjectId::from_index(0)).is_some());
        assert_eq!(table.address(ObjectId::from_index(1)), None);
        assert_eq!(table.address(ObjectId::from_index(2)), Some(addr(&mut slots, 3)));

        let mut reader = TokenReader::new([Token::ObjectId(1)]);
        let err = table.track(&mut reader).unwrap_err();
        assert_eq!(err, ArchiveError::Malformed(StreamError::ForwardReference(1)));
    }

    #[test]
    fn ids_must_be_dense() {
        let table = ObjectTable::new();
        let mut reader = TokenReader::new([Token::ObjectId(3)]);
        let err = table.track(&mut reader).unwrap_err();
        assert_eq!(
            err,
            ArchiveError::Malformed(StreamError::InvalidObjectId { found: 3, expected: 0 })
        );
    }

    #[test]
    fn reserved_slot_is_not_resolvable() {
        let mut table = ObjectTable::new();
        table.reserve(ClassId::from_index(0));
        let mut reader = TokenReader::new([Token::ObjectId(0)]);
        let err = table.track(&mut reader).unwrap_err();
        assert_eq!(err, ArchiveError::Malformed(StreamError::ForwardReference(0)));
    }

    #[test]
    fn reset_moves_from_matching_entry() {
        let mut old = [0u64; 4];
        let mut new = [0u64; 4];
        let mut table = ObjectTable::new();

        for i in 0..3 {
            let id = table.reserve(ClassId::from_index(0));
            table.record(id, addr(&mut old, i));
        }
        table.mark_pointer(ObjectId::from_index(2));

        table.reset_address(1..3, addr(&mut old, 1), addr(&mut new, 0));

        assert_eq!(table.address(ObjectId::from_index(0)), Some(addr(&mut old, 0)));
        assert_eq!(table.address(ObjectId::from_index(1)), Some(addr(&mut new, 0)));
        // Pointer-loaded objects stay where they are.
        assert_eq!(table.address(ObjectId::from_index(2)), Some(addr(&mut old, 2)));
    }
}
