use alloc::vec::Vec;

use crate::class::ClassInfo;
use crate::ident::ClassId;
use crate::ptr::ObjectPtr;

// -----------------------------------------------------------------------------
// RollbackLedger

#[derive(Debug, Clone, Copy)]
struct RollbackEntry {
    class_id: ClassId,
    class: ClassInfo,
    ptr: ObjectPtr,
}

/// Heap objects created by pointer loads of the current top-level call.
///
/// The session owns these objects until the call succeeds. On success the
/// ledger is committed and ownership passes to whatever the caller linked
/// the objects into. On failure every entry is destroyed.
#[derive(Debug)]
pub(crate) struct RollbackLedger {
    entries: Vec<RollbackEntry>,
}

impl RollbackLedger {
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
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a fully loaded heap object.
    pub fn push(&mut self, class_id: ClassId, class: ClassInfo, ptr: ObjectPtr) {
        self.entries.push(RollbackEntry {
            class_id,
            class,
            ptr,
        });
    }

    /// Forget every entry without destroying it.
    pub fn commit(&mut self) {
        self.entries.clear();
    }

    /// Destroy every recorded object, newest first.
    ///
    /// Returns the number of destroyed objects.
    ///
    /// # Safety
    /// Every recorded object must still be alive and not be referenced by
    /// anything that outlives this call.
    pub unsafe fn drain_and_destroy(&mut self) -> usize {
        let count = self.entries.len();
        while let Some(entry) = self.entries.pop() {
            log::trace!(
                "destroying `{}` (class {}) at {:p}",
                entry.class.type_path(),
                entry.class_id,
                entry.ptr,
            );
            // SAFETY: the object was allocated by this class and is still
            // exclusively owned by the ledger.
            unsafe { entry.class.destroy(entry.ptr) };
        }
        count
    }
}

// -----------------------------------------------------------------------------
// Tests
