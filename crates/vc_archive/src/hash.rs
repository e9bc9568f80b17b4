//! Hash containers used by the session tables, built on *hashbrown* and *foldhash*.

use core::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};

/// Seed shared by every table in this crate.
const ARCHIVE_HASH_STATE: FixedState = FixedState::with_seed(0x5A17_C0DE_9E37_79B9);

/// Deterministic hash state, the result only depends on the input.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FoldHasher<'static>;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        ARCHIVE_HASH_STATE.build_hasher()
    }
}

pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, FixedHashState>;

#[inline]
pub(crate) const fn new_map<K, V>() -> HashMap<K, V> {
    hashbrown::HashMap::with_hasher(FixedHashState)
}
