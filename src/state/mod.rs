//! Storage of exploration states.
//!
//! Every exploration thread owns a [`StateManager`] which encodes the valuations produced by
//! a [`crate::model::Model`] and keeps them in a pool as `[hash, length, words...]` slots.
//! Threads exchange states through [`State`], an immutable shared handle with the same
//! layout, which is what the shared map stores.

use std::fmt::{Debug, Formatter};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

pub mod compress;
pub mod pool;

pub use compress::Compression;
pub use pool::{FixedSizePool, MultipleSizePool, PoolRef};

/// Number of reserved words at the beginning of every slot (hash and encoded length).
const HEADER: usize = 2;

/// An immutable, shared exploration state.
///
/// Equality compares the encoded words, hashing uses the cached 32-bit hash.
#[derive(Clone)]
pub struct State(Arc<[i32]>);

impl State {
    /// The cached hash of the encoded valuation.
    pub fn hash32(&self) -> u32 {
        self.0[0] as u32
    }

    /// The encoded valuation.
    pub fn words(&self) -> &[i32] {
        &self.0[HEADER..]
    }

    /// Number of handles sharing this state.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "State#{:08x}{:?}", self.hash32(), self.words())
    }
}

fn hash_words(words: &[i32]) -> u32 {
    let mut hasher = DefaultHasher::new();
    words.hash(&mut hasher);
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

enum Storage {
    Fixed(FixedSizePool),
    Multiple(MultipleSizePool),
}

/// Per-thread encoding and allocation of states.
pub struct StateManager {
    state_size: usize,
    compression: Compression,
    storage: Storage,
    buffer: Vec<i32>,
}

impl StateManager {
    pub fn new(state_size: usize, compression: Compression) -> StateManager {
        let storage = if compression.is_variable_size() {
            Storage::Multiple(MultipleSizePool::new())
        } else {
            Storage::Fixed(FixedSizePool::new(HEADER + state_size))
        };
        StateManager {
            state_size,
            compression,
            storage,
            buffer: Vec::with_capacity(HEADER + state_size),
        }
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Number of live pool slots.
    pub fn live(&self) -> usize {
        match &self.storage {
            Storage::Fixed(pool) => pool.live(),
            Storage::Multiple(pool) => pool.live(),
        }
    }

    /// Encode `valuation` into a fresh pool slot.
    ///
    /// # Panics
    ///
    /// Panics if the valuation does not have [`StateManager::state_size`] values.
    pub fn alloc(&mut self, valuation: &[i32]) -> PoolRef {
        assert_eq!(valuation.len(), self.state_size, "State size mismatch.");
        self.buffer.clear();
        self.buffer.extend_from_slice(&[0; HEADER]);
        self.compression.encode(valuation, &mut self.buffer);
        let length = self.buffer.len() - HEADER;
        self.buffer[0] = hash_words(&self.buffer[HEADER..]) as i32;
        self.buffer[1] = i32::try_from(length).unwrap_or(i32::MAX);
        match &mut self.storage {
            Storage::Fixed(pool) => pool.alloc(&self.buffer),
            Storage::Multiple(pool) => pool.alloc(&self.buffer),
        }
    }

    /// The raw slot (header included) of a live handle.
    pub fn get(&self, handle: PoolRef) -> Option<&[i32]> {
        match &self.storage {
            Storage::Fixed(pool) => pool.get(handle),
            Storage::Multiple(pool) => pool.get(handle),
        }
    }

    pub fn clone_ref(&mut self, handle: PoolRef) -> bool {
        match &mut self.storage {
            Storage::Fixed(pool) => pool.clone_ref(handle),
            Storage::Multiple(pool) => pool.clone_ref(handle),
        }
    }

    /// Drop one reference of `handle`; returns `true` if its slot was freed.
    pub fn release(&mut self, handle: PoolRef) -> bool {
        match &mut self.storage {
            Storage::Fixed(pool) => pool.release(handle),
            Storage::Multiple(pool) => pool.release(handle),
        }
    }

    /// Create a shared [`State`] with the contents of a live slot.
    pub fn share(&self, handle: PoolRef) -> Option<State> {
        self.get(handle).map(|slot| State(Arc::from(slot)))
    }

    /// Decode a state into `out`, which must have [`StateManager::state_size`] values.
    pub fn decode(&self, state: &State, out: &mut [i32]) {
        self.compression.decode(state.words(), out);
    }

    /// Decode a pooled state into `out`. Returns `false` for a stale handle.
    pub fn decode_ref(&self, handle: PoolRef, out: &mut [i32]) -> bool {
        match self.get(handle) {
            Some(slot) => {
                self.compression.decode(&slot[HEADER..], out);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Compression, StateManager};
    use std::collections::HashSet;

    #[test]
    fn shared_states_compare_by_content() {
        for compression in [
            Compression::None,
            Compression::RunLength,
            Compression::BytePacked,
        ] {
            let mut manager = StateManager::new(4, compression);
            let a = manager.alloc(&[0, 0, 1, 0]);
            let b = manager.alloc(&[0, 0, 1, 0]);
            let c = manager.alloc(&[0, 1, 1, 0]);
            assert_ne!(a, b);
            assert_eq!(manager.live(), 3);

            let sa = manager.share(a).unwrap();
            let sb = manager.share(b).unwrap();
            let sc = manager.share(c).unwrap();
            assert_eq!(sa, sb);
            assert_eq!(sa.hash32(), sb.hash32());
            assert_ne!(sa, sc);
            let set: HashSet<_> = [sa.clone(), sb, sc].into_iter().collect();
            assert_eq!(set.len(), 2);

            let mut decoded = [9; 4];
            manager.decode(&sa, &mut decoded);
            assert_eq!(decoded, [0, 0, 1, 0]);

            // Shared states outlive their pool slots.
            assert!(manager.release(a));
            assert!(manager.share(a).is_none());
            assert!(!manager.decode_ref(a, &mut decoded));
            assert_eq!(sa.words().len(), manager.get(b).unwrap().len() - 2);
        }
    }

    #[test]
    fn slot_header_caches_hash_and_length() {
        let mut manager = StateManager::new(6, Compression::RunLength);
        let handle = manager.alloc(&[3, 3, 3, 3, 3, 3]);
        let slot = manager.get(handle).unwrap();
        assert_eq!(slot[1], 2);
        assert_eq!(&slot[2..], &[3, 6]);
        let state = manager.share(handle).unwrap();
        assert_eq!(state.hash32(), slot[0] as u32);
        assert_eq!(state.handles(), 1);
    }
}
