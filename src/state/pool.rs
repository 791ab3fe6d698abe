//! Reference-counted slot pools.
//!
//! A pool hands out [`PoolRef`] handles instead of pointers. A handle stores the index of
//! its slot and the generation the slot had when it was allocated: once the slot is freed
//! (its reference count drops to zero), the generation is bumped and every stale handle
//! becomes invalid instead of silently aliasing the next allocation. Slots live in boxed
//! chunks, so growing a pool never moves live data.

use std::collections::BTreeMap;

/// Number of slots allocated at once by a [`FixedSizePool`].
const CHUNK_SLOTS: usize = 256;

/// A handle to one slot of a [`FixedSizePool`] or a [`MultipleSizePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolRef {
    width: u32,
    index: u32,
    generation: u32,
}

impl PoolRef {
    /// The number of words of the referenced slot.
    pub fn width(&self) -> usize {
        self.width as usize
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SlotMeta {
    refcount: u32,
    generation: u32,
}

/// A pool of slots with exactly `width` words each.
pub struct FixedSizePool {
    width: usize,
    chunks: Vec<Box<[i32]>>,
    meta: Vec<SlotMeta>,
    free: Vec<u32>,
    live: usize,
}

impl FixedSizePool {
    pub fn new(width: usize) -> FixedSizePool {
        FixedSizePool {
            width,
            chunks: Vec::new(),
            meta: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of slots with a positive reference count.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated (live or free).
    pub fn capacity(&self) -> usize {
        self.meta.len()
    }

    fn slot_range(&self, index: usize) -> (usize, std::ops::Range<usize>) {
        let chunk = index / CHUNK_SLOTS;
        let start = (index % CHUNK_SLOTS) * self.width;
        (chunk, start..start + self.width)
    }

    fn meta(&self, handle: PoolRef) -> Option<&SlotMeta> {
        if handle.width() != self.width {
            return None;
        }
        self.meta
            .get(handle.index as usize)
            .filter(|m| m.refcount > 0 && m.generation == handle.generation)
    }

    /// Copy `words` into a fresh slot with reference count one.
    ///
    /// # Panics
    ///
    /// Panics if `words` does not have the width of this pool.
    pub fn alloc(&mut self, words: &[i32]) -> PoolRef {
        assert_eq!(words.len(), self.width, "Slot width mismatch.");
        let index = match self.free.pop() {
            Some(index) => index as usize,
            None => {
                let index = self.meta.len();
                if index % CHUNK_SLOTS == 0 {
                    let chunk = vec![0i32; CHUNK_SLOTS * self.width];
                    self.chunks.push(chunk.into_boxed_slice());
                }
                self.meta.push(SlotMeta::default());
                index
            }
        };
        let (chunk, range) = self.slot_range(index);
        self.chunks[chunk][range].copy_from_slice(words);
        let meta = &mut self.meta[index];
        meta.refcount = 1;
        self.live += 1;
        PoolRef {
            width: u32::try_from(self.width).unwrap_or(u32::MAX),
            index: u32::try_from(index).unwrap_or(u32::MAX),
            generation: meta.generation,
        }
    }

    /// The words of a live slot, or `None` for a stale handle.
    pub fn get(&self, handle: PoolRef) -> Option<&[i32]> {
        self.meta(handle)?;
        let (chunk, range) = self.slot_range(handle.index as usize);
        Some(&self.chunks[chunk][range])
    }

    /// Increment the reference count of a live slot. Returns `false` for a stale handle.
    pub fn clone_ref(&mut self, handle: PoolRef) -> bool {
        if self.meta(handle).is_none() {
            return false;
        }
        self.meta[handle.index as usize].refcount += 1;
        true
    }

    /// Decrement the reference count of a live slot and free it at zero.
    ///
    /// Returns `true` if the slot was freed. Stale handles are ignored.
    pub fn release(&mut self, handle: PoolRef) -> bool {
        if self.meta(handle).is_none() {
            return false;
        }
        let meta = &mut self.meta[handle.index as usize];
        meta.refcount -= 1;
        if meta.refcount > 0 {
            return false;
        }
        meta.generation = meta.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        true
    }
}

/// A family of [`FixedSizePool`]s, one per slot width.
#[derive(Default)]
pub struct MultipleSizePool {
    pools: BTreeMap<usize, FixedSizePool>,
}

impl MultipleSizePool {
    pub fn new() -> MultipleSizePool {
        MultipleSizePool::default()
    }

    pub fn live(&self) -> usize {
        self.pools.values().map(|p| p.live()).sum()
    }

    pub fn alloc(&mut self, words: &[i32]) -> PoolRef {
        self.pools
            .entry(words.len())
            .or_insert_with(|| FixedSizePool::new(words.len()))
            .alloc(words)
    }

    pub fn get(&self, handle: PoolRef) -> Option<&[i32]> {
        self.pools.get(&handle.width())?.get(handle)
    }

    pub fn clone_ref(&mut self, handle: PoolRef) -> bool {
        self.pools
            .get_mut(&handle.width())
            .is_some_and(|p| p.clone_ref(handle))
    }

    pub fn release(&mut self, handle: PoolRef) -> bool {
        self.pools
            .get_mut(&handle.width())
            .is_some_and(|p| p.release(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::{CHUNK_SLOTS, FixedSizePool, MultipleSizePool};

    #[test]
    fn release_frees_at_zero_and_invalidates_handles() {
        let mut pool = FixedSizePool::new(3);
        let a = pool.alloc(&[1, 2, 3]);
        assert_eq!(pool.get(a), Some(&[1, 2, 3][..]));
        assert!(pool.clone_ref(a));
        assert!(!pool.release(a));
        assert_eq!(pool.live(), 1);
        assert!(pool.release(a));
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.get(a), None);
        assert!(!pool.clone_ref(a));
        assert!(!pool.release(a));

        // The slot is reused with a new generation.
        let b = pool.alloc(&[4, 5, 6]);
        assert_ne!(a, b);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&[4, 5, 6][..]));
    }

    #[test]
    fn growing_keeps_live_slots() {
        let mut pool = FixedSizePool::new(2);
        let handles: Vec<_> = (0..(2 * CHUNK_SLOTS + 1) as i32)
            .map(|i| pool.alloc(&[i, -i]))
            .collect();
        for (i, handle) in handles.iter().enumerate() {
            let i = i as i32;
            assert_eq!(pool.get(*handle), Some(&[i, -i][..]));
        }
        assert_eq!(pool.live(), handles.len());
    }

    #[test]
    fn multiple_sizes_are_separate() {
        let mut pool = MultipleSizePool::new();
        let short = pool.alloc(&[7]);
        let long = pool.alloc(&[1, 2, 3, 4]);
        assert_eq!(short.width(), 1);
        assert_eq!(long.width(), 4);
        assert_eq!(pool.get(short), Some(&[7][..]));
        assert_eq!(pool.live(), 2);
        assert!(pool.release(short));
        assert_eq!(pool.get(short), None);
        assert_eq!(pool.get(long), Some(&[1, 2, 3, 4][..]));
    }
}
