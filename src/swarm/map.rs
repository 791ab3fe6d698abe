use crate::state::State;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Status of a state for one exploration thread.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    /// Never visited by the thread (or visited by an unfinished bounded run).
    Unknown = 0,
    /// On the stack of a reference run.
    Open = 1,
    /// Every successor was explored.
    Closed = 2,
    /// Visited by the current sampling run.
    Phase1 = 3,
    /// On the stack of a run started from a generated seed.
    UnknownOpen = 4,
    /// Lies on a path to a deadlock.
    ClosedDeadlock = 5,
}

impl Color {
    fn from_u8(value: u8) -> Color {
        match value {
            1 => Color::Open,
            2 => Color::Closed,
            3 => Color::Phase1,
            4 => Color::UnknownOpen,
            5 => Color::ClosedDeadlock,
            _ => Color::Unknown,
        }
    }

    /// `true` for the colors of states currently on the stack of a run.
    pub fn is_open(self) -> bool {
        matches!(self, Color::Open | Color::Phase1 | Color::UnknownOpen)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Color::Closed | Color::ClosedDeadlock)
    }
}

/// One color slot per exploration thread.
///
/// A slot is only written by its own thread. Other threads read it with relaxed ordering:
/// closing is monotonic, so a stale read only delays a decision.
#[derive(Debug)]
pub struct ColorArray(Box<[AtomicU8]>);

impl ColorArray {
    pub fn new(threads: usize) -> ColorArray {
        ColorArray((0..threads).map(|_| AtomicU8::new(0)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, tid: usize) -> Color {
        Color::from_u8(self.0[tid].load(Ordering::Relaxed))
    }

    pub fn set(&self, tid: usize, color: Color) {
        self.0[tid].store(color as u8, Ordering::Relaxed);
    }

    /// `true` if some thread's slot has the given color.
    pub fn any(&self, color: Color) -> bool {
        self.0
            .iter()
            .any(|slot| slot.load(Ordering::Relaxed) == color as u8)
    }

    pub fn any_closed(&self) -> bool {
        self.0
            .iter()
            .any(|slot| Color::from_u8(slot.load(Ordering::Relaxed)).is_closed())
    }
}

/// The result of [`SharedStateMap::insert_with`].
#[derive(Debug)]
pub enum Insertion {
    /// The state was not in the map and the fresh color array became its entry.
    New(Arc<ColorArray>),
    /// The state was already present. The fresh color array is given back untouched.
    Existing {
        colors: Arc<ColorArray>,
        fresh: Arc<ColorArray>,
    },
}

impl Insertion {
    pub fn colors(&self) -> &Arc<ColorArray> {
        match self {
            Insertion::New(colors) => colors,
            Insertion::Existing { colors, .. } => colors,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Insertion::New(_))
    }
}

/// The concurrent `state -> colors` map shared by all exploration threads.
///
/// Exactly one insertion of a state succeeds; every later insertion of an equal state
/// observes the same color array. Entries are never removed during an exploration, and the
/// color arrays are reference counted, so a thread may keep using an entry without holding
/// any lock of the map.
pub struct SharedStateMap {
    map: DashMap<State, Arc<ColorArray>>,
    threads: usize,
}

impl SharedStateMap {
    pub fn new(threads: usize) -> SharedStateMap {
        SharedStateMap {
            map: DashMap::new(),
            threads,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Number of distinct states in the map.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, state: &State) -> Option<Arc<ColorArray>> {
        self.map.get(state).map(|entry| entry.value().clone())
    }

    /// Number of states whose slot of thread `tid` has the given color.
    pub fn count(&self, tid: usize, color: Color) -> usize {
        self.map
            .iter()
            .filter(|entry| entry.value().get(tid) == color)
            .count()
    }

    /// Insert `state` with the `fresh` color array unless an equal state is present.
    pub fn insert_with(&self, state: State, fresh: Arc<ColorArray>) -> Insertion {
        debug_assert_eq!(fresh.len(), self.threads);
        match self.map.entry(state) {
            Entry::Occupied(entry) => Insertion::Existing {
                colors: entry.get().clone(),
                fresh,
            },
            Entry::Vacant(entry) => {
                entry.insert(fresh.clone());
                Insertion::New(fresh)
            }
        }
    }

    /// Insert `state` with a new color array; returns the entry and whether it is new.
    pub fn insert(&self, state: State) -> (Arc<ColorArray>, bool) {
        let insertion = self.insert_with(state, Arc::new(ColorArray::new(self.threads)));
        let is_new = insertion.is_new();
        match insertion {
            Insertion::New(colors) | Insertion::Existing { colors, .. } => (colors, is_new),
        }
    }
}
