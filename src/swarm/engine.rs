use crate::model::{KripkeCube, Model, SuccIter};
use crate::state::{PoolRef, State};
use crate::swarm::SwarmConfig;
use crate::swarm::interpolate::Interpolate;
use crate::swarm::map::{Color, ColorArray, Insertion, SharedStateMap};
use log::{debug, info, trace};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// The exploration strategy run by every thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwarmMode {
    /// Independent DFS runs from the initial state.
    #[default]
    Dfs,
    /// Independent DFS runs that stop at the first deadlock.
    Deadlock,
    /// Half of the threads run [`SwarmMode::Dfs`], the other half explores from generated seeds.
    Generational,
    /// [`SwarmMode::Generational`] with deadlock detection.
    GenerationalDeadlock,
}

impl SwarmMode {
    pub fn detects_deadlocks(self) -> bool {
        matches!(self, SwarmMode::Deadlock | SwarmMode::GenerationalDeadlock)
    }

    pub fn is_generational(self) -> bool {
        matches!(self, SwarmMode::Generational | SwarmMode::GenerationalDeadlock)
    }
}

/// What a thread does within its [`SwarmMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Exhaustive DFS from the initial state.
    Reference,
    /// Sampling, interpolation and bounded runs from generated seeds.
    Generational,
}

impl Role {
    /// In generational modes, the first half of the threads (rounded up) are references.
    pub fn of(mode: SwarmMode, tid: usize, threads: usize) -> Role {
        if mode.is_generational() && tid >= threads.div_ceil(2) {
            Role::Generational
        } else {
            Role::Reference
        }
    }
}

/// Counters of one exploration thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwarmStats {
    /// Accepted pushes (a state may be counted again by a later bounded run).
    pub states: usize,
    /// Explored edges.
    pub transitions: usize,
    /// Largest DFS stack size.
    pub max_dfs: usize,
    pub has_deadlock: bool,
    /// Deadlocks confirmed by this thread (at most one, the thread stops afterwards).
    pub deadlocks_detected: usize,
    /// Deadlocks reached from generated seeds, which may be unreachable.
    pub candidate_deadlocks: usize,
    /// Completed sampling and interpolation rounds.
    pub generations: usize,
    /// Generated seed states.
    pub seeds: usize,
    pub walltime: Duration,
}

/// State shared by all exploration threads.
pub struct SwarmShared {
    pub map: SharedStateMap,
    /// Set to make every thread stop at its next push or pop.
    pub stop: AtomicBool,
    /// Set before `stop` when a deadlock is confirmed.
    pub deadlock_found: AtomicBool,
    /// Set when the state limit was exceeded.
    pub exhausted: AtomicBool,
    discovered: AtomicUsize,
}

impl SwarmShared {
    pub fn new(threads: usize) -> SwarmShared {
        SwarmShared {
            map: SharedStateMap::new(threads),
            stop: AtomicBool::new(false),
            deadlock_found: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
            discovered: AtomicUsize::new(0),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// How deadlocks found by a run are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeadlockCheck {
    Off,
    /// The run starts in the initial state, so every deadlock it finds is real.
    Confirmed,
    /// The run starts in a generated seed, which may not be reachable.
    Candidate,
}

/// The differences between the runs of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RunPolicy {
    /// Color of states on the stack.
    open: Color,
    /// Maximal number of accepted pushes.
    bound: Option<usize>,
    deadlocks: DeadlockCheck,
}

impl RunPolicy {
    fn reference(mode: SwarmMode) -> RunPolicy {
        RunPolicy {
            open: Color::Open,
            bound: None,
            deadlocks: if mode.detects_deadlocks() {
                DeadlockCheck::Confirmed
            } else {
                DeadlockCheck::Off
            },
        }
    }

    fn sampling(mode: SwarmMode, sample_size: usize) -> RunPolicy {
        RunPolicy {
            open: Color::Phase1,
            bound: Some(sample_size),
            ..RunPolicy::reference(mode)
        }
    }

    fn seed(mode: SwarmMode, seed_bound: usize) -> RunPolicy {
        RunPolicy {
            open: Color::UnknownOpen,
            bound: Some(seed_bound),
            deadlocks: if mode.detects_deadlocks() {
                DeadlockCheck::Candidate
            } else {
                DeadlockCheck::Off
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// The stack became empty.
    Exhausted,
    /// The run was cut by its bound.
    BoundReached,
    /// The shared stop flag was raised by someone else.
    Stopped,
    /// The run confirmed or observed a deadlock.
    Deadlock,
}

/// The reaction of the engine to a pushed state.
#[derive(Debug)]
pub(crate) enum Push {
    Accepted(Arc<ColorArray>),
    /// Some thread closed the state.
    Closed,
    /// The state is on the stack of the current run (or was sampled by it).
    OnStack,
    /// The state leads to a deadlock found by another thread.
    Deadlock,
}

struct Frame {
    colors: Arc<ColorArray>,
    successors: SuccIter,
    /// Value of [`SwarmStats::transitions`] when the state was pushed.
    transitions: usize,
    /// Whether every successor was completely explored without touching the stack.
    complete: bool,
}

/// One exploration thread.
///
/// All variants of the swarmed search share this engine; a [`RunPolicy`] selects the color
/// of open states, the bound and the deadlock treatment of every run.
pub struct SwarmEngine<'a, M: Model + ?Sized> {
    tid: usize,
    mode: SwarmMode,
    role: Role,
    config: &'a SwarmConfig,
    shared: &'a SwarmShared,
    interpolation: Option<&'a dyn Interpolate>,
    cube: KripkeCube<'a, M>,
    stack: Vec<Frame>,
    /// A color array given back by the map, reused by the next push.
    spare: Option<Arc<ColorArray>>,
    /// Color arrays tagged during the current sampling run.
    sampled: Vec<Arc<ColorArray>>,
    /// States kept by the current sampling run.
    samples: Vec<PoolRef>,
    seeds: VecDeque<PoolRef>,
    stats: SwarmStats,
}

impl<'a, M: Model + ?Sized> SwarmEngine<'a, M> {
    pub fn new(
        tid: usize,
        model: &'a M,
        config: &'a SwarmConfig,
        shared: &'a SwarmShared,
        interpolation: Option<&'a dyn Interpolate>,
    ) -> SwarmEngine<'a, M> {
        SwarmEngine {
            tid,
            mode: config.mode,
            role: Role::of(config.mode, tid, shared.map.threads()),
            config,
            shared,
            interpolation,
            cube: KripkeCube::new(model, config.cube),
            stack: Vec::new(),
            spare: None,
            sampled: Vec::new(),
            samples: Vec::new(),
            seeds: VecDeque::new(),
            stats: SwarmStats::default(),
        }
    }

    pub fn tid(&self) -> usize {
        self.tid
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stats(&self) -> &SwarmStats {
        &self.stats
    }

    /// Run the thread until its work is done or the shared stop flag is raised.
    pub fn run(mut self) -> SwarmStats {
        let start = Instant::now();
        debug!("Thread {} starts as {:?} ({:?}).", self.tid, self.role, self.mode);
        match self.role {
            Role::Reference => self.run_reference(),
            Role::Generational => self.run_generational(),
        }
        if self.mode.detects_deadlocks() && self.shared.deadlock_found.load(Ordering::SeqCst) {
            self.stats.has_deadlock = true;
        }
        self.stats.walltime = start.elapsed();
        info!(
            "Thread {} finished: {} states, {} transitions, deadlock: {}.",
            self.tid, self.stats.states, self.stats.transitions, self.stats.has_deadlock
        );
        self.stats
    }

    fn run_reference(&mut self) {
        let init = self.cube.initial();
        let outcome = self.dfs(init, RunPolicy::reference(self.mode));
        debug!("Thread {} reference run ended: {:?}.", self.tid, outcome);
        if outcome == RunOutcome::Exhausted && self.mode.is_generational() {
            self.shared.request_stop();
        }
    }

    fn run_generational(&mut self) {
        let Some(interpolation) = self.interpolation else {
            debug!("Thread {} has no interpolation and falls back to a reference run.", self.tid);
            return self.run_reference();
        };
        let sampling = RunPolicy::sampling(self.mode, self.config.sample_size);
        let seed = RunPolicy::seed(self.mode, self.config.seed_bound);

        while !self.shared.is_stopped() {
            let init = self.cube.initial();
            let outcome = self.dfs(init, sampling);
            for colors in self.sampled.drain(..) {
                if colors.get(self.tid) == Color::Phase1 {
                    colors.set(self.tid, Color::Unknown);
                }
            }
            let samples = self.take_samples();
            if matches!(outcome, RunOutcome::Stopped | RunOutcome::Deadlock) {
                return;
            }

            let generated = interpolation.interpolate(&samples);
            self.stats.generations += 1;
            self.stats.seeds += generated.len();
            debug!(
                "Thread {} generation {}: {} samples, {} seeds.",
                self.tid,
                self.stats.generations,
                samples.len(),
                generated.len()
            );
            let state_size = self.cube.manager().state_size();
            for valuation in generated.iter().filter(|v| v.len() == state_size) {
                let handle = self.cube.alloc(valuation);
                self.seeds.push_back(handle);
            }

            while let Some(handle) = self.seeds.pop_front() {
                if self.shared.is_stopped() {
                    self.cube.release(handle);
                } else {
                    let outcome = self.dfs(handle, seed);
                    trace!("Thread {} seed run ended: {:?}.", self.tid, outcome);
                }
            }
        }
    }

    /// Decode and release the states kept by the last sampling run.
    fn take_samples(&mut self) -> Vec<Vec<i32>> {
        let mut valuation = vec![0; self.cube.manager().state_size()];
        let mut result = Vec::with_capacity(self.samples.len());
        for handle in std::mem::take(&mut self.samples) {
            if self.cube.manager().decode_ref(handle, &mut valuation) {
                result.push(valuation.clone());
            }
            self.cube.release(handle);
        }
        result
    }

    /// Try to push `state` with the given open color.
    ///
    /// A state is rejected if some thread closed it or if it is already open for this
    /// thread. Otherwise this thread's slot is set to `open`.
    pub(crate) fn push(&mut self, state: State, open: Color) -> Push {
        let fresh = self
            .spare
            .take()
            .unwrap_or_else(|| Arc::new(ColorArray::new(self.shared.map.threads())));
        let colors = match self.shared.map.insert_with(state, fresh) {
            Insertion::New(colors) => {
                let discovered = self.shared.discovered.fetch_add(1, Ordering::Relaxed) + 1;
                if discovered > self.config.max_states {
                    self.shared.exhausted.store(true, Ordering::SeqCst);
                    self.shared.request_stop();
                }
                colors
            }
            Insertion::Existing { colors, fresh } => {
                self.spare = Some(fresh);
                if colors.any(Color::ClosedDeadlock) {
                    return Push::Deadlock;
                }
                if colors.any_closed() {
                    return Push::Closed;
                }
                if colors.get(self.tid).is_open() {
                    return Push::OnStack;
                }
                colors
            }
        };
        colors.set(self.tid, open);
        self.stats.states += 1;
        Push::Accepted(colors)
    }

    /// Close a popped state for this thread.
    pub(crate) fn close(&self, colors: &ColorArray) {
        colors.set(self.tid, Color::Closed);
    }

    /// Explore from `root` (whose handle is consumed) until the stack is empty.
    fn dfs(&mut self, root: PoolRef, policy: RunPolicy) -> RunOutcome {
        let Some(state) = self.cube.share(root) else {
            return RunOutcome::Exhausted;
        };
        match self.push(state.clone(), policy.open) {
            Push::Accepted(colors) => self.open_frame(state, colors, root, policy),
            Push::Deadlock => {
                self.cube.release(root);
                return self.observe_deadlock();
            }
            Push::Closed | Push::OnStack => {
                self.cube.release(root);
                return RunOutcome::Exhausted;
            }
        }
        let mut pushed = 1usize;

        loop {
            if self.shared.is_stopped() {
                self.unwind(policy);
                return RunOutcome::Stopped;
            }
            let Some(top) = self.stack.last_mut() else {
                return RunOutcome::Exhausted;
            };

            let Some(handle) = top.successors.next() else {
                if let Some(outcome) = self.pop(policy) {
                    return outcome;
                }
                continue;
            };
            self.stats.transitions += 1;
            let Some(state) = self.cube.share(handle) else {
                continue;
            };
            if policy.bound.is_some_and(|bound| pushed >= bound) {
                self.cube.release(handle);
                trace!("Thread {} reached the bound of its run.", self.tid);
                self.unwind(policy);
                return RunOutcome::BoundReached;
            }
            match self.push(state.clone(), policy.open) {
                Push::Accepted(colors) => {
                    pushed += 1;
                    self.open_frame(state, colors, handle, policy);
                }
                Push::Closed => {
                    self.cube.release(handle);
                }
                Push::OnStack => {
                    self.cube.release(handle);
                    if let Some(top) = self.stack.last_mut() {
                        top.complete = false;
                    }
                }
                Push::Deadlock => {
                    self.cube.release(handle);
                    if policy.deadlocks == DeadlockCheck::Off {
                        continue;
                    }
                    self.unwind(policy);
                    return self.observe_deadlock();
                }
            }
        }
    }

    /// Put an accepted state on the stack.
    fn open_frame(&mut self, state: State, colors: Arc<ColorArray>, handle: PoolRef, policy: RunPolicy) {
        if policy.open == Color::Phase1 {
            self.sampled.push(colors.clone());
            if self.cube.manager_mut().clone_ref(handle) {
                self.samples.push(handle);
            }
        }
        self.cube.release(handle);
        let successors = self.cube.succ(&state);
        self.stack.push(Frame {
            colors,
            successors,
            transitions: self.stats.transitions,
            complete: true,
        });
        self.stats.max_dfs = self.stats.max_dfs.max(self.stack.len());
    }

    /// Pop the top of the stack. Returns an outcome if the run has to end.
    fn pop(&mut self, policy: RunPolicy) -> Option<RunOutcome> {
        let top = self.stack.last_mut()?;
        let deadlock = policy.deadlocks != DeadlockCheck::Off
            && self.stats.transitions == top.transitions;
        if deadlock {
            match policy.deadlocks {
                DeadlockCheck::Confirmed => return Some(self.confirm_deadlock()),
                DeadlockCheck::Candidate => {
                    self.stats.candidate_deadlocks += 1;
                    trace!("Thread {} found a candidate deadlock.", self.tid);
                    top.complete = false;
                }
                DeadlockCheck::Off => {}
            }
        }

        let frame = self.stack.pop()?;
        match policy.open {
            // Sampled states stay tagged until the end of the sampling run.
            Color::Phase1 => {}
            Color::Open => self.close(&frame.colors),
            _ => {
                if frame.complete {
                    self.close(&frame.colors);
                } else {
                    frame.colors.set(self.tid, Color::Unknown);
                    if let Some(parent) = self.stack.last_mut() {
                        parent.complete = false;
                    }
                }
            }
        }
        self.cube.recycle(frame.successors);
        None
    }

    /// The state on top of the stack has no successor: publish the deadlock.
    fn confirm_deadlock(&mut self) -> RunOutcome {
        self.stats.deadlocks_detected += 1;
        self.stats.has_deadlock = true;
        info!(
            "Thread {} found a deadlock at depth {}.",
            self.tid,
            self.stack.len()
        );
        self.shared.deadlock_found.store(true, Ordering::SeqCst);
        self.shared.request_stop();
        for frame in &self.stack {
            frame.colors.set(self.tid, Color::ClosedDeadlock);
        }
        for frame in std::mem::take(&mut self.stack) {
            self.cube.recycle(frame.successors);
        }
        RunOutcome::Deadlock
    }

    fn observe_deadlock(&mut self) -> RunOutcome {
        trace!("Thread {} reached a state marked by a deadlock.", self.tid);
        if self.mode.detects_deadlocks() {
            self.stats.has_deadlock = true;
        }
        RunOutcome::Deadlock
    }

    /// Abandon the current run. Open states return to [`Color::Unknown`], except sampled
    /// ones, which are reset when the sampling run ends.
    fn unwind(&mut self, policy: RunPolicy) {
        for frame in std::mem::take(&mut self.stack).into_iter().rev() {
            if policy.open != Color::Phase1 && frame.colors.get(self.tid) == policy.open {
                frame.colors.set(self.tid, Color::Unknown);
            }
            self.cube.recycle(frame.successors);
        }
    }
}
