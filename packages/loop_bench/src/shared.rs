use std::sync::atomic::{self, AtomicBool, AtomicUsize};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use crate::record::{MeasurementRecord, ThreadStats};

const ERR_POISONED_LOCK: &str = "shared execution state lock poisoned - a benchmark thread panicked";

/// Memory shared by all threads executing one benchmark instance.
///
/// The barrier counters are atomics so that waiting threads can poll them without taking the
/// lock, but they are only ever modified while the lock is held.
#[derive(Debug)]
pub(crate) struct SharedState {
    threads: usize,

    starting: AtomicUsize,
    stopping: AtomicUsize,
    all_started: AtomicBool,

    // Set when a thread leaves the run without reaching the end, typically by panicking. Peers
    // waiting on a barrier give up instead of waiting forever.
    abandoned: AtomicBool,

    real_time_requested: AtomicBool,

    inner: Mutex<SharedInner>,
}

#[derive(Debug, Default)]
pub(crate) struct SharedInner {
    pub(crate) stats: ThreadStats,
    pub(crate) records: Vec<MeasurementRecord>,
    pub(crate) label: Option<String>,
}

/// Outcome of one thread arriving at the starting barrier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Arrival {
    /// Every other thread has already arrived. The caller must finalize the clock and then
    /// call [`SharedState::release_start()`].
    Last,

    /// The caller must wait for the remaining threads.
    Waiting,
}

impl SharedState {
    pub(crate) fn new(threads: usize) -> Self {
        assert!(threads > 0, "a benchmark run needs at least one thread");

        Self {
            threads,
            starting: AtomicUsize::new(0),
            stopping: AtomicUsize::new(0),
            all_started: AtomicBool::new(false),
            abandoned: AtomicBool::new(false),
            real_time_requested: AtomicBool::new(false),
            inner: Mutex::new(SharedInner::default()),
        }
    }

    pub(crate) fn threads(&self) -> usize {
        self.threads
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SharedInner> {
        self.inner.lock().expect(ERR_POISONED_LOCK)
    }

    pub(crate) fn arrive_starting(&self, _inner: &MutexGuard<'_, SharedInner>) -> Arrival {
        let previous = self.starting.load(atomic::Ordering::Relaxed);

        assert!(
            previous < self.threads,
            "more threads arrived at the starting barrier than take part in the run"
        );

        let starting = previous
            .checked_add(1)
            .expect("guarded by the assertion above");
        self.starting.store(starting, atomic::Ordering::Relaxed);

        if starting == self.threads {
            Arrival::Last
        } else {
            Arrival::Waiting
        }
    }

    /// Lets every thread waiting at the starting barrier through.
    pub(crate) fn release_start(&self) {
        self.all_started.store(true, atomic::Ordering::Release);
    }

    /// Spins until every thread has arrived at the starting barrier.
    ///
    /// Returns `false` if the run was abandoned while waiting.
    #[cfg_attr(test, mutants::skip)] // Mutations cause infinite loops.
    pub(crate) fn wait_for_start(&self) -> bool {
        loop {
            if self.all_started.load(atomic::Ordering::Acquire) {
                return true;
            }

            if self.is_abandoned() {
                return false;
            }

            thread::yield_now();
        }
    }

    /// Records that the calling thread has finished measuring.
    ///
    /// Returns `true` if other threads are still measuring.
    pub(crate) fn arrive_stopping(&self, _inner: &MutexGuard<'_, SharedInner>) -> bool {
        let previous = self.stopping.load(atomic::Ordering::Relaxed);

        assert!(
            previous < self.threads,
            "more threads arrived at the stopping barrier than take part in the run"
        );

        let stopping = previous
            .checked_add(1)
            .expect("guarded by the assertion above");
        self.stopping.store(stopping, atomic::Ordering::Release);

        stopping < self.threads && !self.is_abandoned()
    }

    /// Whether some thread is still measuring. Lock-free, so the answer may be slightly stale.
    pub(crate) fn others_running(&self) -> bool {
        self.stopping.load(atomic::Ordering::Acquire) < self.threads && !self.is_abandoned()
    }

    pub(crate) fn abandon(&self) {
        self.abandoned.store(true, atomic::Ordering::Release);
    }

    pub(crate) fn is_abandoned(&self) -> bool {
        self.abandoned.load(atomic::Ordering::Acquire)
    }

    pub(crate) fn request_real_time(&self) {
        self.real_time_requested
            .store(true, atomic::Ordering::Relaxed);
    }

    pub(crate) fn real_time_requested(&self) -> bool {
        self.real_time_requested.load(atomic::Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn starting_count(&self) -> usize {
        self.starting.load(atomic::Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn stopping_count(&self) -> usize {
        self.stopping.load(atomic::Ordering::Acquire)
    }

    /// Consumes the state after every thread has finished, yielding what they accumulated.
    pub(crate) fn into_inner(self) -> SharedInner {
        self.inner
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
