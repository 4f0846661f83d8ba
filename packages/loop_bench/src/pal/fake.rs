use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::pal::abstractions::Platform;

#[derive(Debug, Default)]
struct FakeClocks {
    wall: Duration,
    process: Duration,
    thread: Duration,
}

/// Platform whose clocks only move when a test says so.
///
/// Clones share the same clocks, so a test can keep one handle and hand another to the code
/// under test.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakePlatform {
    clocks: Arc<Mutex<FakeClocks>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Moves every clock forward, as if the current thread were busy for `elapsed`.
    pub(crate) fn advance(&self, elapsed: Duration) {
        let mut clocks = self.clocks.lock().expect("fake clocks lock should not be poisoned");

        clocks.wall = clocks.wall.saturating_add(elapsed);
        clocks.process = clocks.process.saturating_add(elapsed);
        clocks.thread = clocks.thread.saturating_add(elapsed);
    }

    /// Moves only the processor clocks forward, as if time had been spent while the wall clock
    /// was not looking. Only useful for provoking inconsistencies between the clocks.
    pub(crate) fn advance_cpu(&self, elapsed: Duration) {
        let mut clocks = self.clocks.lock().expect("fake clocks lock should not be poisoned");

        clocks.process = clocks.process.saturating_add(elapsed);
        clocks.thread = clocks.thread.saturating_add(elapsed);
    }

    /// Moves only the wall clock forward, as if the current thread were blocked for `elapsed`.
    pub(crate) fn advance_wall(&self, elapsed: Duration) {
        let mut clocks = self.clocks.lock().expect("fake clocks lock should not be poisoned");

        clocks.wall = clocks.wall.saturating_add(elapsed);
    }
}

impl Platform for FakePlatform {
    fn wall_time(&self) -> Duration {
        self.clocks
            .lock()
            .expect("fake clocks lock should not be poisoned")
            .wall
    }

    fn process_time(&self) -> Duration {
        self.clocks
            .lock()
            .expect("fake clocks lock should not be poisoned")
            .process
    }

    fn thread_time(&self) -> Duration {
        self.clocks
            .lock()
            .expect("fake clocks lock should not be poisoned")
            .thread
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let platform = FakePlatform::new();

        assert_eq!(platform.wall_time(), Duration::ZERO);
        assert_eq!(platform.process_time(), Duration::ZERO);
        assert_eq!(platform.thread_time(), Duration::ZERO);
    }

    #[test]
    fn advance_wall_leaves_processor_time_alone() {
        let platform = FakePlatform::new();

        platform.advance(Duration::from_millis(10));
        platform.advance_wall(Duration::from_millis(5));

        assert_eq!(platform.wall_time(), Duration::from_millis(15));
        assert_eq!(platform.process_time(), Duration::from_millis(10));
        assert_eq!(platform.thread_time(), Duration::from_millis(10));
    }

    #[test]
    fn clones_share_clocks() {
        let first = FakePlatform::new();
        let second = first.clone();

        first.advance(Duration::from_millis(100));

        assert_eq!(second.wall_time(), Duration::from_millis(100));
    }
}
