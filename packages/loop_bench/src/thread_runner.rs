use std::time::Duration;

use tracing::trace;

use crate::clock::{FastClock, TimeDomain};
use crate::config::MAX_INTERVAL_MICROS;
use crate::pal::Platform;
use crate::record::{MeasurementRecord, ThreadStats};
use crate::shared::{Arrival, SharedState};
use crate::{Config, Instance};

/// Lifecycle of one [`ThreadRunner`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RunnerState {
    Initial,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// What to do after an interval has been recorded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Decision {
    /// Record a new repetition, starting from zero.
    NewRepetition,

    /// Keep extending the current repetition, overwriting its record when the interval ends.
    Continue,

    Stop,
}

/// The handle a workload uses to drive its timed loop.
///
/// One runner exists per thread per benchmark instance execution. The workload calls
/// [`keep_running()`](Self::keep_running) before every iteration and exits its loop as soon as it
/// returns `false`:
///
/// ```
/// use loop_bench::Family;
///
/// let family = Family::new("sum", |runner| {
///     let mut total = 0_u64;
///
///     while runner.keep_running() {
///         total = total.wrapping_add(std::hint::black_box(7));
///     }
///
///     runner.set_items_processed(runner.iterations());
///     std::hint::black_box(total);
/// });
/// # drop(family);
/// ```
///
/// Time is measured in intervals. On the fast path, `keep_running()` only compares a sampled
/// timestamp against the end of the current interval and counts the iteration. Everything else
/// (synchronizing with other threads, deciding whether an interval was long enough, recording
/// results) happens on the slow path when an interval ends.
#[derive(Debug)]
pub struct ThreadRunner<'a> {
    // Fast path state first.
    clock: &'a FastClock,
    stop_at_micros: i64,
    paused_micros: i64,
    iterations: u64,
    state: RunnerState,

    shared: &'a SharedState,
    config: &'a Config,
    instance: &'a Instance,
    thread_index: usize,

    interval_micros: i64,
    interval_start_wall: Duration,
    interval_start_cpu: Duration,
    paused: Duration,
    pause_started: Option<Duration>,

    // Iterations of every repetition this thread has finished, not counting the current one.
    committed_iterations: u64,
    completed_repetitions: u32,

    // Position of the current repetition's record in the shared list, once it has one.
    record_slot: Option<usize>,

    stats: ThreadStats,
}

impl<'a> ThreadRunner<'a> {
    pub(crate) fn new(
        clock: &'a FastClock,
        shared: &'a SharedState,
        config: &'a Config,
        instance: &'a Instance,
        thread_index: usize,
    ) -> Self {
        Self {
            clock,
            stop_at_micros: 0,
            paused_micros: 0,
            iterations: 0,
            state: RunnerState::Initial,
            shared,
            config,
            instance,
            thread_index,
            interval_micros: config.interval_micros(),
            interval_start_wall: Duration::ZERO,
            interval_start_cpu: Duration::ZERO,
            paused: Duration::ZERO,
            pause_started: None,
            committed_iterations: 0,
            completed_repetitions: 0,
            record_slot: None,
            stats: ThreadStats::default(),
        }
    }

    /// Returns `true` if the workload should run another iteration.
    ///
    /// # Panics
    ///
    /// Panics if called again after it has returned `false`.
    #[inline]
    pub fn keep_running(&mut self) -> bool {
        if self.state == RunnerState::Running
            && !self
                .clock
                .has_reached(self.stop_at_micros.saturating_add(self.paused_micros))
        {
            self.iterations = self.iterations.wrapping_add(1);
            return true;
        }

        self.keep_running_slow()
    }

    #[cold]
    fn keep_running_slow(&mut self) -> bool {
        match self.state {
            RunnerState::Initial => self.start_running(),
            RunnerState::Running => self.finish_interval(),
            RunnerState::Stopping => self.maybe_stop(),
            RunnerState::Starting => {
                panic!("keep_running() called while the runner is at the starting barrier")
            }
            RunnerState::Stopped => {
                panic!("keep_running() called again after it returned false")
            }
        }
    }

    /// Measures this benchmark in wall-clock time instead of processor time.
    ///
    /// Intended for workloads that block or that spread work over threads they do not own. Must
    /// be called before the first [`keep_running()`](Self::keep_running). If any thread of a run
    /// requests real time, the whole run uses it.
    ///
    /// # Panics
    ///
    /// Panics if measurement has already started.
    pub fn use_real_time(&mut self) {
        assert_eq!(
            self.state,
            RunnerState::Initial,
            "use_real_time() must be called before the first keep_running()"
        );

        self.shared.request_real_time();
    }

    /// Stops the clock until [`resume_timing()`](Self::resume_timing), for example to perform
    /// per-iteration setup that should not be measured.
    ///
    /// Paused time is measured in wall-clock time and extends the current interval. Timing may
    /// stay paused across [`keep_running()`](Self::keep_running), in which case the pause carries
    /// on into whatever interval comes next.
    ///
    /// # Panics
    ///
    /// Panics if timing is already paused.
    pub fn pause_timing(&mut self) {
        assert!(
            self.pause_started.is_none(),
            "pause_timing() called while timing was already paused"
        );

        self.pause_started = Some(self.clock.platform().wall_time());
    }

    /// Restarts the clock after [`pause_timing()`](Self::pause_timing).
    ///
    /// # Panics
    ///
    /// Panics if timing is not paused.
    pub fn resume_timing(&mut self) {
        let started = self
            .pause_started
            .take()
            .expect("resume_timing() called without a matching pause_timing()");

        let pause = self.clock.platform().wall_time().saturating_sub(started);

        self.paused = self.paused.saturating_add(pause);
        self.paused_micros = duration_as_micros(self.paused);
    }

    /// Reports how many bytes this thread processed, for throughput reporting.
    ///
    /// # Panics
    ///
    /// Panics unless [`keep_running()`](Self::keep_running) has already returned `false`.
    pub fn set_bytes_processed(&mut self, bytes: u64) {
        self.assert_stopped("set_bytes_processed()");
        self.stats.bytes_processed = bytes;
    }

    /// Reports how many items this thread processed, for throughput reporting.
    ///
    /// # Panics
    ///
    /// Panics unless [`keep_running()`](Self::keep_running) has already returned `false`.
    pub fn set_items_processed(&mut self, items: u64) {
        self.assert_stopped("set_items_processed()");
        self.stats.items_processed = items;
    }

    /// Attaches a label to every result of this run. The last label set by any thread wins.
    ///
    /// # Panics
    ///
    /// Panics unless [`keep_running()`](Self::keep_running) has already returned `false`.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.assert_stopped("set_label()");
        self.shared.lock().label = Some(label.into());
    }

    /// The X argument of the benchmark instance.
    ///
    /// # Panics
    ///
    /// Panics if the benchmark was registered without X arguments.
    #[must_use]
    pub fn range_x(&self) -> i64 {
        self.instance
            .x()
            .expect("range_x() read by a benchmark registered without X arguments")
    }

    /// The Y argument of the benchmark instance.
    ///
    /// # Panics
    ///
    /// Panics if the benchmark was registered without Y arguments.
    #[must_use]
    pub fn range_y(&self) -> i64 {
        self.instance
            .y()
            .expect("range_y() read by a benchmark registered without Y arguments")
    }

    /// Index of this thread among the threads of the run, starting from 0.
    #[must_use]
    pub fn thread_index(&self) -> usize {
        self.thread_index
    }

    /// Number of threads taking part in the run.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.shared.threads()
    }

    /// Iterations counted so far by this thread, over every repetition it recorded.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.committed_iterations.saturating_add(self.iterations)
    }

    /// Hands the thread's counters over to the shared state. Called once the workload returns.
    pub(crate) fn finish(self) {
        assert_eq!(
            self.state,
            RunnerState::Stopped,
            "the workload of '{}' returned before keep_running() returned false",
            self.instance.name()
        );

        self.shared.lock().stats.add(self.stats);
    }

    fn assert_stopped(&self, operation: &str) {
        assert_eq!(
            self.state,
            RunnerState::Stopped,
            "{operation} is only valid after keep_running() has returned false"
        );
    }

    fn start_running(&mut self) -> bool {
        self.state = RunnerState::Starting;

        let arrival = {
            let inner = self.shared.lock();
            self.shared.arrive_starting(&inner)
        };

        if arrival == Arrival::Last {
            let domain = if self.shared.real_time_requested() {
                TimeDomain::RealTime
            } else {
                TimeDomain::CpuTime
            };

            self.clock.init_type(domain);
            self.shared.release_start();
        }

        if !self.shared.wait_for_start() {
            self.state = RunnerState::Stopped;
            return false;
        }

        self.state = RunnerState::Running;
        self.new_interval();

        true
    }

    fn finish_interval(&mut self) -> bool {
        if self.record_slot.is_none()
            && self.iterations < self.config.min_iterations_per_repetition()
            && self.interval_micros < MAX_INTERVAL_MICROS
        {
            self.interval_micros = self.interval_micros.saturating_mul(2);

            trace!(
                thread_index = self.thread_index,
                iterations = self.iterations,
                interval_micros = self.interval_micros,
                "interval too short, retrying with a longer one"
            );

            self.new_interval();
            return true;
        }

        let platform = self.clock.platform();
        let now_wall = platform.wall_time();
        let elapsed = now_wall.saturating_sub(self.interval_start_wall);
        let cpu_time = platform
            .thread_time()
            .saturating_sub(self.interval_start_cpu);

        // A pause left open across keep_running() counts up to here and carries on afterwards.
        if let Some(started) = self.pause_started {
            self.paused = self.paused.saturating_add(now_wall.saturating_sub(started));
            self.paused_micros = duration_as_micros(self.paused);
            self.pause_started = Some(now_wall);
        }

        assert!(
            self.paused < elapsed,
            "paused time {:?} is not less than the elapsed interval time {elapsed:?}",
            self.paused
        );

        let real_time = elapsed.saturating_sub(self.paused);

        let decision = {
            let mut inner = self.shared.lock();

            if let Some(slot) = self.record_slot {
                inner
                    .records
                    .get_mut(slot)
                    .expect("a record slot always points to a record pushed by this thread")
                    .extend_to(self.iterations, real_time, cpu_time);
            } else {
                self.record_slot = Some(inner.records.len());
                inner.records.push(MeasurementRecord::repetition(
                    self.instance.name(),
                    self.thread_index,
                    self.iterations,
                    real_time,
                    cpu_time,
                ));
                self.completed_repetitions = self.completed_repetitions.saturating_add(1);
            }

            let decision = self.decide();

            if decision == Decision::Stop {
                self.state = if self.shared.arrive_stopping(&inner) {
                    RunnerState::Stopping
                } else {
                    RunnerState::Stopped
                };
            }

            decision
        };

        trace!(
            thread_index = self.thread_index,
            iterations = self.iterations,
            interval_micros = self.interval_micros,
            ?decision,
            "interval recorded"
        );

        match decision {
            Decision::NewRepetition => {
                self.committed_iterations = self.iterations();
                self.record_slot = None;
                self.new_interval();
                true
            }
            Decision::Continue => {
                self.continue_interval();
                true
            }
            Decision::Stop => {
                self.committed_iterations = self.iterations();
                self.iterations = 0;
                self.state == RunnerState::Stopping
            }
        }
    }

    fn decide(&self) -> Decision {
        let total = self.iterations();
        let repetitions = self.config.repetitions().get();

        if total < self.config.min_iterations() {
            if self.completed_repetitions < repetitions {
                Decision::NewRepetition
            } else {
                Decision::Continue
            }
        } else if total > self.config.max_iterations()
            || self.completed_repetitions >= repetitions
        {
            Decision::Stop
        } else {
            Decision::NewRepetition
        }
    }

    fn maybe_stop(&mut self) -> bool {
        if self.shared.others_running() {
            return true;
        }

        trace!(thread_index = self.thread_index, "every thread has stopped");

        self.state = RunnerState::Stopped;
        false
    }

    fn new_interval(&mut self) {
        let platform = self.clock.platform();

        // The iteration about to run is the first one timed in the new interval.
        self.iterations = 1;
        self.paused = Duration::ZERO;
        self.paused_micros = 0;
        self.interval_start_wall = platform.wall_time();
        self.interval_start_cpu = platform.thread_time();

        if self.pause_started.is_some() {
            self.pause_started = Some(self.interval_start_wall);
        }

        self.stop_at_micros = self.clock.now_micros().saturating_add(self.interval_micros);
    }

    fn continue_interval(&mut self) {
        self.iterations = self.iterations.wrapping_add(1);
        self.stop_at_micros = self.clock.now_micros().saturating_add(self.interval_micros);
    }
}

impl Drop for ThreadRunner<'_> {
    fn drop(&mut self) {
        if self.state != RunnerState::Stopped {
            // Peers must not wait for a thread that will never arrive.
            self.shared.abandon();
        }
    }
}

fn duration_as_micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}
