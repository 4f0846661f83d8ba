use std::sync::atomic::{self, AtomicI64};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::pal::{Platform, PlatformFacade};

/// How often the background sampler republishes the current time.
pub(crate) const SAMPLE_PERIOD: Duration = Duration::from_millis(1);

const ERR_POISONED_LOCK: &str = "clock domain lock poisoned - a sampler or caller panicked";

/// Which time source a benchmark is measured against.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub(crate) enum TimeDomain {
    /// Monotonic wall-clock time. Requested by workloads that block or that are measured in
    /// elapsed time regardless of how many threads take part.
    RealTime,

    /// Processor time consumed by the whole process, summed over all threads.
    #[default]
    CpuTime,
}

/// A clock that answers "has time T passed yet?" without asking the operating system.
///
/// A background thread samples the configured time source every [`SAMPLE_PERIOD`] and publishes
/// the sample in an atomic. [`has_reached()`][Self::has_reached] only compares against that
/// published sample, so it may lag the true time by up to one sampling period. Interval lengths
/// are tens of milliseconds or more, so that resolution floor is acceptable, while a real clock
/// read on every benchmark iteration would dominate the cost of cheap workloads.
///
/// [`now_micros()`][Self::now_micros] is a fresh read and is meant for the rare occasions when a
/// deadline is set.
///
/// The sampler is stopped and joined when the clock is dropped.
#[derive(Debug)]
pub(crate) struct FastClock {
    state: Arc<ClockState>,

    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    sampler: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct ClockState {
    platform: PlatformFacade,

    // Sampling and republishing happen under this lock so a sample taken in the old domain can
    // never be published after a domain switch.
    domain: Mutex<TimeDomain>,

    approx_micros: AtomicI64,
}

impl FastClock {
    pub(crate) fn new(domain: TimeDomain) -> Self {
        Self::with_platform(domain, PlatformFacade::real())
    }

    pub(crate) fn with_platform(domain: TimeDomain, platform: PlatformFacade) -> Self {
        let approx_micros = AtomicI64::new(micros_in(domain, &platform));

        let state = Arc::new(ClockState {
            platform,
            domain: Mutex::new(domain),
            approx_micros,
        });

        let (stop_tx, stop_rx) = oneshot::channel();

        let sampler = thread::Builder::new()
            .name("loop_bench-clock".to_string())
            .spawn({
                let state = Arc::clone(&state);
                move || sampler_entrypoint(&state, &stop_rx)
            })
            .expect("the clock cannot operate without its sampler thread");

        Self {
            state,
            stop_tx: Mutex::new(Some(stop_tx)),
            sampler: Some(sampler),
        }
    }

    /// Reads the current time of the active domain, in microseconds since the platform epoch.
    pub(crate) fn now_micros(&self) -> i64 {
        let domain = *self.state.domain.lock().expect(ERR_POISONED_LOCK);
        micros_in(domain, &self.state.platform)
    }

    /// Whether the last published sample is at or beyond `deadline_micros`.
    #[inline]
    pub(crate) fn has_reached(&self, deadline_micros: i64) -> bool {
        self.state.approx_micros.load(atomic::Ordering::Relaxed) >= deadline_micros
    }

    /// Switches the time domain and publishes a fresh sample from the new domain.
    pub(crate) fn init_type(&self, domain: TimeDomain) {
        let mut active = self.state.domain.lock().expect(ERR_POISONED_LOCK);
        *active = domain;

        self.state
            .approx_micros
            .store(micros_in(domain, &self.state.platform), atomic::Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn domain(&self) -> TimeDomain {
        *self.state.domain.lock().expect(ERR_POISONED_LOCK)
    }

    /// The platform the clock samples, for callers that need fresh reads of the other clocks.
    pub(crate) fn platform(&self) -> &PlatformFacade {
        &self.state.platform
    }

    /// Publishes a fresh sample immediately instead of waiting for the sampler.
    #[cfg(test)]
    pub(crate) fn sample_now(&self) {
        self.state.sample();
    }
}

impl Drop for FastClock {
    #[cfg_attr(test, mutants::skip)] // Impractical to test that stuff stops happening.
    fn drop(&mut self) {
        if let Some(stop_tx) = self
            .stop_tx
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
        {
            // The sampler only exits early if it panicked, which the join below surfaces.
            drop(stop_tx.send(()));
        }

        let Some(sampler) = self.sampler.take() else {
            return;
        };

        if sampler.join().is_err() && !thread::panicking() {
            panic!("clock sampler thread panicked");
        }
    }
}

impl ClockState {
    fn sample(&self) {
        let domain = self.domain.lock().expect(ERR_POISONED_LOCK);

        self.approx_micros
            .store(micros_in(*domain, &self.platform), atomic::Ordering::Relaxed);
    }
}

#[cfg_attr(test, mutants::skip)] // Real sleeping loop, outcome only observable via timing.
fn sampler_entrypoint(state: &ClockState, stop_rx: &oneshot::Receiver<()>) {
    loop {
        match stop_rx.recv_timeout(SAMPLE_PERIOD) {
            Err(oneshot::RecvTimeoutError::Timeout) => state.sample(),
            Ok(()) | Err(oneshot::RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn micros_in(domain: TimeDomain, platform: &impl Platform) -> i64 {
    let elapsed = match domain {
        TimeDomain::RealTime => platform.wall_time(),
        TimeDomain::CpuTime => platform.process_time(),
    };

    i64::try_from(elapsed.as_micros())
        .expect("a clock running for more than 292 thousand years is unrealistic")
}
