use std::num::NonZero;
use std::time::Duration;

use new_zealand::nz;

use crate::{Error, Result};

/// Intervals are never doubled beyond this length, even if they keep turning out too short.
pub(crate) const MAX_INTERVAL_MICROS: i64 = 5_000_000;

/// Thresholds that decide how long each benchmark instance runs.
///
/// Every repetition of a benchmark is measured over one or more intervals. The first interval of
/// each repetition lasts `min_time / repetitions`; an interval that completes fewer than
/// `min_iterations / repetitions` iterations is discarded and retried at twice the length.
/// Repetitions continue until at least `min_iterations` iterations have been measured and the
/// requested number of repetitions has been recorded, or until `max_iterations` is exceeded.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use loop_bench::Config;
/// use new_zealand::nz;
///
/// let config = Config::builder()
///     .min_time(Duration::from_millis(100))
///     .repetitions(nz!(3))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.repetitions().get(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    min_iterations: u64,
    max_iterations: u64,
    min_time: Duration,
    repetitions: NonZero<u32>,
    report_peak_memory: bool,
}

impl Config {
    /// Starts configuring a benchmark run, with every option at its default value.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Self::default(),
        }
    }

    /// Minimum number of iterations measured across all repetitions of a benchmark.
    #[must_use]
    pub fn min_iterations(&self) -> u64 {
        self.min_iterations
    }

    /// Iteration total beyond which no further repetitions are started.
    #[must_use]
    pub fn max_iterations(&self) -> u64 {
        self.max_iterations
    }

    /// Minimum measured time, split evenly between repetitions.
    #[must_use]
    pub fn min_time(&self) -> Duration {
        self.min_time
    }

    /// How many repetitions of every benchmark to record.
    #[must_use]
    pub fn repetitions(&self) -> NonZero<u32> {
        self.repetitions
    }

    /// Whether peak memory usage is reported alongside timings.
    #[must_use]
    pub fn report_peak_memory(&self) -> bool {
        self.report_peak_memory
    }

    /// Length of the first interval of each repetition.
    pub(crate) fn interval_micros(&self) -> i64 {
        let per_repetition = self
            .min_time
            .checked_div(self.repetitions.get())
            .expect("repetitions is NonZero, so division by zero is impossible");

        // Validated at build time to be at least one microsecond in total; a short per-repetition
        // share is rounded up so that doubling always makes progress.
        i64::try_from(per_repetition.as_micros())
            .unwrap_or(MAX_INTERVAL_MICROS)
            .max(1)
    }

    /// Iteration count below which an interval is considered too short to be meaningful.
    pub(crate) fn min_iterations_per_repetition(&self) -> u64 {
        self.min_iterations
            .checked_div(u64::from(self.repetitions.get()))
            .expect("repetitions is NonZero, so division by zero is impossible")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_iterations: 100,
            max_iterations: 1_000_000_000,
            min_time: Duration::from_millis(500),
            repetitions: nz!(1),
            report_peak_memory: false,
        }
    }
}

/// Configures a [`Config`] one option at a time. Obtained from [`Config::builder()`].
#[derive(Clone, Debug)]
#[must_use]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the minimum number of iterations measured across all repetitions. Defaults to 100.
    pub fn min_iterations(mut self, value: u64) -> Self {
        self.config.min_iterations = value;
        self
    }

    /// Sets the iteration total beyond which no further repetitions are started.
    /// Defaults to 1 000 000 000.
    pub fn max_iterations(mut self, value: u64) -> Self {
        self.config.max_iterations = value;
        self
    }

    /// Sets the minimum measured time, split evenly between repetitions. Defaults to 0.5 seconds.
    pub fn min_time(mut self, value: Duration) -> Self {
        self.config.min_time = value;
        self
    }

    /// Sets how many repetitions of every benchmark to record. Defaults to 1.
    ///
    /// With two or more repetitions, reporters also receive mean and standard deviation records.
    pub fn repetitions(mut self, value: NonZero<u32>) -> Self {
        self.config.repetitions = value;
        self
    }

    /// Enables reporting of peak memory usage. Defaults to off.
    ///
    /// Has no effect unless a [`MemoryTracker`](crate::MemoryTracker) is installed on the
    /// [`Runner`](crate::Runner).
    pub fn report_peak_memory(mut self, value: bool) -> Self {
        self.config.report_peak_memory = value;
        self
    }

    /// Validates the options and produces the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `min_time` is shorter than one microsecond or if
    /// `max_iterations` is below `min_iterations`.
    pub fn build(self) -> Result<Config> {
        if self.config.min_time < Duration::from_micros(1) {
            return Err(Error::InvalidConfig {
                option: "min_time",
                problem: format!(
                    "{:?} is shorter than the one microsecond clock resolution",
                    self.config.min_time
                ),
            });
        }

        if self.config.max_iterations < self.config.min_iterations {
            return Err(Error::InvalidConfig {
                option: "max_iterations",
                problem: format!(
                    "{} is below min_iterations ({})",
                    self.config.max_iterations, self.config.min_iterations
                ),
            });
        }

        Ok(self.config)
    }
}
