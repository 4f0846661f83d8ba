use std::time::Duration;

/// What a [`MeasurementRecord`] describes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum RecordKind {
    /// One repetition measured by one thread.
    Repetition {
        /// Index of the thread that measured the repetition, starting from 0.
        thread_index: usize,
    },

    /// Mean over all repetitions of a benchmark instance.
    Mean,

    /// Population standard deviation over all repetitions of a benchmark instance.
    StdDev,
}

/// The measured outcome of one repetition, or a summary over several of them.
///
/// Times are accumulated over all iterations of the record. For summary records the stored times
/// are the per-iteration statistic multiplied by the iteration total, so the per-iteration
/// accessors return the mean or standard deviation directly.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementRecord {
    name: String,
    kind: RecordKind,
    iterations: u64,
    real_time: Duration,
    cpu_time: Duration,
    bytes_per_second: f64,
    items_per_second: f64,
    peak_memory_bytes: Option<f64>,
    label: Option<String>,
}

impl MeasurementRecord {
    pub(crate) fn repetition(
        name: &str,
        thread_index: usize,
        iterations: u64,
        real_time: Duration,
        cpu_time: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: RecordKind::Repetition { thread_index },
            iterations,
            real_time,
            cpu_time,
            bytes_per_second: 0.0,
            items_per_second: 0.0,
            peak_memory_bytes: None,
            label: None,
        }
    }

    #[expect(
        clippy::too_many_arguments,
        reason = "summary records are built in exactly one place, with every field known"
    )]
    pub(crate) fn summary(
        name: String,
        kind: RecordKind,
        iterations: u64,
        real_time: Duration,
        cpu_time: Duration,
        bytes_per_second: f64,
        items_per_second: f64,
        peak_memory_bytes: Option<f64>,
        label: Option<String>,
    ) -> Self {
        Self {
            name,
            kind,
            iterations,
            real_time,
            cpu_time,
            bytes_per_second,
            items_per_second,
            peak_memory_bytes,
            label,
        }
    }

    /// Name of the benchmark instance, with a `_mean` or `_stddev` suffix for summary records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a single repetition or a summary.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Index of the measuring thread, or `None` for summary records.
    #[must_use]
    pub fn thread_index(&self) -> Option<usize> {
        match self.kind {
            RecordKind::Repetition { thread_index } => Some(thread_index),
            RecordKind::Mean | RecordKind::StdDev => None,
        }
    }

    /// Number of timed iterations in the record.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Wall-clock time accumulated over all iterations, excluding paused time.
    #[must_use]
    pub fn real_time(&self) -> Duration {
        self.real_time
    }

    /// Processor time accumulated by the measuring thread over all iterations.
    #[must_use]
    pub fn cpu_time(&self) -> Duration {
        self.cpu_time
    }

    /// Mean wall-clock seconds per iteration.
    #[must_use]
    pub fn real_seconds_per_iteration(&self) -> f64 {
        per_iteration(self.real_time, self.iterations)
    }

    /// Mean processor seconds per iteration.
    #[must_use]
    pub fn cpu_seconds_per_iteration(&self) -> f64 {
        per_iteration(self.cpu_time, self.iterations)
    }

    /// Bytes processed per second, as reported by the workload. Zero if the workload did not
    /// report any.
    #[must_use]
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_per_second
    }

    /// Items processed per second, as reported by the workload. Zero if the workload did not
    /// report any.
    #[must_use]
    pub fn items_per_second(&self) -> f64 {
        self.items_per_second
    }

    /// Peak memory in bytes, if memory usage reporting was enabled.
    #[must_use]
    pub fn peak_memory_bytes(&self) -> Option<f64> {
        self.peak_memory_bytes
    }

    /// The label set by the workload, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Overwrites the accumulated times and iteration count with a longer measurement of the
    /// same repetition.
    pub(crate) fn extend_to(&mut self, iterations: u64, real_time: Duration, cpu_time: Duration) {
        self.iterations = iterations;
        self.real_time = real_time;
        self.cpu_time = cpu_time;
    }

    /// Fills in the values that are only known after every thread has finished.
    pub(crate) fn complete(
        &mut self,
        stats: ThreadStats,
        use_real_time: bool,
        label: Option<&str>,
        peak_memory_bytes: Option<f64>,
    ) {
        let seconds = if use_real_time {
            self.real_time.as_secs_f64()
        } else {
            self.cpu_time.as_secs_f64()
        };

        self.bytes_per_second = per_second(stats.bytes_processed, seconds);
        self.items_per_second = per_second(stats.items_processed, seconds);
        self.label = label.map(str::to_string);
        self.peak_memory_bytes = peak_memory_bytes;
    }
}

/// Counters a workload reports about the work it did, summed over all threads of a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct ThreadStats {
    pub(crate) bytes_processed: u64,
    pub(crate) items_processed: u64,
}

impl ThreadStats {
    pub(crate) fn add(&mut self, other: Self) {
        self.bytes_processed = self.bytes_processed.saturating_add(other.bytes_processed);
        self.items_processed = self.items_processed.saturating_add(other.items_processed);
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "statistics are reported as floating point, precision loss beyond 2^52 is acceptable"
)]
fn per_iteration(total: Duration, iterations: u64) -> f64 {
    if iterations == 0 {
        return 0.0;
    }

    total.as_secs_f64() / iterations as f64
}

#[expect(
    clippy::cast_precision_loss,
    reason = "statistics are reported as floating point, precision loss beyond 2^52 is acceptable"
)]
fn per_second(amount: u64, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        return 0.0;
    }

    amount as f64 / seconds
}
