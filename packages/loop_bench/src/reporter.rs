use crate::{MeasurementRecord, Summary};

/// Receives the results of a benchmark run.
///
/// [`report_context()`](Self::report_context) is called once before any benchmark executes.
/// [`report_runs()`](Self::report_runs) is then called once per executed instance, in execution
/// order.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter {
    /// Describes the environment the benchmarks run in.
    ///
    /// Returning `false` cancels the run: no benchmark is executed and nothing else is reported.
    fn report_context(&mut self, context: &Context) -> bool;

    /// Delivers the results of one benchmark instance.
    fn report_runs(&mut self, report: &InstanceReport);
}

/// The environment a set of benchmarks runs in.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    cpu_count: usize,
    mhz_per_cpu: Option<f64>,
    cpu_scaling_enabled: bool,
    name_field_width: usize,
}

impl Context {
    pub(crate) fn new(
        cpu_count: usize,
        mhz_per_cpu: Option<f64>,
        cpu_scaling_enabled: bool,
        name_field_width: usize,
    ) -> Self {
        Self {
            cpu_count,
            mhz_per_cpu,
            cpu_scaling_enabled,
            name_field_width,
        }
    }

    /// Number of logical processors available to the process.
    #[must_use]
    pub fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// Nominal processor clock speed, if the operating system reports one.
    #[must_use]
    pub fn mhz_per_cpu(&self) -> Option<f64> {
        self.mhz_per_cpu
    }

    /// Whether processor frequency scaling is active, which makes timings noisy.
    #[must_use]
    pub fn cpu_scaling_enabled(&self) -> bool {
        self.cpu_scaling_enabled
    }

    /// Column width that fits the name of every record that will be reported, summary
    /// records included.
    #[must_use]
    pub fn name_field_width(&self) -> usize {
        self.name_field_width
    }
}

/// Results of executing one benchmark instance.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceReport {
    runs: Vec<MeasurementRecord>,
    summary: Option<Summary>,
}

impl InstanceReport {
    pub(crate) fn new(runs: Vec<MeasurementRecord>) -> Self {
        let summary = Summary::from_records(&runs);

        Self { runs, summary }
    }

    /// One record per repetition per thread, in the order they were completed.
    #[must_use]
    pub fn runs(&self) -> &[MeasurementRecord] {
        &self.runs
    }

    /// Mean and standard deviation, present when there are at least two runs.
    #[must_use]
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }
}
