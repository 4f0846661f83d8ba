use std::num::NonZero;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::clock::{FastClock, TimeDomain};
use crate::shared::SharedState;
use crate::system::HostSystem;
use crate::{
    Config, Context, Family, Filter, Instance, InstanceReport, MemoryTracker, Registry,
    Reporter, SystemInfo, ThreadRunner,
};

/// Names never get narrower than this in text output.
const MIN_NAME_FIELD_WIDTH: usize = 10;

/// Room for the `_stddev` suffix of summary records.
const SUMMARY_SUFFIX_WIDTH: usize = 7;

/// Room for `/threads:N` growth of multithreaded instance names.
const THREADS_SUFFIX_WIDTH: usize = 10;

/// Room for both of the above.
const THREADS_AND_SUMMARY_SUFFIX_WIDTH: usize = 17;

/// Executes benchmark instances and hands their results to a [`Reporter`].
///
/// Every instance gets a fresh clock and fresh shared state. Each of its threads invokes the
/// workload once, after which the records of all threads are completed with throughput, label
/// and peak memory values and summarized.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use loop_bench::{Config, Family, Filter, Registry, Runner, TextReporter};
///
/// let registry = Registry::new();
/// registry.register(Family::new("spin", |runner| {
///     while runner.keep_running() {
///         std::hint::black_box(1 + 1);
///     }
/// }));
///
/// let config = Config::builder()
///     .min_time(Duration::from_millis(10))
///     .build()
///     .unwrap();
///
/// let mut reporter = TextReporter::new(Vec::new());
/// let executed = Runner::new(config).run_matching(&registry, &Filter::everything(), &mut reporter);
///
/// assert_eq!(executed, 1);
/// ```
#[derive(derive_more::Debug)]
pub struct Runner {
    config: Config,

    system: Box<dyn SystemInfo>,

    #[debug(ignore)]
    memory_tracker: Option<Box<dyn MemoryTracker>>,
}

impl Runner {
    /// A runner that inspects the host system and does not track memory.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            system: Box::new(HostSystem),
            memory_tracker: None,
        }
    }

    /// Replaces the source of hardware information reported in the run context.
    #[must_use]
    pub fn with_system(mut self, system: impl SystemInfo + 'static) -> Self {
        self.system = Box::new(system);
        self
    }

    /// Installs a memory tracker, used when [`Config::report_peak_memory()`] is enabled.
    #[must_use]
    pub fn with_memory_tracker(mut self, tracker: impl MemoryTracker + 'static) -> Self {
        self.memory_tracker = Some(Box::new(tracker));
        self
    }

    /// The configuration every instance is executed with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Executes every instance of every family in `registry` selected by `filter`.
    ///
    /// The reporter first receives the run context. If it declines, nothing is executed. With
    /// [`Filter::nothing()`] there is no run at all and even the context is not reported.
    /// Otherwise it receives the results of each instance as soon as that instance finishes.
    ///
    /// Returns the number of instances executed.
    pub fn run_matching(
        &self,
        registry: &Registry,
        filter: &Filter,
        reporter: &mut dyn Reporter,
    ) -> usize {
        if filter.is_nothing() {
            return 0;
        }

        let cpu_count = self.system.cpu_count();
        let instances = registry.instances(filter, cpu_count);

        let context = Context::new(
            cpu_count.get(),
            self.system.cpu_mhz(),
            self.system.cpu_scaling_enabled(),
            name_field_width(&instances, self.config.repetitions().get()),
        );

        if !reporter.report_context(&context) {
            debug!("reporter declined the run context, no benchmarks executed");
            return 0;
        }

        for instance in &instances {
            let report = self.run_instance(instance);
            reporter.report_runs(&report);
        }

        instances.len()
    }

    /// Names of the instances [`run_matching()`](Self::run_matching) would execute, in execution
    /// order.
    #[must_use]
    pub fn matching_names(&self, registry: &Registry, filter: &Filter) -> Vec<String> {
        registry
            .instances(filter, self.system.cpu_count())
            .iter()
            .map(|instance| instance.name().to_string())
            .collect()
    }

    /// Executes one instance on as many threads as it asks for.
    #[must_use]
    pub fn run_instance(&self, instance: &Instance) -> InstanceReport {
        self.run_instance_on(instance, &FastClock::new(TimeDomain::CpuTime))
    }

    /// Measures the per-iteration cost of a workload that does nothing.
    ///
    /// The result is informational only. It is not subtracted from any measurement.
    #[must_use]
    pub fn measure_overhead(&self) -> Duration {
        let family = Arc::new(Family::new("overhead", |runner| {
            while runner.keep_running() {}
        }));
        let instance = Instance::single(&family, NonZero::<usize>::MIN);

        let clock = FastClock::new(TimeDomain::CpuTime);
        let shared = SharedState::new(1);
        self.execute(&instance, &clock, &shared);

        let overhead = shared
            .into_inner()
            .records
            .first()
            .map_or(Duration::ZERO, |record| {
                Duration::try_from_secs_f64(record.real_seconds_per_iteration())
                    .unwrap_or(Duration::ZERO)
            });

        debug!(?overhead, "per-iteration overhead of doing nothing");

        overhead
    }

    fn run_instance_on(&self, instance: &Instance, clock: &FastClock) -> InstanceReport {
        debug!(
            name = instance.name(),
            threads = instance.threads().get(),
            "executing benchmark instance"
        );

        let tracker = if self.config.report_peak_memory() {
            self.memory_tracker.as_deref()
        } else {
            None
        };

        let shared = SharedState::new(instance.threads().get());

        if let Some(tracker) = tracker {
            tracker.begin();
        }

        self.execute(instance, clock, &shared);

        #[expect(
            clippy::cast_precision_loss,
            reason = "memory usage is reported as floating point, precision beyond 2^52 is moot"
        )]
        let peak_memory_bytes = tracker.map(|tracker| tracker.end() as f64);

        let use_real_time = shared.real_time_requested();
        let inner = shared.into_inner();

        let mut runs = inner.records;
        for record in &mut runs {
            record.complete(
                inner.stats,
                use_real_time,
                inner.label.as_deref(),
                peak_memory_bytes,
            );
        }

        debug!(
            name = instance.name(),
            records = runs.len(),
            "benchmark instance finished"
        );

        InstanceReport::new(runs)
    }

    /// Runs the workload of `instance` once per thread and waits for all of them to return.
    fn execute(&self, instance: &Instance, clock: &FastClock, shared: &SharedState) {
        let threads = instance.threads().get();

        let run_thread = |thread_index: usize| {
            let mut runner = ThreadRunner::new(clock, shared, &self.config, instance, thread_index);
            (instance.family().workload())(&mut runner);
            runner.finish();
        };

        if threads == 1 {
            run_thread(0);
            return;
        }

        thread::scope(|s| {
            for thread_index in 0..threads {
                let run_thread = &run_thread;

                thread::Builder::new()
                    .name(format!("loop_bench-{thread_index}"))
                    .spawn_scoped(s, move || run_thread(thread_index))
                    .expect("benchmark threads are required to execute a multithreaded instance");
            }
        });
    }
}

/// Width of the name column that fits every record the instances will produce.
fn name_field_width(instances: &[Instance], repetitions: u32) -> usize {
    instances
        .iter()
        .map(|instance| {
            let suffix_width = match (instance.threads().get() > 1, repetitions > 1) {
                (true, true) => THREADS_AND_SUMMARY_SUFFIX_WIDTH,
                (true, false) => THREADS_SUFFIX_WIDTH,
                (false, true) => SUMMARY_SUFFIX_WIDTH,
                (false, false) => 0,
            };

            instance.name().len().saturating_add(suffix_width)
        })
        .fold(MIN_NAME_FIELD_WIDTH, usize::max)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;

    use new_zealand::nz;

    use super::*;
    use crate::MeasurementRecord;
    use crate::memory::MockMemoryTracker;
    use crate::pal::{FakePlatform, PlatformFacade};
    use crate::reporter::MockReporter;
    use crate::system::MockSystemInfo;

    fn fake_system(cpu_count: NonZero<usize>) -> MockSystemInfo {
        let mut system = MockSystemInfo::new();
        system.expect_cpu_count().return_const(cpu_count);
        system.expect_cpu_mhz().return_const(Some(3000.0));
        system.expect_cpu_scaling_enabled().return_const(false);
        system
    }

    fn quick_config() -> Config {
        Config::builder()
            .min_time(Duration::from_millis(5))
            .min_iterations(1)
            .build()
            .unwrap()
    }

    /// A workload that burns fake processor time, so that intervals end as soon as the clock's
    /// sampler catches up.
    fn fake_time_family(name: &str, platform: &FakePlatform) -> Family {
        let platform = platform.clone();

        Family::new(name, move |runner| {
            while runner.keep_running() {
                platform.advance(Duration::from_micros(10));
            }

            runner.set_bytes_processed(1_000);
            runner.set_label("fake");
        })
    }

    #[test]
    fn declined_context_runs_nothing() {
        let registry = Registry::new();
        registry.register(Family::new("never", |_| panic!("must not run")));

        let mut reporter = MockReporter::new();
        reporter
            .expect_report_context()
            .times(1)
            .return_const(false);
        reporter.expect_report_runs().never();

        let runner = Runner::new(quick_config()).with_system(fake_system(nz!(2)));

        assert_eq!(
            runner.run_matching(&registry, &Filter::everything(), &mut reporter),
            0
        );
    }

    #[test]
    fn empty_filter_skips_context() {
        let registry = Registry::new();

        let mut reporter = MockReporter::new();
        reporter.expect_report_context().never();

        let runner = Runner::new(quick_config()).with_system(fake_system(nz!(2)));

        assert_eq!(
            runner.run_matching(&registry, &Filter::nothing(), &mut reporter),
            0
        );
    }

    #[test]
    fn uncompilable_pattern_reports_context_and_runs_nothing() {
        let registry = Registry::new();
        registry.register(Family::new("never", |_| panic!("must not run")));

        let filter = Filter::from_pattern("(", |_| Err::<fn(&str) -> bool, _>("unbalanced"));

        let mut reporter = MockReporter::new();
        reporter
            .expect_report_context()
            .times(1)
            .return_const(true);
        reporter.expect_report_runs().never();

        let runner = Runner::new(quick_config()).with_system(fake_system(nz!(2)));

        assert_eq!(runner.run_matching(&registry, &filter, &mut reporter), 0);
    }

    #[test]
    fn context_describes_system_and_names() {
        let registry = Registry::new();
        registry.register(
            Family::new("a_rather_long_benchmark_name", |_| {}).threads(nz!(2)),
        );

        let mut reporter = MockReporter::new();
        reporter
            .expect_report_context()
            .withf(|context| {
                context.cpu_count() == 2
                    && context
                        .mhz_per_cpu()
                        .is_some_and(|mhz| (mhz - 3000.0).abs() < f64::EPSILON)
                    && !context.cpu_scaling_enabled()
                    // "a_rather_long_benchmark_name/threads:2" plus room for the thread suffix.
                    && context.name_field_width() == 38 + 10
            })
            .times(1)
            .return_const(false);

        let runner = Runner::new(quick_config()).with_system(fake_system(nz!(2)));

        runner.run_matching(&registry, &Filter::everything(), &mut reporter);
    }

    #[test]
    fn name_width_has_minimum_and_suffix_room() {
        let family = Arc::new(Family::new("ab", |_| {}));
        let single = Instance::single(&family, nz!(1));
        let pair = Instance::single(&family, nz!(2));

        assert_eq!(name_field_width(&[], 1), 10);
        assert_eq!(name_field_width(&[single.clone()], 3), 10);
        assert_eq!(name_field_width(&[pair.clone()], 1), 12);
        assert_eq!(name_field_width(&[single, pair], 2), 19);
    }

    #[test]
    fn records_are_completed_after_run() {
        let platform = FakePlatform::new();
        let family = Arc::new(fake_time_family("fake", &platform));
        let instance = Instance::single(&family, nz!(1));

        let config = Config::builder()
            .min_time(Duration::from_millis(3))
            .min_iterations(1)
            .repetitions(nz!(3))
            .report_peak_memory(true)
            .build()
            .unwrap();

        let mut tracker = MockMemoryTracker::new();
        tracker.expect_begin().times(1).return_const(());
        tracker.expect_end().times(1).return_const(2_048_u64);

        let runner = Runner::new(config).with_memory_tracker(tracker);
        let clock =
            FastClock::with_platform(TimeDomain::CpuTime, PlatformFacade::fake(platform.clone()));

        let report = runner.run_instance_on(&instance, &clock);

        assert_eq!(report.runs().len(), 3);

        for record in report.runs() {
            assert_eq!(record.name(), "fake");
            assert_eq!(record.label(), Some("fake"));
            assert_eq!(record.peak_memory_bytes(), Some(2_048.0));
            assert!(record.bytes_per_second() > 0.0);
        }

        let summary = report.summary().unwrap();
        assert_eq!(summary.mean().name(), "fake_mean");
        assert_eq!(summary.stddev().name(), "fake_stddev");
    }

    /// Runs a fresh single-threaded instance whose workload costs exactly 10 µs of fake time per
    /// iteration and publishes every step to the clock, so no sampler lag is involved.
    fn iterations_of_deterministic_run(config: &Config) -> Vec<u64> {
        let platform = FakePlatform::new();
        let clock = Arc::new(FastClock::with_platform(
            TimeDomain::CpuTime,
            PlatformFacade::fake(platform.clone()),
        ));

        let family = Arc::new(Family::new("deterministic", {
            let clock = Arc::clone(&clock);

            move |runner| {
                while runner.keep_running() {
                    platform.advance(Duration::from_micros(10));
                    clock.sample_now();
                }
            }
        }));
        let instance = Instance::single(&family, nz!(1));

        let report = Runner::new(config.clone()).run_instance_on(&instance, &clock);

        report.runs().iter().map(MeasurementRecord::iterations).collect()
    }

    #[test]
    fn repeated_runs_measure_the_same_iterations() {
        let config = Config::builder()
            .min_time(Duration::from_millis(4))
            .min_iterations(50)
            .repetitions(nz!(2))
            .build()
            .unwrap();

        let first = iterations_of_deterministic_run(&config);
        let second = iterations_of_deterministic_run(&config);

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn memory_is_not_tracked_unless_enabled() {
        let platform = FakePlatform::new();
        let family = Arc::new(fake_time_family("fake", &platform));
        let instance = Instance::single(&family, nz!(1));

        let mut tracker = MockMemoryTracker::new();
        tracker.expect_begin().never();
        tracker.expect_end().never();

        let runner = Runner::new(quick_config()).with_memory_tracker(tracker);
        let clock =
            FastClock::with_platform(TimeDomain::CpuTime, PlatformFacade::fake(platform.clone()));

        let report = runner.run_instance_on(&instance, &clock);

        assert_eq!(report.runs().len(), 1);
        assert!(report.summary().is_none());
        assert_eq!(report.runs().first().unwrap().peak_memory_bytes(), None);
    }

    #[test]
    fn every_thread_invokes_workload_once() {
        let platform = FakePlatform::new();
        let invoked = Arc::new(Mutex::new(Vec::new()));

        let family = Arc::new(Family::new("mt", {
            let platform = platform.clone();
            let invoked = Arc::clone(&invoked);

            move |runner| {
                invoked.lock().unwrap().push(runner.thread_index());
                assert_eq!(runner.threads(), 3);

                while runner.keep_running() {
                    platform.advance(Duration::from_micros(10));
                }
            }
        }));
        let instance = Instance::single(&family, nz!(3));

        let runner = Runner::new(quick_config());
        let clock =
            FastClock::with_platform(TimeDomain::CpuTime, PlatformFacade::fake(platform.clone()));

        let report = runner.run_instance_on(&instance, &clock);

        let mut invoked = invoked.lock().unwrap().clone();
        invoked.sort_unstable();
        assert_eq!(invoked, vec![0, 1, 2]);
        assert_eq!(report.runs().len(), 3);
    }

    #[test]
    fn reporter_receives_every_instance() {
        let platform = FakePlatform::new();
        let registry = Registry::new();
        registry.register(fake_time_family("fake", &platform).arg(1).arg(2));

        let mut reporter = MockReporter::new();
        reporter
            .expect_report_context()
            .times(1)
            .return_const(true);
        reporter.expect_report_runs().times(2).return_const(());

        // Instances started through the registry use the real clock, so these spin for real.
        let runner = Runner::new(quick_config()).with_system(fake_system(nz!(1)));

        assert_eq!(
            runner.run_matching(&registry, &Filter::everything(), &mut reporter),
            2
        );
        assert_eq!(
            runner.matching_names(&registry, &Filter::everything()),
            vec!["fake/1", "fake/2"]
        );
    }
}
