use std::fmt::Display;
use std::num::NonZero;
use std::time::Duration;

use argh::FromArgs;
use tracing::{Level, debug};

use crate::{Config, Error, Filter, Registry, Result, Runner, SELECT_ALL, TextReporter};

/// Runs the registered benchmarks.
#[derive(Clone, Debug, FromArgs, PartialEq)]
#[non_exhaustive]
pub struct Flags {
    /// only run benchmark families whose name matches this pattern; "all" runs every family
    #[argh(option, default = "String::from(SELECT_ALL)")]
    pub filter: String,

    /// minimum number of iterations measured per benchmark
    #[argh(option, default = "100")]
    pub min_iters: u64,

    /// no further repetitions are started once this many iterations have been measured
    #[argh(option, default = "1_000_000_000")]
    pub max_iters: u64,

    /// minimum number of seconds measured per benchmark
    #[argh(option, default = "0.5")]
    pub min_time: f64,

    /// number of repetitions of every benchmark
    #[argh(option, default = "1")]
    pub repetitions: u32,

    /// report the peak memory usage of every benchmark
    #[argh(switch)]
    pub memory_usage: bool,
}

impl Flags {
    /// Parses command-line arguments, not including the program name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Flags`] with the text to show the user if the arguments cannot be
    /// parsed or if help was requested.
    pub fn parse(args: &[&str]) -> Result<Self> {
        Self::from_args(&["loop_bench"], args).map_err(|early_exit| Error::Flags(early_exit.output))
    }

    /// Parses the arguments of the current process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Flags`] with the text to show the user if the arguments cannot be
    /// parsed or if help was requested.
    #[cfg_attr(test, mutants::skip)] // Depends on the arguments of the test process.
    pub fn from_env() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        Self::parse(&args)
    }

    /// The benchmark configuration described by the flags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any option has a value the harness cannot work with.
    pub fn config(&self) -> Result<Config> {
        let min_time =
            Duration::try_from_secs_f64(self.min_time).map_err(|e| Error::InvalidConfig {
                option: "min_time",
                problem: e.to_string(),
            })?;

        let repetitions =
            NonZero::new(self.repetitions).ok_or_else(|| Error::InvalidConfig {
                option: "repetitions",
                problem: "must be at least 1".to_string(),
            })?;

        Config::builder()
            .min_iterations(self.min_iters)
            .max_iterations(self.max_iters)
            .min_time(min_time)
            .repetitions(repetitions)
            .report_peak_memory(self.memory_usage)
            .build()
    }
}

/// Runs the benchmarks of the global registry selected by `flags`, printing results to
/// standard output.
///
/// The filter pattern is compiled by `compile`, so callers can bring their own pattern
/// language. An empty pattern runs nothing and `all` runs everything without consulting
/// `compile`. When debug logging is enabled, the per-iteration overhead of the harness is
/// measured and logged first.
///
/// Returns the number of benchmark instances executed.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the flags do not describe a valid configuration.
#[cfg_attr(test, mutants::skip)] // Prints to standard output, covered by the example program.
pub fn run_specified_benchmarks<C, P, E>(flags: &Flags, compile: C) -> Result<usize>
where
    C: FnOnce(&str) -> std::result::Result<P, E>,
    P: Fn(&str) -> bool + Send + Sync + 'static,
    E: Display,
{
    let runner = Runner::new(flags.config()?);
    let filter = Filter::from_pattern(&flags.filter, compile);

    if tracing::enabled!(Level::DEBUG) {
        let overhead = runner.measure_overhead();
        debug!(?overhead, "harness overhead measured, not subtracted from results");
    }

    let mut reporter = TextReporter::stdout();

    Ok(runner.run_matching(Registry::global(), &filter, &mut reporter))
}
