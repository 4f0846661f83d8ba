#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A micro-benchmarking harness that runs timed workloads long enough to produce meaningful
//! per-iteration timings, on one or many threads, with minimal measurement overhead.
//!
//! The core concepts are:
//! - [`Family`] - a named benchmark workload, optionally parameterized by arguments and thread
//!   counts, registered in a [`Registry`]
//! - [`Instance`] - one concrete combination of a family with its arguments and thread count
//! - [`ThreadRunner`] - the handle a workload loops on, one per thread
//! - [`Runner`] - executes selected instances and hands results to a [`Reporter`]
//! - [`MeasurementRecord`] and [`Summary`] - the results of one repetition and their aggregate
//!
//! # Basic example
//!
//! ```
//! use std::time::Duration;
//!
//! use loop_bench::{Config, Family, Filter, Registry, Runner, TextReporter};
//! use new_zealand::nz;
//!
//! let registry = Registry::new();
//!
//! registry.register(
//!     Family::new("vec_from_elem", |runner| {
//!         let len = usize::try_from(runner.range_x()).unwrap();
//!
//!         while runner.keep_running() {
//!             std::hint::black_box(vec![0_u8; len]);
//!         }
//!
//!         runner.set_bytes_processed(runner.iterations() * len as u64);
//!     })
//!     .range(8, 512)
//!     .threads(nz!(2)),
//! );
//!
//! let config = Config::builder()
//!     .min_time(Duration::from_millis(10))
//!     .build()
//!     .unwrap();
//!
//! let mut reporter = TextReporter::stdout();
//! Runner::new(config).run_matching(&registry, &Filter::everything(), &mut reporter);
//! ```
//!
//! # Operating principles
//!
//! ## Intervals
//!
//! Workloads are measured in intervals. The first interval of each repetition lasts
//! `min_time / repetitions`. If an interval turns out too short to contain
//! `min_iterations / repetitions` iterations, its measurement is discarded and it is retried at
//! twice the length, up to a limit of five seconds. Repetitions are recorded until enough
//! iterations have been measured and every requested repetition is done.
//!
//! ## Cheap stop checks
//!
//! Asking the operating system for the time on every iteration would dominate the cost of cheap
//! workloads. Instead, a background thread samples the clock once per millisecond and
//! [`ThreadRunner::keep_running()`] only compares the last sample against the end of the interval.
//!
//! ## Threads
//!
//! All threads of an instance start measuring together. A thread that finishes measuring early
//! keeps running the workload, without timing it, until every other thread has finished too, so
//! that the load on the system stays constant while anyone is measuring.
//!
//! ## Time domains
//!
//! By default, time is processor time consumed by the process. Workloads that block can call
//! [`ThreadRunner::use_real_time()`] to be measured in wall-clock time instead. Records always
//! carry both values.
//!
//! ## Command line
//!
//! Programs that want the conventional command-line interface can parse [`Flags`] and pass them
//! to [`run_specified_benchmarks()`], which runs the families of [`Registry::global()`].

mod clock;
mod config;
mod dispatch;
mod error;
mod family;
mod filter;
mod flags;
mod instance;
mod memory;
mod pal;
mod record;
mod registry;
mod reporter;
mod shared;
mod stats;
mod system;
mod text_reporter;
mod thread_runner;
mod units;

pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use family::*;
pub use filter::*;
pub use flags::*;
pub use instance::*;
pub use memory::*;
pub use record::*;
pub use registry::*;
pub use reporter::*;
pub use stats::*;
pub use system::*;
pub use text_reporter::*;
pub use thread_runner::*;
