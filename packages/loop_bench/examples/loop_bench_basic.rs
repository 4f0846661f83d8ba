//! Registers a few benchmarks in the global registry and runs them with command-line flags.
//!
//! ```text
//! cargo run --release --example loop_bench_basic -- --filter vec --repetitions 3
//! ```
//!
//! The filter is a plain substring match. Set `RUST_LOG=loop_bench=debug` to see harness
//! decisions and the measured overhead.

use std::collections::HashMap;
use std::convert::Infallible;
use std::hint::black_box;
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use loop_bench::{Error, Family, Flags, Registry, run_specified_benchmarks};
use new_zealand::nz;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    register_benchmarks();

    let flags = match Flags::from_env() {
        Ok(flags) => flags,
        Err(Error::Flags(text)) => {
            println!("{text}");
            return if text.contains("Usage") {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run_specified_benchmarks(&flags, |pattern| {
        let pattern = pattern.to_string();
        Ok::<_, Infallible>(move |name: &str| name.contains(&pattern))
    }) {
        Ok(executed) => {
            println!("{executed} benchmark instances executed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn register_benchmarks() {
    let registry = Registry::global();

    registry.register(
        Family::new("vec_push", |runner| {
            let len = usize::try_from(runner.range_x()).expect("arguments are small and positive");

            while runner.keep_running() {
                let mut v = Vec::with_capacity(len);
                for i in 0..len {
                    v.push(i);
                }
                black_box(v);
            }

            let bytes_per_iteration = u64::try_from(len.saturating_mul(size_of::<usize>()))
                .expect("arguments are small");
            runner.set_bytes_processed(runner.iterations().saturating_mul(bytes_per_iteration));
        })
        .range(8, 8 << 10),
    );

    registry.register(
        Family::new("hash_map_insert", |runner| {
            let len = runner.range_x();

            while runner.keep_running() {
                let mut map = HashMap::new();
                for key in 0..len {
                    map.insert(key, key);
                }
                black_box(map);
            }

            runner.set_items_processed(
                runner
                    .iterations()
                    .saturating_mul(u64::try_from(len).expect("arguments are positive")),
            );
        })
        .arg(64)
        .arg(4_096),
    );

    registry.register(
        Family::new("mutex_contention", |runner| {
            static SHARED: Mutex<u64> = Mutex::new(0);

            while runner.keep_running() {
                let mut value = SHARED.lock().expect("no benchmark panics while holding the lock");
                *value = value.wrapping_add(1);
            }

            runner.set_label(format!("{} threads", runner.threads()));
        })
        .thread_range(nz!(1), nz!(4))
        .thread_per_cpu(),
    );

    registry.register(Family::new("sleep_1ms", |runner| {
        runner.use_real_time();

        while runner.keep_running() {
            thread::sleep(Duration::from_millis(1));
        }
    }));
}
