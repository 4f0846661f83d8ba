//! Measures what the harness itself costs.
//!
//! `keep_running` times the fast path of `ThreadRunner::keep_running()` while the end of the
//! interval is still far away, which is the price every measured iteration pays.
//!
//! `instance` measures the fixed cost of executing one benchmark instance with a workload that
//! does nothing. This covers starting the clock sampler, the starting and stopping barriers and
//! the final record processing, all of which is paid once per instance regardless of workload
//! cost.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use loop_bench::{Config, Family, Filter, Registry, Runner};
use new_zealand::nz;

criterion_group!(benches, keep_running, instance);
criterion_main!(benches);

fn keep_running(c: &mut Criterion) {
    // Long enough that the timed calls almost never reach the end of the interval.
    let config = Config::builder()
        .min_time(Duration::from_millis(50))
        .min_iterations(1)
        .build()
        .unwrap();

    let runner = Runner::new(config);

    let mut group = c.benchmark_group("keep_running");
    group.sample_size(10);

    group.bench_function("fast_path", |b| {
        b.iter_custom(|iters| {
            let elapsed = Arc::new(Mutex::new(Duration::ZERO));

            let registry = Registry::new();
            registry.register(Family::new("fast_path", {
                let elapsed = Arc::clone(&elapsed);

                move |runner| {
                    // The first call starts the run and is not on the fast path.
                    let mut running = runner.keep_running();

                    let start = Instant::now();

                    let mut timed: u64 = 0;
                    while running && timed < iters {
                        running = black_box(runner.keep_running());
                        timed = timed.wrapping_add(1);
                    }

                    *elapsed.lock().unwrap() = start.elapsed();

                    while running {
                        running = runner.keep_running();
                    }
                }
            }));

            for instance in registry.instances(&Filter::everything(), nz!(1)) {
                black_box(runner.run_instance(&instance));
            }

            *elapsed.lock().unwrap()
        });
    });

    group.finish();
}

fn instance(c: &mut Criterion) {
    let registry = Registry::new();

    registry.register(
        Family::new("empty", |runner| {
            while runner.keep_running() {
                black_box(());
            }
        })
        .threads(nz!(1))
        .threads(nz!(2)),
    );

    let config = Config::builder()
        .min_time(Duration::from_millis(1))
        .min_iterations(1)
        .build()
        .unwrap();

    let runner = Runner::new(config);

    let mut group = c.benchmark_group("instance");

    for instance in registry.instances(&Filter::everything(), nz!(2)) {
        group.bench_function(instance.name(), |b| {
            b.iter(|| black_box(runner.run_instance(&instance)));
        });
    }

    group.finish();
}
