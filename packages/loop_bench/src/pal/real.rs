use std::time::{Duration, Instant};

use cpu_time::{ProcessTime, ThreadTime};

use crate::pal::abstractions::Platform;

/// Reads time from the operating system via `std` and the `cpu_time` package.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RealPlatform {
    epoch: Instant,
}

impl RealPlatform {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Platform for RealPlatform {
    fn wall_time(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn process_time(&self) -> Duration {
        ProcessTime::now().as_duration()
    }

    fn thread_time(&self) -> Duration {
        ThreadTime::now().as_duration()
    }
}
