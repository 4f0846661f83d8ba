use std::time::Duration;

use crate::pal::abstractions::Platform;
#[cfg(test)]
use crate::pal::fake::FakePlatform;
use crate::pal::real::RealPlatform;

/// Switches between the real platform and the fake one used in tests without dynamic dispatch.
#[derive(Clone, Debug)]
pub(crate) enum PlatformFacade {
    Real(RealPlatform),

    #[cfg(test)]
    Fake(FakePlatform),
}

impl PlatformFacade {
    pub(crate) fn real() -> Self {
        Self::Real(RealPlatform::new())
    }

    #[cfg(test)]
    pub(crate) fn fake(platform: FakePlatform) -> Self {
        Self::Fake(platform)
    }
}

impl Platform for PlatformFacade {
    fn wall_time(&self) -> Duration {
        match self {
            Self::Real(platform) => platform.wall_time(),
            #[cfg(test)]
            Self::Fake(platform) => platform.wall_time(),
        }
    }

    fn process_time(&self) -> Duration {
        match self {
            Self::Real(platform) => platform.process_time(),
            #[cfg(test)]
            Self::Fake(platform) => platform.process_time(),
        }
    }

    fn thread_time(&self) -> Duration {
        match self {
            Self::Real(platform) => platform.thread_time(),
            #[cfg(test)]
            Self::Fake(platform) => platform.thread_time(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn fake_values_pass_through() {
        let fake = FakePlatform::new();
        fake.advance(Duration::from_millis(300));

        let facade = PlatformFacade::fake(fake);

        assert_eq!(facade.wall_time(), Duration::from_millis(300));
        assert_eq!(facade.process_time(), Duration::from_millis(300));
        assert_eq!(facade.thread_time(), Duration::from_millis(300));
    }
}
