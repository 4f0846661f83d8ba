//! Platform abstraction layer for the time sources used by the harness.
//!
//! The real platform reads the monotonic wall clock and the processor time counters of the
//! operating system. Tests substitute a fake platform whose clocks only move when told to, which
//! makes interval decisions of the benchmark state machine fully deterministic.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::Platform;
pub(crate) use facade::PlatformFacade;
#[cfg(test)]
pub(crate) use fake::FakePlatform;
