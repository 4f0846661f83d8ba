use thiserror::Error;

use crate::FamilyId;

/// Errors that can occur when configuring or registering benchmarks.
///
/// Misuse detected while a benchmark is running (calling result setters too early, reading an
/// argument that was never registered, ...) is not reported through this type. Those are
/// programming errors in the benchmark itself and panic instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A configuration option was given a value the harness cannot work with.
    #[error("invalid value for '{option}': {problem}")]
    InvalidConfig {
        /// The name of the offending option.
        option: &'static str,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// The registry has no family with this identifier.
    #[error("no benchmark family is registered as {0}")]
    UnknownFamily(FamilyId),

    /// Command-line flags could not be parsed.
    #[error("invalid command line: {0}")]
    Flags(String),
}

/// A specialized `Result` type for harness operations, returning the crate's [`Error`] type
/// as the error value.
pub type Result<T> = std::result::Result<T, Error>;
