use std::fmt::Debug;
use std::time::Duration;

/// Source of every timestamp the harness takes.
///
/// All values are offsets from an arbitrary per-platform epoch. Only differences between two
/// readings of the same method are meaningful.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Monotonic wall-clock time.
    fn wall_time(&self) -> Duration;

    /// Processor time consumed by the whole process, all threads included.
    fn process_time(&self) -> Duration;

    /// Processor time consumed by the calling thread.
    fn thread_time(&self) -> Duration;
}
