use std::num::NonZero;
use std::sync::Arc;

use crate::ThreadRunner;

/// For non-dense ranges, intermediate arguments are powers of this multiplier.
pub(crate) const RANGE_MULTIPLIER: i64 = 8;

/// For thread ranges, intermediate thread counts are powers of this multiplier.
pub(crate) const THREAD_RANGE_MULTIPLIER: i64 = 2;

/// The timed body of a benchmark.
///
/// Called exactly once per thread per instance execution. It must loop on
/// [`ThreadRunner::keep_running()`] until that returns `false`.
pub type Workload = Arc<dyn Fn(&mut ThreadRunner<'_>) + Send + Sync>;

/// How many threads an instance uses.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ThreadCount {
    /// Exactly this many threads.
    Fixed(NonZero<usize>),

    /// One thread per logical processor, counted when instances are generated.
    PerCpu,
}

/// A registered benchmark, possibly parameterized by arguments and thread counts.
///
/// Every combination of X argument, Y argument and thread count becomes one
/// [`Instance`](crate::Instance) when benchmarks are selected for execution.
///
/// # Examples
///
/// ```
/// use loop_bench::Family;
/// use new_zealand::nz;
///
/// let family = Family::new("vec_push", |runner| {
///     let len = usize::try_from(runner.range_x()).unwrap();
///
///     while runner.keep_running() {
///         let mut v = Vec::with_capacity(len);
///         v.extend(0..len);
///         std::hint::black_box(v);
///     }
/// })
/// .range(8, 8 << 10)
/// .thread_range(nz!(1), nz!(4));
///
/// assert_eq!(family.x_args(), &[8, 64, 512, 4096, 8192]);
/// ```
#[derive(Clone, derive_more::Debug)]
#[must_use]
pub struct Family {
    name: String,

    #[debug(ignore)]
    workload: Workload,

    x_args: Vec<i64>,
    y_args: Vec<i64>,
    thread_counts: Vec<ThreadCount>,
}

impl Family {
    /// Defines a benchmark with no arguments that runs on one thread.
    pub fn new<F>(name: impl Into<String>, workload: F) -> Self
    where
        F: Fn(&mut ThreadRunner<'_>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            workload: Arc::new(workload),
            x_args: Vec::new(),
            y_args: Vec::new(),
            thread_counts: Vec::new(),
        }
    }

    /// Adds one X argument.
    pub fn arg(mut self, x: i64) -> Self {
        self.x_args.push(x);
        self
    }

    /// Adds X arguments from `lo` to `hi`, spaced by powers of 8. Both bounds are always included.
    ///
    /// # Panics
    ///
    /// Panics if `lo` is negative or greater than `hi`.
    pub fn range(mut self, lo: i64, hi: i64) -> Self {
        self.x_args
            .extend(expand_range(lo, hi, RANGE_MULTIPLIER));
        self
    }

    /// Adds every integer from `lo` to `hi` inclusive as an X argument.
    ///
    /// # Panics
    ///
    /// Panics if `lo` is negative or greater than `hi`.
    pub fn dense_range(mut self, lo: i64, hi: i64) -> Self {
        assert_valid_range(lo, hi);

        self.x_args.extend(lo..=hi);
        self
    }

    /// Adds one X argument and one Y argument.
    ///
    /// X and Y arguments are combined as a cross product when instances are generated.
    pub fn arg_pair(mut self, x: i64, y: i64) -> Self {
        self.x_args.push(x);
        self.y_args.push(y);
        self
    }

    /// Adds X arguments from `lo_x` to `hi_x` and Y arguments from `lo_y` to `hi_y`, each spaced
    /// by powers of 8 like [`range()`](Self::range).
    ///
    /// # Panics
    ///
    /// Panics if either range is negative or has its bounds in the wrong order.
    pub fn range_pair(mut self, lo_x: i64, hi_x: i64, lo_y: i64, hi_y: i64) -> Self {
        let x = expand_range(lo_x, hi_x, RANGE_MULTIPLIER);
        let y = expand_range(lo_y, hi_y, RANGE_MULTIPLIER);

        self.x_args.extend(x);
        self.y_args.extend(y);
        self
    }

    /// Passes the family through a custom configuration function, for argument sets that are
    /// awkward to express with the built-in range methods.
    pub fn apply(self, configure: impl FnOnce(Self) -> Self) -> Self {
        configure(self)
    }

    /// Adds an instance variant that runs on `count` threads.
    pub fn threads(mut self, count: NonZero<usize>) -> Self {
        self.thread_counts.push(ThreadCount::Fixed(count));
        self
    }

    /// Adds thread counts from `min` to `max`, spaced by powers of 2. Both bounds are always
    /// included.
    ///
    /// # Panics
    ///
    /// Panics if `max` is less than `min`.
    pub fn thread_range(mut self, min: NonZero<usize>, max: NonZero<usize>) -> Self {
        assert!(
            min <= max,
            "thread range {min}..={max} has its bounds in the wrong order"
        );

        let lo = i64::try_from(min.get()).expect("thread counts beyond i64 are unrealistic");
        let hi = i64::try_from(max.get()).expect("thread counts beyond i64 are unrealistic");

        self.thread_counts.extend(
            expand_range(lo, hi, THREAD_RANGE_MULTIPLIER)
                .into_iter()
                .map(|count| {
                    let count = usize::try_from(count)
                        .ok()
                        .and_then(NonZero::new)
                        .expect("guarded by both bounds being NonZero");
                    ThreadCount::Fixed(count)
                }),
        );
        self
    }

    /// Adds an instance variant that runs one thread per logical processor.
    pub fn thread_per_cpu(mut self) -> Self {
        self.thread_counts.push(ThreadCount::PerCpu);
        self
    }

    /// The base name of the benchmark, without argument or thread suffixes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered X arguments, in registration order.
    #[must_use]
    pub fn x_args(&self) -> &[i64] {
        &self.x_args
    }

    /// The registered Y arguments, in registration order.
    #[must_use]
    pub fn y_args(&self) -> &[i64] {
        &self.y_args
    }

    /// The registered thread counts, in registration order.
    #[must_use]
    pub fn thread_counts(&self) -> &[ThreadCount] {
        &self.thread_counts
    }

    /// Whether instances of this family are named and run as multithreaded benchmarks.
    #[must_use]
    pub fn is_multithreaded(&self) -> bool {
        !self.thread_counts.is_empty()
    }

    pub(crate) fn workload(&self) -> &Workload {
        &self.workload
    }
}

/// Expands `lo..=hi` into `lo`, every power of `multiplier` strictly between the two, and `hi`.
fn expand_range(lo: i64, hi: i64, multiplier: i64) -> Vec<i64> {
    assert_valid_range(lo, hi);

    let mut values = vec![lo];

    let mut step: i64 = 1;
    while step < hi {
        if step > lo {
            values.push(step);
        }

        let Some(next) = step.checked_mul(multiplier) else {
            break;
        };
        step = next;
    }

    if hi != lo {
        values.push(hi);
    }

    values
}

fn assert_valid_range(lo: i64, hi: i64) {
    assert!(
        lo >= 0 && lo <= hi,
        "argument range {lo}..={hi} must satisfy 0 <= lo <= hi"
    );
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;

    use super::*;

    fn noop() -> Family {
        Family::new("noop", |runner| while runner.keep_running() {})
    }

    #[test]
    fn range_spaces_by_eight() {
        assert_eq!(expand_range(1, 64, RANGE_MULTIPLIER), vec![1, 8, 64]);
        assert_eq!(expand_range(8, 8 << 10, RANGE_MULTIPLIER), vec![
            8, 64, 512, 4096, 8192
        ]);
        assert_eq!(expand_range(0, 10, RANGE_MULTIPLIER), vec![0, 1, 8, 10]);
    }

    #[test]
    fn range_with_equal_bounds_has_one_value() {
        assert_eq!(expand_range(5, 5, RANGE_MULTIPLIER), vec![5]);
    }

    #[test]
    fn range_near_i64_max_does_not_overflow() {
        let values = expand_range(i64::MAX - 1, i64::MAX, RANGE_MULTIPLIER);

        assert_eq!(values, vec![i64::MAX - 1, i64::MAX]);
    }

    #[test]
    fn dense_range_includes_every_value() {
        let family = noop().dense_range(1, 4);

        assert_eq!(family.x_args(), &[1, 2, 3, 4]);
        assert!(family.y_args().is_empty());
    }

    #[test]
    #[should_panic]
    fn inverted_range_panics() {
        let _family = noop().range(10, 1);
    }

    #[test]
    #[should_panic]
    fn negative_dense_range_panics() {
        let _family = noop().dense_range(-1, 4);
    }

    #[test]
    fn pairs_fill_both_axes() {
        let family = noop().arg_pair(1, 2).range_pair(1, 8, 64, 512);

        assert_eq!(family.x_args(), &[1, 1, 8]);
        assert_eq!(family.y_args(), &[2, 64, 512]);
    }

    #[test]
    fn thread_range_spaces_by_two() {
        let family = noop().thread_range(nz!(1), nz!(6));

        assert_eq!(family.thread_counts(), &[
            ThreadCount::Fixed(nz!(1)),
            ThreadCount::Fixed(nz!(2)),
            ThreadCount::Fixed(nz!(4)),
            ThreadCount::Fixed(nz!(6)),
        ]);
        assert!(family.is_multithreaded());
    }

    #[test]
    fn no_thread_counts_means_single_threaded() {
        let family = noop().arg(3);

        assert!(!family.is_multithreaded());
        assert!(family.thread_counts().is_empty());
    }

    #[test]
    fn apply_runs_custom_configuration() {
        let family = noop().apply(|family| family.arg(7).threads(nz!(3)).thread_per_cpu());

        assert_eq!(family.x_args(), &[7]);
        assert_eq!(family.thread_counts(), &[
            ThreadCount::Fixed(nz!(3)),
            ThreadCount::PerCpu
        ]);
    }
}
