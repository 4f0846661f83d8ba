use std::fmt::Write as _;
use std::num::NonZero;
use std::sync::Arc;

use crate::units::argument_suffix;
use crate::{Family, ThreadCount};

/// One concrete, runnable combination of a [`Family`] with its arguments and thread count.
#[derive(Clone, derive_more::Debug)]
pub struct Instance {
    name: String,

    #[debug(ignore)]
    family: Arc<Family>,

    x: Option<i64>,
    y: Option<i64>,
    threads: NonZero<usize>,
    multithreaded: bool,
}

impl Instance {
    /// An instance without arguments, named after the family alone.
    pub(crate) fn single(family: &Arc<Family>, threads: NonZero<usize>) -> Self {
        Self {
            name: family.name().to_string(),
            family: Arc::clone(family),
            x: None,
            y: None,
            threads,
            multithreaded: false,
        }
    }

    /// The full name, including argument and thread count suffixes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The family this instance was generated from.
    #[must_use]
    pub fn family(&self) -> &Family {
        &self.family
    }

    /// The X argument, if the family registered any.
    #[must_use]
    pub fn x(&self) -> Option<i64> {
        self.x
    }

    /// The Y argument, if the family registered any.
    #[must_use]
    pub fn y(&self) -> Option<i64> {
        self.y
    }

    /// How many threads execute the workload concurrently.
    #[must_use]
    pub fn threads(&self) -> NonZero<usize> {
        self.threads
    }

    /// Whether the family registered any thread counts. Single-threaded families get no
    /// `/threads:N` suffix, even though multithreaded ones may also run on one thread.
    #[must_use]
    pub fn is_multithreaded(&self) -> bool {
        self.multithreaded
    }
}

/// Expands a family into its instances: every X argument crossed with every Y argument, each
/// once per thread count.
///
/// `cpu_count` resolves [`ThreadCount::PerCpu`].
pub(crate) fn instances_of(family: &Arc<Family>, cpu_count: NonZero<usize>) -> Vec<Instance> {
    let xs = optional_args(family.x_args());
    let ys = optional_args(family.y_args());

    // A Y argument without any X argument cannot be expressed by the registration methods, as
    // Y arguments are only ever added in pairs.
    if family.x_args().is_empty() && !family.y_args().is_empty() {
        return Vec::new();
    }

    let multithreaded = family.is_multithreaded();

    let thread_counts: Vec<NonZero<usize>> = if multithreaded {
        family
            .thread_counts()
            .iter()
            .map(|count| match count {
                ThreadCount::Fixed(count) => *count,
                ThreadCount::PerCpu => cpu_count,
            })
            .collect()
    } else {
        vec![NonZero::<usize>::MIN]
    };

    let mut instances = Vec::new();

    for &x in &xs {
        for &y in &ys {
            for &threads in &thread_counts {
                let mut name = family.name().to_string();

                for value in [x, y].into_iter().flatten() {
                    name.push('/');
                    name.push_str(&argument_suffix(value));
                }

                if multithreaded {
                    write!(name, "/threads:{threads}")
                        .expect("writing to a String is infallible");
                }

                instances.push(Instance {
                    name,
                    family: Arc::clone(family),
                    x,
                    y,
                    threads,
                    multithreaded,
                });
            }
        }
    }

    instances
}

fn optional_args(args: &[i64]) -> Vec<Option<i64>> {
    if args.is_empty() {
        vec![None]
    } else {
        args.iter().copied().map(Some).collect()
    }
}
