use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, error};

/// Pattern that selects every benchmark when passed to [`Filter::from_pattern()`].
pub const SELECT_ALL: &str = "all";

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides which benchmark families are selected for execution, by family name.
///
/// The harness does not interpret patterns itself. Callers compile a pattern with whatever
/// matching engine they prefer and hand over the resulting predicate.
///
/// # Examples
///
/// ```
/// use loop_bench::Filter;
///
/// let filter = Filter::from_pattern("vec", |pattern| {
///     let pattern = pattern.to_string();
///     Ok::<_, std::convert::Infallible>(move |name: &str| name.contains(&pattern))
/// });
///
/// assert!(filter.matches("vec_push"));
/// assert!(!filter.matches("hash_insert"));
/// ```
#[derive(Clone, derive_more::Debug)]
pub struct Filter {
    #[debug(ignore)]
    kind: FilterKind,
}

#[derive(Clone)]
enum FilterKind {
    Nothing,
    Everything,
    Predicate(Predicate),
}

impl Filter {
    /// Selects no benchmarks.
    #[must_use]
    pub fn nothing() -> Self {
        Self {
            kind: FilterKind::Nothing,
        }
    }

    /// Selects every benchmark.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            kind: FilterKind::Everything,
        }
    }

    /// Selects the benchmarks whose family name satisfies `predicate`.
    #[must_use]
    pub fn matching<P>(predicate: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            kind: FilterKind::Predicate(Arc::new(predicate)),
        }
    }

    /// Resolves a user-supplied selection pattern.
    ///
    /// An empty pattern selects nothing and [`SELECT_ALL`] selects everything. Any other pattern
    /// is handed to `compile`. If compilation fails, the failure is logged and the filter rejects
    /// every name, so a typo in a pattern results in an empty run instead of an aborted process.
    /// Unlike an empty pattern, such a run still reports its context.
    pub fn from_pattern<C, P, E>(pattern: &str, compile: C) -> Self
    where
        C: FnOnce(&str) -> Result<P, E>,
        P: Fn(&str) -> bool + Send + Sync + 'static,
        E: Display,
    {
        match pattern {
            "" => {
                debug!("empty selection pattern, no benchmarks selected");
                Self::nothing()
            }
            SELECT_ALL => Self::everything(),
            pattern => match compile(pattern) {
                Ok(predicate) => {
                    debug!(pattern, "selection pattern compiled");
                    Self::matching(predicate)
                }
                Err(e) => {
                    error!(pattern, error = %e, "could not compile selection pattern");
                    Self::matching(|_| false)
                }
            },
        }
    }

    /// Whether the family with this name is selected.
    #[must_use]
    pub fn matches(&self, family_name: &str) -> bool {
        match &self.kind {
            FilterKind::Nothing => false,
            FilterKind::Everything => true,
            FilterKind::Predicate(predicate) => predicate(family_name),
        }
    }

    /// Whether the filter was asked to select nothing, in which case no run takes place at all.
    pub(crate) fn is_nothing(&self) -> bool {
        matches!(self.kind, FilterKind::Nothing)
    }
}
