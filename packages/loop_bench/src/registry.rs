use std::fmt;
use std::num::NonZero;
use std::sync::{Arc, LazyLock, Mutex};

use crate::instance::instances_of;
use crate::{Error, Family, Filter, Instance, Result};

const ERR_POISONED_LOCK: &str = "benchmark registry lock poisoned - a registration panicked";

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Identifies a registered family. Returned by [`Registry::register()`].
///
/// Identifiers are never reused, so a stale identifier cannot unregister a different family.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FamilyId(usize);

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "family #{}", self.0)
    }
}

/// The set of benchmark families known to a process, in registration order.
///
/// Most programs use the process-wide [`Registry::global()`]. Independent registries are useful
/// when a program wants to run different sets of benchmarks side by side, and in tests.
///
/// # Examples
///
/// ```
/// use loop_bench::{Family, Filter, Registry};
/// use new_zealand::nz;
///
/// let registry = Registry::new();
///
/// let id = registry.register(Family::new("noop", |runner| while runner.keep_running() {}));
///
/// let instances = registry.instances(&Filter::everything(), nz!(4));
/// assert_eq!(instances.len(), 1);
///
/// registry.unregister(id).unwrap();
/// assert!(registry.families().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    // Unregistering leaves a hole so that the identifiers of the remaining families stay valid.
    families: Mutex<Vec<Option<Arc<Family>>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Adds a family, returning the identifier to unregister it with.
    pub fn register(&self, family: Family) -> FamilyId {
        let mut families = self.families.lock().expect(ERR_POISONED_LOCK);

        let id = FamilyId(families.len());
        families.push(Some(Arc::new(family)));

        id
    }

    /// Removes a family. Identifiers of other families are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFamily`] if no family with this identifier is registered, for
    /// example because it was already unregistered.
    pub fn unregister(&self, id: FamilyId) -> Result<()> {
        let mut families = self.families.lock().expect(ERR_POISONED_LOCK);

        families
            .get_mut(id.0)
            .and_then(Option::take)
            .map(drop)
            .ok_or(Error::UnknownFamily(id))
    }

    /// A snapshot of the registered families, in registration order.
    #[must_use]
    pub fn families(&self) -> Vec<Arc<Family>> {
        self.families
            .lock()
            .expect(ERR_POISONED_LOCK)
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Expands every family selected by `filter` into its instances.
    ///
    /// Families registered with [`Family::thread_per_cpu()`] get `cpu_count` threads.
    #[must_use]
    pub fn instances(&self, filter: &Filter, cpu_count: NonZero<usize>) -> Vec<Instance> {
        if filter.is_nothing() {
            return Vec::new();
        }

        // Snapshot first so that user-supplied filters never run under the registry lock.
        self.families()
            .iter()
            .filter(|family| filter.matches(family.name()))
            .flat_map(|family| instances_of(family, cpu_count))
            .collect()
    }
}
