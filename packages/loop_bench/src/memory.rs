//! Peak memory measurement around benchmark runs.

use std::alloc::{GlobalAlloc, Layout};
use std::fmt;
use std::sync::atomic::{self, AtomicU64};

/// Measures how far memory usage grows while a benchmark instance runs.
///
/// [`begin()`](Self::begin) is called before the threads of an instance start and
/// [`end()`](Self::end) after they have all finished.
#[cfg_attr(test, mockall::automock)]
pub trait MemoryTracker: Send + Sync {
    /// Starts a measurement, forgetting any previous one.
    fn begin(&self);

    /// Ends the measurement and returns the peak growth in bytes since [`begin()`](Self::begin).
    fn end(&self) -> u64;
}

/// A global allocator wrapper that tracks live heap bytes and their peak.
///
/// # Examples
///
/// ```
/// use loop_bench::{Config, PeakAllocator, Runner};
///
/// #[global_allocator]
/// static ALLOCATOR: PeakAllocator<std::alloc::System> = PeakAllocator::system();
///
/// let config = Config::builder().report_peak_memory(true).build().unwrap();
/// let runner = Runner::new(config).with_memory_tracker(&ALLOCATOR);
/// # drop(runner);
/// ```
pub struct PeakAllocator<A> {
    inner: A,

    live_bytes: AtomicU64,
    peak_bytes: AtomicU64,
    baseline_bytes: AtomicU64,
}

impl<A> fmt::Debug for PeakAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeakAllocator")
            .field("inner", &"<allocator>")
            .field("live_bytes", &self.live_bytes)
            .field("peak_bytes", &self.peak_bytes)
            .finish_non_exhaustive()
    }
}

impl PeakAllocator<std::alloc::System> {
    /// Wraps the system allocator.
    #[must_use]
    pub const fn system() -> Self {
        Self::new(std::alloc::System)
    }
}

impl<A> PeakAllocator<A> {
    /// Wraps `allocator`, which keeps doing the actual allocating.
    #[must_use]
    pub const fn new(allocator: A) -> Self {
        Self {
            inner: allocator,
            live_bytes: AtomicU64::new(0),
            peak_bytes: AtomicU64::new(0),
            baseline_bytes: AtomicU64::new(0),
        }
    }

    /// Bytes currently allocated through this allocator.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(atomic::Ordering::Relaxed)
    }

    #[inline]
    fn grow(&self, bytes: usize) {
        let bytes = u64::try_from(bytes).expect("usize always fits into u64");

        let live = self
            .live_bytes
            .fetch_add(bytes, atomic::Ordering::Relaxed)
            .wrapping_add(bytes);
        self.peak_bytes.fetch_max(live, atomic::Ordering::Relaxed);
    }

    #[inline]
    fn shrink(&self, bytes: usize) {
        let bytes = u64::try_from(bytes).expect("usize always fits into u64");

        self.live_bytes.fetch_sub(bytes, atomic::Ordering::Relaxed);
    }
}

impl<A: Send + Sync> MemoryTracker for PeakAllocator<A> {
    fn begin(&self) {
        let live = self.live_bytes();

        self.baseline_bytes.store(live, atomic::Ordering::Relaxed);
        self.peak_bytes.store(live, atomic::Ordering::Relaxed);
    }

    fn end(&self) -> u64 {
        self.peak_bytes
            .load(atomic::Ordering::Relaxed)
            .saturating_sub(self.baseline_bytes.load(atomic::Ordering::Relaxed))
    }
}

impl<T: MemoryTracker + ?Sized> MemoryTracker for &'static T {
    fn begin(&self) {
        (**self).begin();
    }

    fn end(&self) -> u64 {
        (**self).end()
    }
}

// SAFETY: Every operation is forwarded to the wrapped allocator, which implements GlobalAlloc
// safely. Tracking only touches atomics and never allocates.
unsafe impl<A: GlobalAlloc> GlobalAlloc for PeakAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: Forwarded with the caller's guarantees.
        let ptr = unsafe { self.inner.alloc(layout) };

        if !ptr.is_null() {
            self.grow(layout.size());
        }

        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: Forwarded with the caller's guarantees.
        unsafe { self.inner.dealloc(ptr, layout) };

        self.shrink(layout.size());
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: Forwarded with the caller's guarantees.
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };

        if !ptr.is_null() {
            self.grow(layout.size());
        }

        ptr
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: Forwarded with the caller's guarantees.
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };

        if !new_ptr.is_null() {
            self.grow(new_size);
            self.shrink(layout.size());
        }

        new_ptr
    }
}
