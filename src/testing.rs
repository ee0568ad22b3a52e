use std::cell::Cell;

thread_local! {
    /// Cache hits observed on this thread.
    static HITS: Cell<u64> = const { Cell::new(0) };
    /// Cache misses observed on this thread.
    static MISSES: Cell<u64> = const { Cell::new(0) };
}

/// The number of cache hits observed on this thread.
pub fn hit_count() -> u64 {
    HITS.with(|cell| cell.get())
}

/// The number of cache misses observed on this thread.
pub fn miss_count() -> u64 {
    MISSES.with(|cell| cell.get())
}

/// Records a cache hit.
pub(crate) fn register_hit() {
    HITS.with(|cell| cell.set(cell.get() + 1));
}

/// Records a cache miss.
pub(crate) fn register_miss() {
    MISSES.with(|cell| cell.set(cell.get() + 1));
}
