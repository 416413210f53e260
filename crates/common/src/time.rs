use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

/// Runs `f` and adds its wall-clock cost, in nanoseconds, to `accumulated`.
pub fn accumulate_nanos<T>(accumulated: &AtomicU64, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = f();
    accumulated.fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
    value
}
