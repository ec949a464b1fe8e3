//! Bounded rayon pools for per-well and per-compound work

use rayon::{ThreadPool, ThreadPoolBuilder};

fn build(threads: usize) -> Option<ThreadPool> {
    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!("Could not build a pool of {threads} threads, using the global pool: {e}");
            None
        }
    }
}

/// Run `op` on a pool of `threads` workers, or on the global pool when `None`
pub(crate) fn install<R, F>(threads: Option<usize>, op: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match threads.and_then(build) {
        Some(pool) => pool.install(op),
        None => op(),
    }
}
