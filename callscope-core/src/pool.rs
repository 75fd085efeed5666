//! Worker pool sizing for concurrent index lookups.
//!
//! Each build gets its own rayon pool so the configured concurrency cap
//! bounds in-flight queries against the index service, independent of the
//! global pool and of CPU count.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::{CallscopeError, CallscopeResult};

/// Build a pool with exactly `concurrency` workers.
pub fn build_pool(concurrency: usize) -> CallscopeResult<ThreadPool> {
    if concurrency == 0 {
        return Err(CallscopeError::invalid("concurrency must be at least 1"));
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .thread_name(|i| format!("callscope-query-{i}"))
        .build()
        .map_err(|e| CallscopeError::internal(format!("thread pool: {e}")))?;

    debug!(workers = concurrency, "initialized query pool");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size() {
        let pool = build_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }

    #[test]
    fn test_zero_rejected() {
        assert!(matches!(
            build_pool(0),
            Err(CallscopeError::InvalidArgument { .. })
        ));
    }
}
