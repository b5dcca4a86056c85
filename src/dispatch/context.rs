use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{DispatchError, DispatchResult};
use crate::partition::slicer::DEFAULT_OVERSUBSCRIPTION;
use crate::pool::worker_pool::{InlinePool, RayonWorkerPool, WorkerPool};

/// Options controlling how a [`DispatchContext`] runs launches.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DispatchOpts {
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Slices per worker when cutting a parallel launch.
    pub oversubscription: u32,
    /// Allow the parallel path; `false` forces sequential execution.
    pub allow_parallel: bool,
}

impl Default for DispatchOpts {
    fn default() -> Self {
        Self {
            threads: None,
            oversubscription: DEFAULT_OVERSUBSCRIPTION,
            allow_parallel: true,
        }
    }
}

impl DispatchOpts {
    /// Check option values.
    pub fn validate(&self) -> DispatchResult<()> {
        if self.oversubscription == 0 {
            return Err(DispatchError::validation(
                "dispatch 'oversubscription' must be >= 1",
            ));
        }
        if self.threads == Some(0) {
            return Err(DispatchError::validation(
                "dispatch 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> DispatchResult<Self> {
        let opts: Self = serde_json::from_str(s).map_err(|e| DispatchError::serde(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Load options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Other(
                anyhow::Error::new(e).context(format!("read dispatch opts '{}'", path.display())),
            )
        })?;
        Self::from_json_str(&text)
    }
}

/// Runtime context a launch executes in.
///
/// Owns the worker pool and the "parallel launch in flight" flag. A launch issued while the flag is
/// held (typically from inside a kernel running on a worker) falls back to sequential execution
/// instead of waiting on workers that are already busy.
pub struct DispatchContext {
    pool: Box<dyn WorkerPool>,
    opts: DispatchOpts,
    in_flight: AtomicBool,
}

impl DispatchContext {
    /// Create a context backed by a dedicated rayon pool sized by `opts.threads`.
    pub fn new(opts: DispatchOpts) -> DispatchResult<Self> {
        opts.validate()?;
        let pool = RayonWorkerPool::new(opts.threads)?;
        Ok(Self::from_parts(Box::new(pool), opts))
    }

    /// Create a context over an externally supplied pool. `opts.threads` is ignored.
    pub fn with_pool(pool: impl WorkerPool + 'static, opts: DispatchOpts) -> DispatchResult<Self> {
        opts.validate()?;
        Ok(Self::from_parts(Box::new(pool), opts))
    }

    /// Context that always runs launches on the calling thread.
    pub fn sequential() -> Self {
        Self::from_parts(Box::new(InlinePool), DispatchOpts::default())
    }

    fn from_parts(pool: Box<dyn WorkerPool>, opts: DispatchOpts) -> Self {
        tracing::debug!(workers = pool.worker_count(), ?opts, "dispatch context ready");
        Self {
            pool,
            opts,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Options this context was built with.
    pub fn opts(&self) -> &DispatchOpts {
        &self.opts
    }

    /// Number of pool workers.
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// `true` while a parallel launch owns the worker pool.
    pub fn parallel_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn pool(&self) -> &dyn WorkerPool {
        self.pool.as_ref()
    }

    /// Take the pool for one parallel launch, or `None` when another launch holds it.
    pub(crate) fn try_acquire_parallel(&self) -> Option<ParallelGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ParallelGuard {
                flag: &self.in_flight,
            })
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("workers", &self.pool.worker_count())
            .field("opts", &self.opts)
            .field("in_flight", &self.parallel_in_flight())
            .finish()
    }
}

/// Clears the in-flight flag when the parallel launch ends, including by unwinding.
pub(crate) struct ParallelGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ParallelGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/context.rs"]
mod tests;
