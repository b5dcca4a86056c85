use crate::foundation::error::{DispatchError, DispatchResult};

/// Fixed-size set of workers that can run one job on every worker and wait for all of them.
///
/// The dispatcher consumes exactly this primitive; starting, sizing and tearing down the threads is
/// the owner's business.
pub trait WorkerPool: Send + Sync {
    /// Number of workers `run_on_all` fans out to.
    fn worker_count(&self) -> usize;

    /// Run `job(worker_index)` once on every worker and block until all have returned.
    fn run_on_all(&self, job: &(dyn Fn(usize) + Sync));
}

/// Worker pool backed by a dedicated rayon thread pool.
pub struct RayonWorkerPool {
    pool: rayon::ThreadPool,
}

impl RayonWorkerPool {
    /// Build a pool with `threads` workers (`None` uses rayon's default sizing).
    pub fn new(threads: Option<usize>) -> DispatchResult<Self> {
        Ok(Self {
            pool: build_thread_pool(threads)?,
        })
    }
}

impl std::fmt::Debug for RayonWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonWorkerPool")
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

impl WorkerPool for RayonWorkerPool {
    fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn run_on_all(&self, job: &(dyn Fn(usize) + Sync)) {
        // `broadcast` returns only after every pool thread has run the closure.
        self.pool.broadcast(|ctx| job(ctx.index()));
    }
}

/// Single worker that runs jobs on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn worker_count(&self) -> usize {
        1
    }

    fn run_on_all(&self, job: &(dyn Fn(usize) + Sync)) {
        job(0);
    }
}

fn build_thread_pool(threads: Option<usize>) -> DispatchResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(DispatchError::validation(
            "worker pool 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("foreach-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DispatchError::pool(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pool/worker_pool.rs"]
mod tests;
