//! Runs independent per-source jobs, sequentially or on a bounded pool.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{BuildError, BuildResult};

/// Job runner shared by the compile and assemble drivers.
pub(crate) struct Executor {
    pool: Option<ThreadPool>,
}

impl Executor {
    /// One job at a time for `jobs <= 1`, otherwise a pool of `jobs` threads.
    pub(crate) fn new(jobs: usize) -> BuildResult<Self> {
        if jobs <= 1 {
            return Ok(Self { pool: None });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("extforge-worker-{i}"))
            .build()
            .map_err(|e| BuildError::WorkerPool(e.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    /// Applies `job` to every item and collects the results in input order.
    ///
    /// Stops at the first failure. In parallel mode no new jobs are started
    /// once a failure is observed, jobs already running finish, and one of
    /// the failures is returned.
    pub(crate) fn run_all<T, R, F>(&self, items: &[T], job: F) -> BuildResult<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> BuildResult<R> + Sync + Send,
    {
        match &self.pool {
            None => items.iter().map(job).collect(),
            Some(pool) => pool.install(|| items.par_iter().map(job).collect()),
        }
    }
}
