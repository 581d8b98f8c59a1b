// src/pool/rayon_pool.rs

use std::sync::{Arc, Condvar, Mutex};

use tracing::{debug, error};

use crate::errors::{GradflowError, Result};
use crate::pool::{Job, WorkerPool};

/// Fixed-size pool backed by a dedicated `rayon::ThreadPool`.
///
/// Rayon has no "wait for everything spawned" primitive, so the pool keeps
/// its own count of outstanding jobs and a condvar that `wait()` sleeps on.
pub struct RayonWorkerPool {
    pool: rayon::ThreadPool,
    pending: Arc<Pending>,
    size: usize,
}

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn increment(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Marks a job finished even when it unwinds.
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

impl RayonWorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(GradflowError::Pool(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gradflow-worker-{i}"))
            .panic_handler(|_| error!("worker job panicked"))
            .build()
            .map_err(|e| GradflowError::Pool(e.to_string()))?;

        debug!(workers, "worker pool started");

        Ok(Self {
            pool,
            pending: Arc::new(Pending::default()),
            size: workers,
        })
    }

    /// Pool sized to the machine's available parallelism.
    pub fn with_default_size() -> Result<Self> {
        Self::new(default_worker_count())
    }

    /// Jobs scheduled but not yet finished.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WorkerPool for RayonWorkerPool {
    fn schedule(&self, job: Job) {
        self.pending.increment();
        let guard = PendingGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            job();
        });
    }

    fn wait(&self) {
        let mut count = self.pending.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count > 0 {
            count = self
                .pending
                .idle
                .wait(count)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn size(&self) -> usize {
        self.size
    }
}

pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
