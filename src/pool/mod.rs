// src/pool/mod.rs

//! Worker pool abstraction.
//!
//! The scheduler only needs two things from a pool: enqueue an independent
//! job, and block until every enqueued job has finished. Production code
//! uses [`RayonWorkerPool`]; tests can substitute their own implementation.

pub mod rayon_pool;

pub use rayon_pool::RayonWorkerPool;

/// A unit of work handed to the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait WorkerPool: Send + Sync + 'static {
    /// Enqueue `job` for execution on some worker.
    ///
    /// Must be callable from inside a running job.
    fn schedule(&self, job: Job);

    /// Block until every job scheduled so far (including jobs scheduled by
    /// those jobs) has finished. Must not be called from a worker.
    fn wait(&self);

    /// Number of worker threads.
    fn size(&self) -> usize;
}
