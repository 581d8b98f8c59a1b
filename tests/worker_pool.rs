// tests/worker_pool.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gradflow::errors::GradflowError;
use gradflow::pool::{RayonWorkerPool, WorkerPool};

#[test]
fn zero_workers_is_an_error() {
    let result = RayonWorkerPool::new(0);
    assert!(matches!(result, Err(GradflowError::Pool(_))));
}

#[test]
fn default_size_matches_available_parallelism() {
    let pool = RayonWorkerPool::with_default_size().expect("pool");
    assert!(pool.size() >= 1);
    assert_eq!(pool.size(), gradflow::pool::rayon_pool::default_worker_count());
}

#[test]
fn wait_covers_jobs_scheduled_from_inside_jobs() {
    let pool = Arc::new(RayonWorkerPool::new(2).expect("pool"));
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..8 {
        let inner_pool = Arc::clone(&pool);
        let counter = Arc::clone(&counter);
        pool.schedule(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = Arc::clone(&counter);
            inner_pool.schedule(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }));
    }

    pool.wait();
    assert_eq!(counter.load(Ordering::SeqCst), 16);
    assert_eq!(pool.pending(), 0);
}

#[test]
fn panicking_job_does_not_hang_wait() {
    let pool = RayonWorkerPool::new(1).expect("pool");
    let counter = Arc::new(AtomicUsize::new(0));

    pool.schedule(Box::new(|| panic!("boom")));
    let after = Arc::clone(&counter);
    pool.schedule(Box::new(move || {
        after.fetch_add(1, Ordering::SeqCst);
    }));

    pool.wait();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn wait_on_idle_pool_returns_immediately() {
    let pool = RayonWorkerPool::new(1).expect("pool");
    pool.wait();
    assert_eq!(pool.pending(), 0);
}
