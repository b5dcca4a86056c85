use super::*;
use std::sync::Mutex;

#[test]
fn zero_threads_is_rejected() {
    let err = RayonWorkerPool::new(Some(0)).unwrap_err();
    assert!(err.to_string().contains("must be >= 1"));
}

#[test]
fn rayon_pool_runs_job_once_per_worker() {
    let pool = RayonWorkerPool::new(Some(3)).unwrap();
    assert_eq!(pool.worker_count(), 3);

    let seen = Mutex::new(Vec::new());
    pool.run_on_all(&|idx| seen.lock().unwrap().push(idx));
    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2]);
}

#[test]
fn rayon_pool_workers_are_named() {
    let pool = RayonWorkerPool::new(Some(2)).unwrap();
    let names = Mutex::new(Vec::new());
    pool.run_on_all(&|_| {
        let name = std::thread::current().name().map(str::to_owned);
        names.lock().unwrap().push(name);
    });
    for name in names.into_inner().unwrap() {
        assert!(name.unwrap().starts_with("foreach-worker-"));
    }
}

#[test]
fn inline_pool_runs_on_caller() {
    let caller = std::thread::current().id();
    let ran_on = Mutex::new(None);
    InlinePool.run_on_all(&|idx| {
        assert_eq!(idx, 0);
        *ran_on.lock().unwrap() = Some(std::thread::current().id());
    });
    assert_eq!(InlinePool.worker_count(), 1);
    assert_eq!(ran_on.into_inner().unwrap(), Some(caller));
}
