use crossbeam_channel::bounded;
use io::{ScheduleError, WorkerPool};
use std::{thread, time::Duration};

#[test]
fn test_jobs_run() {
    let pool = WorkerPool::new(2).unwrap();
    let (tx, rx) = bounded(2);
    for i in 0 .. 2 {
        let tx = tx.clone();
        pool.schedule(move || tx.send(i).unwrap()).unwrap();
    }

    let mut done = vec![
        rx.recv_timeout(Duration::from_secs(1)).unwrap(),
        rx.recv_timeout(Duration::from_secs(1)).unwrap(),
    ];
    done.sort_unstable();
    assert_eq!(done, [0, 1]);
}

#[test]
fn test_exhausted_pool_rejects() {
    let pool = WorkerPool::new(1).unwrap();
    let (release_tx, release_rx) = bounded::<()>(0);
    let (started_tx, started_rx) = bounded(1);

    pool.schedule(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    })
    .unwrap();
    started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

    assert_eq!(pool.schedule(|| {}), Err(ScheduleError::Exhausted));

    release_tx.send(()).unwrap();
    let mut scheduled = false;
    for _ in 0 .. 20 {
        if pool.schedule(|| {}).is_ok() {
            scheduled = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(scheduled);
}

#[test]
fn test_panicking_job_keeps_worker() {
    let pool = WorkerPool::new(1).unwrap();
    pool.schedule(|| panic!("job failure")).unwrap();

    let (tx, rx) = bounded(1);
    let mut scheduled = false;
    for _ in 0 .. 20 {
        let tx = tx.clone();
        if pool.schedule(move || tx.send(()).unwrap()).is_ok() {
            scheduled = true;
            break;
        }
    }
    assert!(scheduled);
    rx.recv_timeout(Duration::from_secs(1)).unwrap();
}

#[test]
fn test_shutdown() {
    let mut pool = WorkerPool::new(2).unwrap();
    assert_eq!(pool.size(), 2);
    pool.shutdown();
    assert_eq!(pool.schedule(|| {}), Err(ScheduleError::ShutDown));
}
