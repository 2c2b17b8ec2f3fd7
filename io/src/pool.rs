use common::sync::JoinOnDrop;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use log::{debug, error};
use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
    panic::{self, AssertUnwindSafe},
    thread,
    time::Duration,
};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// How long `schedule` waits for an idle worker before giving up.
const SCHEDULE_TIMEOUT: Duration = Duration::from_millis(100);

/// A fixed set of worker threads, each running one job at a time.
///
/// Jobs are handed over directly to an idle worker; when every worker is busy `schedule` fails
/// instead of queueing.
pub struct WorkerPool {
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinOnDrop<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> io::Result<Self> {
        let (tx, rx) = bounded::<Job>(0);
        let workers = (0 .. size.max(1))
            .map(|index| {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("cops-worker-{}", index))
                    .spawn(move || work(rx))
                    .map(JoinOnDrop::new)
            })
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            jobs: Some(tx),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn schedule<F>(&self, job: F) -> Result<(), ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(ScheduleError::ShutDown)?;
        jobs.send_timeout(Box::new(job), SCHEDULE_TIMEOUT)
            .map_err(|error| match error {
                SendTimeoutError::Timeout(_) => ScheduleError::Exhausted,
                SendTimeoutError::Disconnected(_) => ScheduleError::ShutDown,
            })
    }

    /// Stops accepting jobs and waits for running ones to finish.
    pub fn shutdown(&mut self) {
        self.jobs = None;
        self.workers.clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work(jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("worker job panicked");
        }
    }

    debug!("worker finished");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// Every worker is busy.
    Exhausted,
    ShutDown,
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "no idle worker available"),
            Self::ShutDown => write!(f, "worker pool is shut down"),
        }
    }
}

impl StdError for ScheduleError {}
