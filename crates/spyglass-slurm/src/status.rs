use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::queue::{query_job, JobStatus, JobSummary, SlurmError};

/// Shared, periodically refreshed snapshot of the job's scheduler state.
///
/// One background task re-runs the squeue query on an interval; every
/// reader takes a cheap snapshot instead of pulling from shared provider
/// state. If the job disappears from the scheduler mid-session the
/// last-known summary is kept and only its status flips to COMPLETE;
/// transient provider failures leave the snapshot untouched.
pub struct StatusCell {
    inner: Mutex<JobSummary>,
}

impl StatusCell {
    pub fn new(initial: JobSummary) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(initial),
        })
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> JobSummary {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Start the background refresh task.
    ///
    /// The query runs outside the cell's lock; the lock is held only for
    /// the snapshot swap.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cell = Arc::clone(self);
        tokio::spawn(async move {
            let job_id = cell.snapshot().id;
            loop {
                tokio::time::sleep(interval).await;
                let result = query_job(&job_id).await;
                let mut guard = match cell.inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                absorb(&mut guard, result);
            }
        })
    }
}

/// Fold one refresh result into the cached summary.
fn absorb(current: &mut JobSummary, result: Result<JobSummary, SlurmError>) {
    match result {
        Ok(fresh) => {
            current.status = fresh.status;
            current.partition = fresh.partition;
            current.elapsed = fresh.elapsed;
            // The node list stays as expanded at startup; it is
            // index-stable for the life of the session.
        }
        // The job fell out of the queue after running: keep the last-known
        // summary, flip only the status.
        Err(SlurmError::JobNotFound) => current.status = JobStatus::Complete,
        Err(err) => {
            log::debug!("status refresh failed, keeping cached summary: {err}");
        }
    }
}
