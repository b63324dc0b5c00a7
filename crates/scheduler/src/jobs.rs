use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

/// Work a scheduled job performs on each firing. Implementations must not
/// panic; a firing's failure is theirs to log and absorb so the schedule
/// keeps running.
#[async_trait]
pub trait JobAction: Send + Sync {
    async fn run(&self);
}

/// Named repeating jobs on the tokio timer.
///
/// At most one job exists per name: registering a name that is already
/// taken aborts the old job in the same locked operation, so two jobs with
/// one name are never active at once. The queue owns the task handles;
/// callers hold only names.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to run `first_run_in` from now and every
    /// `interval` after that, under `name`. Returns whether an existing job
    /// with that name was superseded.
    pub fn run_repeating(
        &self,
        name: &str,
        first_run_in: Duration,
        interval: Duration,
        action: Arc<dyn JobAction>,
    ) -> bool {
        let job_name = name.to_owned();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + first_run_in, interval);
            loop {
                ticker.tick().await;
                debug!(job = %job_name, "recurring job fired");
                action.run().await;
            }
        });

        match self.lock().insert(name.to_owned(), handle) {
            Some(previous) => {
                previous.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels the job registered under `name`, reporting whether one
    /// existed. An absent name is a normal outcome, not an error.
    pub fn remove_jobs_by_name(&self, name: &str) -> bool {
        match self.lock().remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        for handle in self.lock().values() {
            handle.abort();
        }
    }
}
