//! Background execution of blocking jobs with observable progress.
//!
//! A [`Dispatcher`] runs closures on tokio's blocking pool, at most `concurrency`
//! at a time. Every submission returns a [`JobHandle`] whose [`JobState`] can be
//! polled or awaited. Dropping a handle does not cancel the job.

use std::{fmt, sync::Arc};

use tokio::{
    runtime::Handle,
    sync::{Semaphore, watch},
    task,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle of a submitted job.
#[derive(Debug)]
pub enum JobState<T> {
    /// Waiting for a worker slot.
    Pending,
    Running,
    Done(Arc<T>),
    /// The job returned an error or panicked; the message says which.
    Failed(String),
}

// manual impl: `T` itself need not be Clone
impl<T> Clone for JobState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Running => Self::Running,
            Self::Done(value) => Self::Done(Arc::clone(value)),
            Self::Failed(message) => Self::Failed(message.clone()),
        }
    }
}

impl<T> JobState<T> {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Why awaiting a job produced no value.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job {id} failed: {message}")]
    Failed { id: Uuid, message: String },
    #[error("job {id} was dropped before finishing")]
    Lost { id: Uuid },
}

/// Observer of one submitted job.
#[derive(Debug)]
pub struct JobHandle<T> {
    id: Uuid,
    rx: watch::Receiver<JobState<T>>,
}

impl<T> Clone for JobHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            rx: self.rx.clone(),
        }
    }
}

impl<T> JobHandle<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state, without waiting.
    pub fn state(&self) -> JobState<T> {
        self.rx.borrow().clone()
    }

    /// Waits until the job is done or failed.
    pub async fn wait(mut self) -> Result<Arc<T>, JobError> {
        let id = self.id;
        let state = self
            .rx
            .wait_for(JobState::is_finished)
            .await
            .map_err(|_| JobError::Lost { id })?
            .clone();
        match state {
            JobState::Done(value) => Ok(value),
            JobState::Failed(message) => Err(JobError::Failed { id, message }),
            JobState::Pending | JobState::Running => Err(JobError::Lost { id }),
        }
    }
}

/// Bounded pool of blocking workers.
#[derive(Clone)]
pub struct Dispatcher {
    runtime: Handle,
    permits: Arc<Semaphore>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl Dispatcher {
    /// Dispatcher on the current tokio runtime.
    ///
    /// # Panics
    /// Outside a tokio runtime, like [`Handle::current`].
    pub fn new(concurrency: usize) -> Self {
        Self::with_runtime(Handle::current(), concurrency)
    }

    pub fn with_runtime(runtime: Handle, concurrency: usize) -> Self {
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Queues `job`; it starts once a worker slot is free.
    pub fn submit<T, E, F>(&self, job: F) -> JobHandle<T>
    where
        T: Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(JobState::Pending);
        let permits = Arc::clone(&self.permits);

        self.runtime.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tx.send_replace(JobState::Failed("dispatcher closed".into()));
                return;
            };
            tx.send_replace(JobState::Running);
            debug!(%id, "job started");

            let state = match task::spawn_blocking(job).await {
                Ok(Ok(value)) => JobState::Done(Arc::new(value)),
                Ok(Err(e)) => JobState::Failed(e.to_string()),
                Err(join) => JobState::Failed(format!("job panicked: {join}")),
            };
            if let JobState::Failed(message) = &state {
                warn!(%id, error = %message, "job failed");
            } else {
                debug!(%id, "job done");
            }
            tx.send_replace(state);
        });

        JobHandle { id, rx }
    }
}
