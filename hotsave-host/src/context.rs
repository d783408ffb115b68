//! The host's designated execution context.
//!
//! Session-mutating and long blocking host work (flush, teardown) must run
//! on one host thread, never on a network task. [`HostContext::call`]
//! submits a job there and awaits its result.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;

use tokio::sync::oneshot;

use crate::error::HostError;

pub type HostJob = Box<dyn FnOnce() + Send + 'static>;

type Submit = dyn Fn(HostJob) -> Result<(), HostJob> + Send + Sync;

#[derive(Clone)]
pub struct HostContext {
    submit: Arc<Submit>,
}

impl HostContext {
    /// Run jobs on a dedicated, named thread owned by this context.
    /// The thread exits once every clone of the context is dropped.
    pub fn dedicated(name: &str) -> Result<Self, HostError> {
        let (tx, rx) = mpsc::channel::<HostJob>();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in rx {
                    job();
                }
                tracing::debug!("host context thread exiting");
            })
            .map_err(HostError::Spawn)?;

        Ok(Self::from_submit(move |job| {
            tx.send(job).map_err(|mpsc::SendError(job)| job)
        }))
    }

    /// Hand jobs to an executor the embedding host already runs, e.g. its
    /// main-thread task queue. `submit` returns the job back if it was
    /// refused.
    pub fn from_submit<F>(submit: F) -> Self
    where
        F: Fn(HostJob) -> Result<(), HostJob> + Send + Sync + 'static,
    {
        Self {
            submit: Arc::new(submit),
        }
    }

    /// Run `f` on the host context and wait for its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, HostError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: HostJob = Box::new(move || {
            let _ = tx.send(catch_unwind(AssertUnwindSafe(f)));
        });
        (self.submit)(job).map_err(|_| HostError::ContextClosed)?;

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(HostError::JobPanicked),
            Err(_) => Err(HostError::ContextClosed),
        }
    }
}
