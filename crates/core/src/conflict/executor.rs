//! Execution context with user-interface affinity.
//!
//! Interactive merge presentation must run on one designated thread. The
//! [`UiExecutor`] owns that thread; callers on any other thread submit a task
//! and suspend until its result comes back.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::errors::ConflictError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A dedicated thread that runs submitted tasks one at a time, in order.
pub struct UiExecutor {
    sender: Option<mpsc::Sender<Job>>,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl UiExecutor {
    /// Start the UI thread under `name`.
    pub fn spawn(name: &str) -> Result<Self, ConflictError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in receiver {
                    // A panicking task must not take the UI thread down with it.
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("ui task panicked");
                    }
                }
                debug!("ui executor stopped");
            })
            .map_err(|e| ConflictError::ExecutorUnavailable(e.to_string()))?;

        Ok(Self {
            sender: Some(sender),
            thread_id: handle.thread().id(),
            handle: Some(handle),
        })
    }

    /// Whether the calling thread is the UI thread.
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn submit<R, F>(&self, task: F) -> Result<oneshot::Receiver<R>, ConflictError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = reply.send(task());
        });
        self.sender
            .as_ref()
            .ok_or_else(|| ConflictError::ExecutorUnavailable("executor is shutting down".into()))?
            .send(job)
            .map_err(|_| ConflictError::ExecutorUnavailable("ui thread has stopped".into()))?;
        Ok(receiver)
    }

    /// Run `task` on the UI thread and block until it finishes. Runs inline
    /// when already on the UI thread.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`invoke`](Self::invoke) there.
    pub fn invoke_and_wait<R, F>(&self, task: F) -> Result<R, ConflictError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_ui_thread() {
            return Ok(task());
        }
        self.submit(task)?
            .blocking_recv()
            .map_err(|_| ConflictError::ExecutorUnavailable("ui task did not complete".into()))
    }

    /// Async variant of [`invoke_and_wait`](Self::invoke_and_wait).
    pub async fn invoke<R, F>(&self, task: F) -> Result<R, ConflictError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_ui_thread() {
            return Ok(task());
        }
        self.submit(task)?
            .await
            .map_err(|_| ConflictError::ExecutorUnavailable("ui task did not complete".into()))
    }
}

impl Drop for UiExecutor {
    fn drop(&mut self) {
        // Closing the channel ends the thread's receive loop.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if !self.is_ui_thread() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_runs_on_named_thread() {
        let executor = UiExecutor::spawn("ui-test").unwrap();
        let name = executor
            .invoke_and_wait(|| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("ui-test"));
        assert!(!executor.is_ui_thread());
    }

    #[test]
    fn test_nested_invoke_runs_inline() {
        let executor = Arc::new(UiExecutor::spawn("ui-nested").unwrap());
        let inner = executor.clone();
        let result = executor
            .invoke_and_wait(move || {
                assert!(inner.is_ui_thread());
                inner.invoke_and_wait(|| 7).unwrap()
            })
            .unwrap();
        assert_eq!(result, 7);
    }

    #[test]
    fn test_survives_panicking_task() {
        let executor = UiExecutor::spawn("ui-panic").unwrap();
        let err = executor
            .invoke_and_wait(|| -> u8 { panic!("presenter bug") })
            .unwrap_err();
        assert!(matches!(err, ConflictError::ExecutorUnavailable(_)));
        assert_eq!(executor.invoke_and_wait(|| 1).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_async_invoke() {
        let executor = UiExecutor::spawn("ui-async").unwrap();
        let value = executor.invoke(|| "done").await.unwrap();
        assert_eq!(value, "done");
    }
}
