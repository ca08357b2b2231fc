//! Dedicated-thread serial executor.

use bridge_traits::{
    error::{BridgeError, Result},
    executor::{SerialExecutor, SerialTask},
};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

const DEFAULT_THREAD_NAME: &str = "media-serial";

enum Message {
    Run(SerialTask),
    Shutdown,
}

/// Serial executor backed by one named OS thread.
///
/// Tasks are delivered through an unbounded Tokio channel and run one at a
/// time in submission order. The thread plays the role a UI event loop plays
/// on mobile hosts, so it does not need a Tokio runtime of its own.
///
/// A panicking task is logged and the loop keeps running.
pub struct ThreadSerialExecutor {
    sender: mpsc::UnboundedSender<Message>,
    thread_id: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadSerialExecutor {
    /// Start an executor on a thread named `media-serial`.
    pub fn new() -> Result<Self> {
        Self::with_name(DEFAULT_THREAD_NAME)
    }

    /// Start an executor on a thread with the given name.
    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded_channel();

        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::run_loop(receiver))?;
        let thread_id = worker.thread().id();

        debug!(thread = %name, "Serial executor started");

        Ok(Self {
            sender,
            thread_id,
            worker: Mutex::new(Some(worker)),
        })
    }

    fn run_loop(mut receiver: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = receiver.blocking_recv() {
            match message {
                Message::Run(task) => {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!("Serial task panicked; executor continues");
                    }
                }
                Message::Shutdown => break,
            }
        }
        debug!("Serial executor loop exited");
    }

    /// Resolves once every task scheduled before this call has run.
    pub async fn barrier(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.schedule_later(Box::new(move || {
            let _ = tx.send(());
        }))?;
        rx.await.map_err(|_| BridgeError::ExecutorClosed)
    }

    /// Stop accepting tasks and wait for already queued tasks to finish.
    ///
    /// Called from the executor thread itself, the loop is told to stop but
    /// is not joined.
    pub fn shutdown(&self) {
        if self.sender.send(Message::Shutdown).is_err() {
            return;
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if thread::current().id() == self.thread_id {
                return;
            }
            if worker.join().is_err() {
                error!("Serial executor thread terminated abnormally");
            }
        }
    }
}

impl SerialExecutor for ThreadSerialExecutor {
    fn is_current_context(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn schedule_later(&self, task: SerialTask) -> Result<()> {
        self.sender
            .send(Message::Run(task))
            .map_err(|_| BridgeError::ExecutorClosed)
    }
}

impl Drop for ThreadSerialExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
