//! Designated UI-thread executor.
//!
//! Some platform state may only be touched from the thread that owns the UI.
//! [`UiThread`] makes that thread explicit: the state `S` is only ever read or
//! written there, and other threads reach it by submitting a task with
//! [`UiThread::run_sync`], which blocks until the task has run. Calls made on
//! the UI thread itself, including from inside another task, run inline.
//!
//! Each task works on a copy of the state that is stored back when the task
//! returns, so no borrow is held while user code runs. A nested call sees the
//! state as of before the enclosing task, and the enclosing task's write
//! lands last.
//!
//! Without a timeout the wait is unbounded. If the UI thread is itself
//! blocked on the caller, that is a deadlock; hosts that cannot rule this out
//! should configure a timeout. A task whose caller timed out stays queued:
//! when the UI thread reaches it, it is skipped rather than run. A UI thread
//! that stays stuck still accumulates one queued entry per timed-out call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use thiserror::Error;

use crate::types::ActivityState;

/// Errors from a UI-thread rendezvous.
#[derive(Debug, Error)]
pub enum UiThreadError {
    /// The UI thread did not answer within the configured timeout.
    #[error("UI thread did not respond within {0:?}")]
    Timeout(Duration),

    /// The UI thread has shut down or dropped the task.
    #[error("UI thread is no longer running")]
    Disconnected,

    /// The worker thread could not be started.
    #[error("failed to spawn UI thread: {0}")]
    Spawn(#[source] std::io::Error),
}

type UiTask = Box<dyn FnOnce() + Send + 'static>;

enum UiCommand {
    Run(UiTask),
    Shutdown,
}

/// Handle to a dedicated thread owning UI-side state `S`.
pub struct UiThread<S> {
    state: Arc<Mutex<S>>,
    sender: mpsc::Sender<UiCommand>,
    thread_id: ThreadId,
    worker: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

impl<S: Clone + Send + 'static> UiThread<S> {
    /// Spawns the UI thread and hands `state` to it.
    ///
    /// `timeout` bounds how long [`run_sync`](Self::run_sync) waits; `None`
    /// waits forever.
    pub fn spawn(name: &str, state: S, timeout: Option<Duration>) -> Result<Self, UiThreadError> {
        let (sender, receiver) = mpsc::channel::<UiCommand>();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        UiCommand::Run(task) => task(),
                        UiCommand::Shutdown => break,
                    }
                }
                tracing::debug!("UI thread shutting down");
            })
            .map_err(UiThreadError::Spawn)?;

        let thread_id = worker.thread().id();
        tracing::debug!(thread = name, ?timeout, "UI thread started");

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            sender,
            thread_id,
            worker: Some(worker),
            timeout,
        })
    }

    /// Whether the calling thread is the UI thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Runs `task` on the UI thread and returns its result.
    ///
    /// On the UI thread the task runs inline. From any other thread it is
    /// queued and the caller blocks until it has run.
    pub fn run_sync<F, T>(&self, task: F) -> Result<T, UiThreadError>
    where
        F: FnOnce(&mut S) -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(with_state(&self.state, task));
        }

        let state = Arc::clone(&self.state);
        let abandoned = Arc::new(AtomicBool::new(false));
        let skip = Arc::clone(&abandoned);
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let command = UiCommand::Run(Box::new(move || {
            if skip.load(Ordering::Acquire) {
                tracing::debug!("skipping UI task abandoned by its caller");
                return;
            }
            if reply_tx.send(with_state(&state, task)).is_err() {
                tracing::debug!("UI task caller stopped waiting before the result arrived");
            }
        }));

        self.sender
            .send(command)
            .map_err(|_| UiThreadError::Disconnected)?;

        match self.timeout {
            None => reply_rx.recv().map_err(|_| UiThreadError::Disconnected),
            Some(timeout) => reply_rx.recv_timeout(timeout).map_err(|err| match err {
                mpsc::RecvTimeoutError::Timeout => {
                    abandoned.store(true, Ordering::Release);
                    UiThreadError::Timeout(timeout)
                }
                mpsc::RecvTimeoutError::Disconnected => UiThreadError::Disconnected,
            }),
        }
    }
}

/// Runs `task` against a copy of the state and stores the copy back.
fn with_state<S: Clone, T>(state: &Mutex<S>, task: impl FnOnce(&mut S) -> T) -> T {
    let mut working = lock(state).clone();
    let result = task(&mut working);
    *lock(state) = working;
    result
}

fn lock<S>(state: &Mutex<S>) -> MutexGuard<'_, S> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S> Drop for UiThread<S> {
    fn drop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        if self.sender.send(UiCommand::Shutdown).is_err() {
            return;
        }
        // Joining from the UI thread itself would never return.
        if thread::current().id() == self.thread_id {
            return;
        }
        if let Err(err) = handle.join() {
            tracing::error!(?err, "UI thread panicked");
        }
    }
}

/// Application lifecycle state as seen by the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationLifecycle {
    state: ActivityState,
}

impl ApplicationLifecycle {
    pub const fn new(state: ActivityState) -> Self {
        Self { state }
    }

    pub const fn state(&self) -> ActivityState {
        self.state
    }

    pub fn set_state(&mut self, state: ActivityState) {
        self.state = state;
    }
}

impl Default for ApplicationLifecycle {
    fn default() -> Self {
        Self::new(ActivityState::Active)
    }
}
