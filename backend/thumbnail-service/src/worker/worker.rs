use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::PoolTask;

/// Lifecycle of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Armed, waiting for the next tick
    Idle = 0,
    /// Executing the task
    Running = 1,
    /// Cancellation observed, loop is exiting
    Stopping = 2,
    /// Loop has exited
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

/// Loop state plus the worker's cancellation token
///
/// A worker whose token is cancelled reports `Stopping` until the loop has
/// exited, including while a running task is being finished.
#[derive(Clone)]
pub(super) struct SharedState {
    raw: Arc<AtomicU8>,
    cancel: CancellationToken,
}

impl SharedState {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            raw: Arc::new(AtomicU8::new(WorkerState::Idle as u8)),
            cancel,
        }
    }

    fn set(&self, state: WorkerState) {
        self.raw.store(state as u8, Ordering::SeqCst);
    }

    pub(super) fn get(&self) -> WorkerState {
        match WorkerState::from_u8(self.raw.load(Ordering::SeqCst)) {
            WorkerState::Stopped => WorkerState::Stopped,
            _ if self.cancel.is_cancelled() => WorkerState::Stopping,
            state => state,
        }
    }
}

/// A polling loop bound to one shared task
///
/// The first tick fires one interval after start. Ticks that fire while the
/// task is still running are coalesced, so at most one invocation is queued
/// behind the current one and invocations never overlap.
pub struct Worker {
    id: usize,
    state: SharedState,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker loop on the current tokio runtime
    pub fn start(
        id: usize,
        task: Arc<dyn PoolTask>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let state = SharedState::new(cancel.clone());

        let handle = tokio::spawn(run_loop(
            id,
            task,
            interval,
            cancel.clone(),
            state.clone(),
        ));

        Self {
            id,
            state,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    pub(super) fn state_handle(&self) -> SharedState {
        self.state.clone()
    }

    /// Post the cancellation signal
    ///
    /// Observed at the next loop boundary; a running task is never
    /// interrupted. Use `join` to wait for the worker to stop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait until the loop has exited
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(worker_id = self.id, error = %e, "Worker task terminated abnormally");
                self.state.set(WorkerState::Stopped);
            }
        }
    }
}

async fn run_loop(
    id: usize,
    task: Arc<dyn PoolTask>,
    period: Duration,
    cancel: CancellationToken,
    state: SharedState,
) {
    info!(worker_id = id, "Worker started");

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                state.set(WorkerState::Running);
                task.run().await;
                state.set(WorkerState::Idle);
            }
        }
    }

    debug!(worker_id = id, "Worker loop exited");
    state.set(WorkerState::Stopped);
    info!(worker_id = id, "Worker stopped");
}
