//! The generation task state machine.
//!
//! [`TaskController`] owns the single authoritative [`TaskState`]. A
//! submission starts a progress simulator and spawns the executor call; the
//! first terminal signal for the active [`RequestId`] stops the simulator and
//! settles the state. Signals carrying any other id are ignored, so a late
//! response from a superseded or cancelled episode can never overwrite the
//! current one.
//!
//! All transitions go through one short critical section. Every change is
//! published as a [`TaskSnapshot`] on a `watch` channel for the view layer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use deckgen_core::executor::HttpExecutor;
//! use deckgen_core::request::GenerationRequest;
//! use deckgen_core::task::{TaskController, TaskState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = HttpExecutor::new("http://localhost:8000/generate-ppt/")?;
//! let controller = TaskController::new(Arc::new(executor));
//! let id = controller.submit(GenerationRequest::new("Quantum Computing"))?;
//! let snapshot = controller.wait_for_terminal(id).await;
//! if let TaskState::Failed(message) = &snapshot.state {
//!     eprintln!("{message}");
//! }
//! # Ok(())
//! # }
//! ```

mod message;
mod state;

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::artifact::{
    ArtifactError, ArtifactManager, ArtifactReference, SaveTarget, SavedArtifact,
    suggested_filename,
};
use crate::executor::{GenerationOutcome, RequestExecutor};
use crate::progress::{
    self, Phase, ProgressTick, ProgressValue, SimulatorHandle, SimulatorSettings, TickControl,
};
use crate::request::{GenerationRequest, ValidationError};

pub use message::{EMPTY_RESULT_MESSAGE, UNKNOWN_FAILURE_MESSAGE, failure_message};
pub use state::{RequestId, TaskSnapshot, TaskState};

/// Coordinates one generation at a time.
///
/// Must be used from within a Tokio runtime: [`submit`](Self::submit) spawns
/// the simulator and the executor call.
pub struct TaskController {
    executor: Arc<dyn RequestExecutor>,
    settings: SimulatorSettings,
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    updates: watch::Sender<TaskSnapshot>,
}

#[derive(Default)]
struct Inner {
    state: TaskState,
    progress: ProgressValue,
    phase: Phase,
    next_id: u64,
    simulator: Option<SimulatorHandle>,
    in_flight: Option<JoinHandle<()>>,
    artifacts: ArtifactManager,
    /// Request behind the current or last episode; names the download.
    request: Option<GenerationRequest>,
}

impl Inner {
    fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            state: self.state.clone(),
            progress: self.progress,
            phase: self.phase,
        }
    }

    fn stop_simulator(&mut self) {
        if let Some(handle) = self.simulator.take() {
            handle.stop();
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    /// Releases the held artifact, if any. The state itself is left alone.
    fn release_held_artifact(&mut self) -> bool {
        match &self.state {
            TaskState::Succeeded(reference) => self.artifacts.release(reference),
            _ => false,
        }
    }

    fn reset(&mut self, state: TaskState, phase: Phase) {
        self.state = state;
        self.progress = ProgressValue::ZERO;
        self.phase = phase;
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.snapshot());
    }

    fn apply_tick(&self, id: RequestId, tick: ProgressTick) -> TickControl {
        let mut inner = self.lock();
        if !inner.state.is_running_episode(id) {
            return TickControl::Stop;
        }
        if tick.value > inner.progress {
            inner.progress = tick.value;
        }
        inner.phase = tick.phase;
        self.publish(&inner);
        TickControl::Continue
    }

    fn finish(&self, id: RequestId, completion: Result<GenerationOutcome, String>) {
        let mut inner = self.lock();
        if !inner.state.is_running_episode(id) {
            debug!(request_id = %id, "ignoring stale completion");
            return;
        }
        // The completing task is the in-flight one; detach rather than abort.
        inner.in_flight = None;
        inner.stop_simulator();

        match completion {
            Ok(outcome) => {
                let reference = inner.artifacts.materialize(outcome);
                info!(request_id = %id, local = reference.is_local(), "generation succeeded");
                inner.state = TaskState::Succeeded(reference);
                inner.progress = ProgressValue::COMPLETE;
                inner.phase = Phase::Ready;
            }
            Err(message) => {
                warn!(request_id = %id, %message, "generation failed");
                inner.reset(TaskState::Failed(message), Phase::Failed);
            }
        }
        self.publish(&inner);
    }
}

impl TaskController {
    /// Creates a controller with the default simulator settings.
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self::with_settings(executor, SimulatorSettings::default())
    }

    /// Creates a controller with explicit simulator settings.
    #[must_use]
    pub fn with_settings(executor: Arc<dyn RequestExecutor>, settings: SimulatorSettings) -> Self {
        let (updates, _) = watch::channel(TaskSnapshot::default());
        Self {
            executor,
            settings,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                updates,
            }),
        }
    }

    /// Starts a new episode for `request`.
    ///
    /// Any active episode is superseded: its simulator is stopped and its
    /// in-flight call aborted. A held artifact from a previous success is
    /// released.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the request is invalid. Nothing is
    /// sent and the state is left untouched.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn submit(&self, request: GenerationRequest) -> Result<RequestId, ValidationError> {
        request.validate()?;

        let mut inner = self.shared.lock();
        inner.next_id += 1;
        let id = RequestId::new(inner.next_id);

        if let TaskState::Running(previous) = inner.state {
            debug!(request_id = %previous, "superseding active episode");
        }
        inner.stop_simulator();
        inner.abort_in_flight();
        inner.release_held_artifact();

        inner.reset(TaskState::Running(id), Phase::Starting);
        inner.request = Some(request.clone());

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        inner.simulator = Some(progress::start(
            &self.settings,
            self.settings.random_step(),
            move |tick: ProgressTick| match weak.upgrade() {
                Some(shared) => shared.apply_tick(id, tick),
                None => TickControl::Stop,
            },
        ));

        let executor = Arc::clone(&self.executor);
        let shared = Arc::clone(&self.shared);
        inner.in_flight = Some(tokio::spawn(async move {
            let result = AssertUnwindSafe(executor.execute(&request))
                .catch_unwind()
                .await;
            let completion = match result {
                Ok(Ok(outcome)) => Ok(outcome),
                Ok(Err(error)) => {
                    debug!(request_id = %id, error = %error, "executor reported failure");
                    Err(failure_message(&error))
                }
                Err(_) => {
                    warn!(request_id = %id, "executor panicked");
                    Err(UNKNOWN_FAILURE_MESSAGE.to_string())
                }
            };
            shared.finish(id, completion);
        }));

        self.shared.publish(&inner);
        info!(request_id = %id, "generation submitted");
        Ok(id)
    }

    /// Cancels the episode `id`, returning to `Idle`.
    ///
    /// Returns false when `id` is not the running episode.
    pub fn cancel(&self, id: RequestId) -> bool {
        let mut inner = self.shared.lock();
        if !inner.state.is_running_episode(id) {
            return false;
        }
        inner.stop_simulator();
        inner.abort_in_flight();
        inner.reset(TaskState::Idle, Phase::Idle);
        self.shared.publish(&inner);
        info!(request_id = %id, "generation cancelled");
        true
    }

    /// Current state, progress and phase.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receiver of every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Waits until `id` is no longer the running episode and returns the
    /// snapshot at that point.
    ///
    /// For a superseded or cancelled id this returns immediately with
    /// whatever state is current.
    pub async fn wait_for_terminal(&self, id: RequestId) -> TaskSnapshot {
        let mut updates = self.subscribe();
        loop {
            {
                let current = updates.borrow_and_update();
                if !current.state.is_running_episode(id) {
                    return current.clone();
                }
            }
            if updates.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    /// True while a progress simulator is ticking.
    #[must_use]
    pub fn simulator_active(&self) -> bool {
        self.shared
            .lock()
            .simulator
            .as_ref()
            .is_some_and(|handle| !handle.is_stopped())
    }

    /// Name the current artifact would be saved under.
    #[must_use]
    pub fn suggested_filename(&self) -> Option<String> {
        let inner = self.shared.lock();
        let reference = inner.state.artifact()?;
        let topic = inner.request.as_ref().map_or("", GenerationRequest::text);
        Some(suggested_filename(reference.filename_hint().as_deref(), topic))
    }

    /// Hands the current artifact to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::NotAvailable`] unless the state is
    /// `Succeeded`, [`ArtifactError::Released`] if the payload was already
    /// freed, or the save target's own error.
    pub async fn trigger_download(
        &self,
        target: &dyn SaveTarget,
    ) -> Result<SavedArtifact, ArtifactError> {
        let pending = {
            let inner = self.shared.lock();
            let TaskState::Succeeded(reference) = &inner.state else {
                return Err(ArtifactError::NotAvailable);
            };
            let topic = inner.request.as_ref().map_or("", GenerationRequest::text);
            let filename = suggested_filename(reference.filename_hint().as_deref(), topic);
            inner.artifacts.prepare_download(reference, filename)?
        };
        debug!(filename = pending.filename(), "triggering download");
        pending.trigger(target).await
    }

    /// Releases the held artifact and returns to `Idle`.
    ///
    /// Returns false unless the state was `Succeeded`.
    pub fn release_artifact(&self) -> bool {
        let mut inner = self.shared.lock();
        if inner.state.artifact().is_none() {
            return false;
        }
        inner.release_held_artifact();
        inner.reset(TaskState::Idle, Phase::Idle);
        self.shared.publish(&inner);
        debug!("artifact released");
        true
    }

    /// Number of local payloads currently held.
    #[must_use]
    pub fn held_artifacts(&self) -> usize {
        self.shared.lock().artifacts.held_count()
    }

    /// The current artifact reference, if the last episode succeeded.
    #[must_use]
    pub fn artifact(&self) -> Option<ArtifactReference> {
        self.shared.lock().state.artifact().cloned()
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.stop_simulator();
        inner.abort_in_flight();
    }
}
