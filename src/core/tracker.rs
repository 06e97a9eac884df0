//! The job-progress tracking controller: owns the display state, the
//! repeating poll task, cancellation, and startup reconciliation with
//! the server-authoritative job state.

use crate::core::backend::IndexBackend;
use crate::core::events::{EventReceiver, EventSender, TrackerEvent, create_event_channel};
use crate::core::job::{JobStatus, StartJobResponse};
use crate::core::panels::PanelRegistry;
use crate::core::state::{DisplayState, JobOutcome};
use log::{info, warn};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to the repeating poll task. Dropping it aborts the task, so
/// teardown happens on every exit path, including early returns.
struct PollGuard {
    handle: JoinHandle<()>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Tracks one server-side indexing run through the polling protocol.
///
/// Cheap to clone; all clones share the same state, poll task and
/// event channel.
#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    backend: Arc<dyn IndexBackend>,
    panels: PanelRegistry,
    state: Mutex<DisplayState>,
    poll: Mutex<Option<PollGuard>>,
    events: EventSender,
    poll_interval: Duration,
}

impl JobTracker {
    pub fn new(
        backend: Arc<dyn IndexBackend>,
        panels: PanelRegistry,
        poll_interval: Duration,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = create_event_channel();
        let tracker = Self {
            inner: Arc::new(TrackerInner {
                backend,
                panels,
                state: Mutex::new(DisplayState::default()),
                poll: Mutex::new(None),
                events,
                poll_interval,
            }),
        };
        (tracker, receiver)
    }

    /// Snapshot of the current display state.
    pub fn state(&self) -> DisplayState {
        self.inner.state.lock().unwrap().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.state.lock().unwrap().is_polling
    }

    /// One-shot reconciliation with the server, run once at startup.
    ///
    /// A job that was already running before this controller existed is
    /// picked up exactly as if `start` had been called locally; a job
    /// that finished in the meantime is shown in its terminal state
    /// without re-announcing the outcome or re-firing panel refreshes.
    pub async fn recover(&self) {
        let snapshot = match self.inner.backend.job_status().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Startup status query failed: {e}");
                return;
            }
        };

        if snapshot.has_active_job {
            let (percent, active) = {
                let mut state = self.inner.state.lock().unwrap();
                let _ = state.apply(&snapshot);
                if state.status.is_terminal() {
                    (state.percent, false)
                } else {
                    state.is_polling = true;
                    (state.percent, true)
                }
            };
            if !active {
                return;
            }
            if let Some(task_id) = snapshot.task_id.clone() {
                info!("Re-attaching to running indexing job {task_id}");
                self.emit(TrackerEvent::Reattached { task_id, percent }).await;
            }
            self.start_polling();
        } else {
            let mut state = self.inner.state.lock().unwrap();
            let _ = state.apply(&snapshot);
        }
    }

    /// Ask the server for a new run and begin tracking it.
    ///
    /// Rejected with a warning when a run is already tracked; exactly
    /// one poll task exists afterwards in every accepted case.
    pub async fn start(&self) -> io::Result<()> {
        let already_tracked = {
            let mut state = self.inner.state.lock().unwrap();
            if state.task_id.is_some() || state.is_polling {
                true
            } else {
                // In-progress flag; reset if the request fails.
                state.is_polling = true;
                false
            }
        };
        if already_tracked {
            warn!("Start requested while a job is already tracked; ignoring");
            self.emit(TrackerEvent::Warning {
                message: "An indexing job is already being tracked; start ignored".to_string(),
            })
            .await;
            return Ok(());
        }

        match self.inner.backend.start_job().await {
            Ok(StartJobResponse::Started { task_id })
            | Ok(StartJobResponse::AlreadyRunning { task_id }) => {
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.begin(Some(task_id.clone()), JobStatus::Running);
                }
                self.emit(TrackerEvent::Started { task_id }).await;
                self.start_polling();
                Ok(())
            }
            Ok(StartJobResponse::Queued { task_id, position }) => {
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.begin(Some(task_id.clone()), JobStatus::Queued);
                    state.queue_position = Some(position);
                }
                self.emit(TrackerEvent::Queued { task_id, position }).await;
                self.start_polling();
                Ok(())
            }
            Ok(StartJobResponse::Syncing) => {
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.begin(None, JobStatus::Idle);
                    state.operation = "waiting for repository sync".to_string();
                }
                self.emit(TrackerEvent::Syncing).await;
                self.start_polling();
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.is_polling = false;
                }
                self.emit(TrackerEvent::StartFailed {
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    /// Cancel the tracked run.
    ///
    /// With no tracked task this is a no-op that emits one warning and
    /// never calls the cancel endpoint. On success the local state
    /// moves to cancelled immediately, without waiting for the next
    /// poll to confirm it.
    pub async fn cancel(&self) -> io::Result<()> {
        let task_id = { self.inner.state.lock().unwrap().task_id.clone() };
        let task_id = match task_id {
            Some(task_id) => task_id,
            None => {
                self.emit(TrackerEvent::Warning {
                    message: "No indexing job is currently tracked; nothing to cancel"
                        .to_string(),
                })
                .await;
                return Ok(());
            }
        };

        match self.inner.backend.cancel_job(&task_id).await {
            Ok(response) if response.success => {
                let outcome = self.inner.state.lock().unwrap().mark_cancelled();
                if let Some(outcome) = outcome {
                    self.finish_job(outcome).await;
                }
                Ok(())
            }
            Ok(response) => {
                // Job is assumed to still be running; state and polling
                // are left untouched.
                self.emit(TrackerEvent::CancelFailed {
                    message: response.message,
                })
                .await;
                Ok(())
            }
            Err(e) => {
                self.emit(TrackerEvent::CancelFailed {
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    /// Stop the repeating poll task. Idempotent when already stopped.
    pub fn stop_polling(&self) {
        let guard = self.inner.poll.lock().unwrap().take();
        drop(guard);
    }

    fn start_polling(&self) {
        let mut slot = self.inner.poll.lock().unwrap();
        if slot.is_some() {
            // Exactly one poll task per controller.
            return;
        }

        let poll_interval = self.inner.poll_interval;
        // The loop holds only a weak reference, so dropping the last
        // tracker handle tears the task down along with everything else.
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                let inner = match weak.upgrade() {
                    Some(inner) => inner,
                    None => break,
                };
                // Fire-and-forget: a slow response must not delay the
                // next tick, so each query runs in its own task.
                let tracker = JobTracker { inner };
                tokio::spawn(async move {
                    tracker.tick().await;
                });
            }
        });
        *slot = Some(PollGuard { handle });
    }

    async fn tick(&self) {
        let snapshot = match self.inner.backend.job_status().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Transient; the next interval retries.
                warn!("Status poll failed: {e}");
                return;
            }
        };

        let outcome = self.inner.state.lock().unwrap().apply(&snapshot);
        if let Some(outcome) = outcome {
            self.finish_job(outcome).await;
        }
    }

    async fn finish_job(&self, outcome: JobOutcome) {
        self.stop_polling();
        match outcome {
            JobOutcome::Completed { stats } => {
                let refreshed = self.inner.panels.refresh_all().await;
                if refreshed > 0 {
                    info!("Refreshed {refreshed} analytics panel(s) after completion");
                }
                self.emit(TrackerEvent::Completed { stats }).await;
            }
            JobOutcome::Failed { message } => {
                self.emit(TrackerEvent::Failed { message }).await;
            }
            JobOutcome::Cancelled => {
                self.emit(TrackerEvent::Cancelled).await;
            }
        }
    }

    async fn emit(&self, event: TrackerEvent) {
        let _ = self.inner.events.send(event).await;
    }

    #[cfg(test)]
    fn poll_task_active(&self) -> bool {
        self.inner.poll.lock().unwrap().is_some()
    }
}
