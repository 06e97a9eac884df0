//! Local display state for a tracked indexing job and the reducer that
//! merges server snapshots into it.

use crate::core::job::{JobPhase, JobSnapshot, JobStatus};

/// Cumulative counters with the gaps filled in, suitable for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatTotals {
    pub files_scanned: u64,
    pub problems_found: u64,
    pub functions_found: u64,
    pub classes_found: u64,
    pub items_stored: u64,
}

/// Terminal result of a run, produced exactly once per job by the
/// reducer when it first observes a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { stats: StatTotals },
    Failed { message: String },
    Cancelled,
}

/// The controller's view of the job. Unlike a `JobSnapshot` it survives
/// gaps: a field absent from an incoming snapshot keeps its last known
/// value here.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub task_id: Option<String>,
    pub status: JobStatus,
    pub percent: u8,
    pub operation: String,
    pub current_file: String,
    pub current: u64,
    pub total: u64,
    pub phases: Vec<JobPhase>,
    pub total_batches: u64,
    pub completed_batches: u64,
    pub stats: StatTotals,
    pub error: Option<String>,
    pub queue_position: Option<u32>,
    pub is_polling: bool,
    /// Task that most recently reached a terminal state locally. Late
    /// in-flight reports for it must not resurrect the job.
    finished_task: Option<String>,
}

impl DisplayState {
    /// Merge a server snapshot into the display state.
    ///
    /// Returns the job outcome on the snapshot that first moves the
    /// state to a terminal status, `None` on every other call.
    pub fn apply(&mut self, snapshot: &JobSnapshot) -> Option<JobOutcome> {
        if self.is_stale(snapshot) {
            return None;
        }

        if let Some(incoming) = &snapshot.task_id {
            let tracked = self.task_id.as_deref() == Some(incoming.as_str());
            if !tracked {
                // The server is authoritative: a task we were not
                // tracking replaces whatever progress we held.
                self.reset_progress();
                self.task_id = Some(incoming.clone());
            }
        }

        let was_terminal = self.status.is_terminal();

        if let Some(status) = snapshot.status {
            self.status = status;
            if status != JobStatus::Queued {
                self.queue_position = None;
            }
        }

        if let Some(progress) = &snapshot.progress {
            if let Some(percent) = progress.percent {
                // Monotonic while the task runs; a lower value means an
                // out-of-order response, not a regression.
                if percent > self.percent {
                    self.percent = percent.min(100);
                }
            }
            if let Some(operation) = &progress.operation {
                self.operation = operation.clone();
            }
            if let Some(current_file) = &progress.current_file {
                self.current_file = current_file.clone();
            }
            if let Some(current) = progress.current {
                self.current = current;
            }
            if let Some(total) = progress.total {
                self.total = total;
            }
        }

        if let Some(phases) = &snapshot.phases {
            self.merge_phases(phases);
        }

        if let Some(batches) = &snapshot.batches {
            if let Some(total_batches) = batches.total_batches {
                self.total_batches = total_batches;
            }
            if let Some(completed_batches) = batches.completed_batches {
                self.completed_batches = completed_batches;
            }
        }

        if let Some(stats) = &snapshot.stats {
            if let Some(files_scanned) = stats.files_scanned {
                self.stats.files_scanned = files_scanned;
            }
            if let Some(problems_found) = stats.problems_found {
                self.stats.problems_found = problems_found;
            }
            if let Some(functions_found) = stats.functions_found {
                self.stats.functions_found = functions_found;
            }
            if let Some(classes_found) = stats.classes_found {
                self.stats.classes_found = classes_found;
            }
            if let Some(items_stored) = stats.items_stored {
                self.stats.items_stored = items_stored;
            }
        }

        if let Some(error) = &snapshot.error {
            self.error = Some(error.clone());
        }

        if was_terminal {
            return None;
        }
        self.finish()
    }

    /// Optimistic local transition after a successful cancel request,
    /// applied without waiting for the next poll.
    pub fn mark_cancelled(&mut self) -> Option<JobOutcome> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = JobStatus::Cancelled;
        self.finish()
    }

    /// Begin tracking a run accepted by the start endpoint.
    pub fn begin(&mut self, task_id: Option<String>, status: JobStatus) {
        self.reset_progress();
        self.task_id = task_id;
        self.status = status;
        self.is_polling = true;
    }

    /// One line describing what the job is doing right now. Prefers the
    /// current file with its counts over the bare operation name.
    pub fn status_line(&self) -> String {
        if self.status.is_terminal() {
            return match &self.error {
                Some(error) if self.status == JobStatus::Failed => format!("Failed: {error}"),
                _ => self.status.display_name().to_string(),
            };
        }
        if self.status == JobStatus::Queued {
            return match self.queue_position {
                Some(position) => format!("Queued (position {position})"),
                None => "Queued".to_string(),
            };
        }
        if !self.current_file.is_empty() && self.total > 0 {
            format!("{} ({}/{})", self.current_file, self.current, self.total)
        } else if !self.operation.is_empty() {
            self.operation.clone()
        } else {
            self.status.display_name().to_string()
        }
    }

    /// True when a snapshot reports a task that already reached a
    /// terminal outcome locally. Resolves the race between an
    /// optimistic cancel and an in-flight poll response, and keeps a
    /// late terminal re-report from producing a second outcome.
    fn is_stale(&self, snapshot: &JobSnapshot) -> bool {
        match (&snapshot.task_id, &self.finished_task) {
            (Some(incoming), Some(finished)) => incoming == finished,
            _ => false,
        }
    }

    fn finish(&mut self) -> Option<JobOutcome> {
        let outcome = match self.status {
            JobStatus::Completed => {
                self.percent = 100;
                JobOutcome::Completed { stats: self.stats }
            }
            JobStatus::Failed => JobOutcome::Failed {
                message: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "indexing job failed".to_string()),
            },
            JobStatus::Cancelled => JobOutcome::Cancelled,
            JobStatus::Idle | JobStatus::Queued | JobStatus::Running => return None,
        };
        self.is_polling = false;
        self.queue_position = None;
        // Release the task id for the next start; remember it for the
        // stale-overwrite guard.
        self.finished_task = self.task_id.take();
        Some(outcome)
    }

    fn merge_phases(&mut self, incoming: &[JobPhase]) {
        for phase in incoming {
            match self.phases.iter_mut().find(|known| known.id == phase.id) {
                Some(known) => {
                    // Forward-only: pending → running → completed.
                    if phase.status > known.status {
                        known.status = phase.status;
                    }
                    if !phase.name.is_empty() {
                        known.name = phase.name.clone();
                    }
                }
                None => self.phases.push(phase.clone()),
            }
        }
    }

    fn reset_progress(&mut self) {
        self.task_id = None;
        self.status = JobStatus::Idle;
        self.percent = 0;
        self.operation.clear();
        self.current_file.clear();
        self.current = 0;
        self.total = 0;
        self.phases.clear();
        self.total_batches = 0;
        self.completed_batches = 0;
        self.stats = StatTotals::default();
        self.error = None;
        self.queue_position = None;
    }
}
