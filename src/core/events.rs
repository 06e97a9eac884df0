//! User-facing notifications for job lifecycle transitions.
//!
//! One event per distinct transition (start, queue, completion,
//! failure, cancel), never one per poll tick.

use crate::core::state::StatTotals;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Started {
        task_id: String,
    },
    Queued {
        task_id: String,
        position: u32,
    },
    Syncing,
    /// Emitted when recovery attaches to a job that was already running
    /// before this controller existed.
    Reattached {
        task_id: String,
        percent: u8,
    },
    Completed {
        stats: StatTotals,
    },
    Failed {
        message: String,
    },
    Cancelled,
    StartFailed {
        message: String,
    },
    CancelFailed {
        message: String,
    },
    Warning {
        message: String,
    },
}

impl TrackerEvent {
    /// True for events after which no further progress will arrive.
    pub fn ends_watch(&self) -> bool {
        matches!(
            self,
            TrackerEvent::Completed { .. }
                | TrackerEvent::Failed { .. }
                | TrackerEvent::Cancelled
                | TrackerEvent::StartFailed { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            TrackerEvent::Started { task_id } => format!("Indexing job {task_id} started"),
            TrackerEvent::Queued { task_id, position } => {
                format!("Indexing job {task_id} queued (position {position})")
            }
            TrackerEvent::Syncing => {
                "Repository sync in progress, indexing will start once it finishes".to_string()
            }
            TrackerEvent::Reattached { task_id, percent } => {
                format!("Re-attached to running indexing job {task_id} at {percent}%")
            }
            TrackerEvent::Completed { stats } => format!(
                "Indexing completed: {} files scanned, {} items stored",
                stats.files_scanned, stats.items_stored
            ),
            TrackerEvent::Failed { message } => format!("Indexing failed: {message}"),
            TrackerEvent::Cancelled => "Indexing job cancelled".to_string(),
            TrackerEvent::StartFailed { message } => {
                format!("Failed to start indexing: {message}")
            }
            TrackerEvent::CancelFailed { message } => {
                format!("Failed to cancel indexing: {message}")
            }
            TrackerEvent::Warning { message } => message.clone(),
        }
    }
}

pub type EventSender = mpsc::Sender<TrackerEvent>;
pub type EventReceiver = mpsc::Receiver<TrackerEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(100) // Buffer of 100 is plenty for transition events
}
