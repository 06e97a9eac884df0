use serde::{Deserialize, Serialize};

/// Lifecycle status of a server-side indexing run.
///
/// `idle → queued → running → {completed | failed | cancelled} → idle`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn display_name(&self) -> &str {
        match self {
            JobStatus::Idle => "Idle",
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

/// Status of a single named stage within a run. Transitions only move
/// forward: pending → running → completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
}

impl PhaseStatus {
    pub fn marker(&self) -> &str {
        match self {
            PhaseStatus::Pending => " ",
            PhaseStatus::Running => "~",
            PhaseStatus::Completed => "x",
        }
    }
}

/// An ordered, named stage of a run (e.g. "scanning", "storing").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPhase {
    pub id: String,
    pub name: String,
    pub status: PhaseStatus,
}

/// Fine-grained progress numbers. Every field is optional because the
/// server may report only a subset of them on any given tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressDetail {
    #[serde(default)]
    pub percent: Option<u8>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub current: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Batch counters within the currently running phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    #[serde(default)]
    pub total_batches: Option<u64>,
    #[serde(default)]
    pub completed_batches: Option<u64>,
}

/// Cumulative counters reported by the indexer, all optional for the
/// same partial-report reason as `ProgressDetail`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(default)]
    pub files_scanned: Option<u64>,
    #[serde(default)]
    pub problems_found: Option<u64>,
    #[serde(default)]
    pub functions_found: Option<u64>,
    #[serde(default)]
    pub classes_found: Option<u64>,
    #[serde(default)]
    pub items_stored: Option<u64>,
}

/// The server's view of the job at one poll instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default)]
    pub has_active_job: bool,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub progress: Option<ProgressDetail>,
    #[serde(default)]
    pub phases: Option<Vec<JobPhase>>,
    #[serde(default)]
    pub batches: Option<BatchProgress>,
    #[serde(default)]
    pub stats: Option<IndexStats>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of the start endpoint. The `status` discriminator carries
/// the four cases the server can answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartJobResponse {
    Started { task_id: String },
    AlreadyRunning { task_id: String },
    Queued { task_id: String, position: u32 },
    Syncing,
}

/// Response of the cancel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
