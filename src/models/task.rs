//! Per-document processing tasks and progress counters.

use serde::{Deserialize, Serialize};

/// Lifecycle of a vectorization task. `Failed` is re-enterable through the
/// explicit reprocess action, which resets the task to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
}

/// A vectorization task, owned exclusively by the pipeline. At most one task
/// per document id may be in `Processing` system-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingTask {
    pub document_id: String,
    pub state: TaskState,
    pub retry_count: u32,
    /// Human-readable failure message when `state == Failed`.
    pub error: Option<String>,
}

impl ProcessingTask {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            state: TaskState::Pending,
            retry_count: 0,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, TaskState::Completed | TaskState::Failed)
    }
}

/// Progress counters exposed for UI polling. Reset when a fresh batch of
/// eligible documents arrives at an idle pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
}

impl ProcessingProgress {
    pub fn is_done(&self) -> bool {
        self.processed + self.failed >= self.total
    }
}
