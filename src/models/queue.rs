//! Per-queue statistics reported by `QueueStatus`.

use serde::{Deserialize, Serialize};

/// Snapshot of one call queue, built from an `Event: QueueParams` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct QueueSnapshot {
    /// Queue name.
    pub name: String,
    /// Calls currently waiting.
    pub calls: u64,
    /// Calls answered since the queue statistics were reset.
    pub completed: u64,
    /// Calls abandoned by the caller while waiting.
    pub abandoned: u64,
    /// Percentage of calls answered within the queue's service level.
    pub service_level: f64,
}
