//! Request and response bodies exchanged with the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ami::action::{AgentAction, AgentActionCommand};
use crate::models::channel::ChannelRecord;
use crate::models::queue::QueueSnapshot;

/// Format used for [`RealtimeSnapshot::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Live queue and channel state captured at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RealtimeSnapshot {
    /// One entry per queue.
    pub queues: Vec<QueueSnapshot>,
    /// One entry per active channel.
    pub calls: Vec<ChannelRecord>,
    /// Capture time, UTC, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
}

impl RealtimeSnapshot {
    /// Assemble a snapshot stamped with `at`.
    #[must_use]
    pub fn new(queues: Vec<QueueSnapshot>, calls: Vec<ChannelRecord>, at: DateTime<Utc>) -> Self {
        Self {
            queues,
            calls,
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Body of `POST /realtime/action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentActionRequest {
    /// Operation to apply.
    pub action: AgentAction,
    /// Agent interface.
    pub agent: String,
    /// Optional queue scope.
    #[serde(default)]
    pub queue: Option<String>,
}

impl From<AgentActionRequest> for AgentActionCommand {
    fn from(req: AgentActionRequest) -> Self {
        Self::new(req.action, req.agent, req.queue)
    }
}

/// Result of an agent action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentActionResponse {
    /// Whether the switch acknowledged the action.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
}
