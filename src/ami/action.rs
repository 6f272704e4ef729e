//! Outbound action blocks.
//!
//! An [`ActionRequest`] is an ordered list of `Key: Value` headers led by an
//! `Action` header. It serialises to one CRLF line per header followed by the
//! blank line that closes the block.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Immutable, ordered action block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    headers: Vec<(String, String)>,
}

impl ActionRequest {
    /// Start a request for the named action.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            headers: vec![("Action".to_owned(), action.into())],
        }
    }

    /// Append a header, preserving caller order.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Append a header only when `value` is present.
    #[must_use]
    pub fn optional_header(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.header(key, value),
            None => self,
        }
    }

    /// Value of the `Action` header.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.headers[0].1
    }

    /// All headers in wire order, `Action` first.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Check that every header fits on one wire line.
    ///
    /// A key or value carrying `\r` or `\n` would end the block early and
    /// smuggle further headers or whole actions onto the wire. Only the key is
    /// named in the error so secrets stay out of logs.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Action` naming the first offending header.
    pub fn validate(&self) -> Result<()> {
        let has_break = |text: &str| text.contains(['\r', '\n']);
        match self
            .headers()
            .iter()
            .find(|(key, value)| has_break(key.as_str()) || has_break(value.as_str()))
        {
            Some((key, _)) => Err(AppError::Action(format!(
                "{:?} header {key:?} contains a line break",
                self.action()
            ))),
            None => Ok(()),
        }
    }

    /// Wire lines without terminators: one per header, then an empty line.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .chain(std::iter::once(String::new()))
            .collect()
    }

    /// `Login` carrying the manager credentials.
    ///
    /// `Events: off` keeps unsolicited events out of the command stream.
    #[must_use]
    pub fn login(username: &str, secret: &str) -> Self {
        Self::new("Login")
            .header("Username", username)
            .header("Secret", secret)
            .header("Events", "off")
    }

    /// `QueueStatus` listing every queue.
    #[must_use]
    pub fn queue_status() -> Self {
        Self::new("QueueStatus")
    }

    /// `CoreShowChannels` listing active channels.
    #[must_use]
    pub fn core_show_channels() -> Self {
        Self::new("CoreShowChannels")
    }

    /// `Logoff` ending the session.
    #[must_use]
    pub fn logoff() -> Self {
        Self::new("Logoff")
    }
}

impl fmt::Display for ActionRequest {
    /// Renders the exact wire bytes, including the closing blank line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            write!(f, "{line}\r\n")?;
        }
        Ok(())
    }
}

/// Queue membership operation applied to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    /// Stop offering queue calls to the agent.
    Pause,
    /// Resume offering queue calls to the agent.
    Unpause,
    /// Remove the agent from the queue.
    Remove,
}

impl AgentAction {
    /// Lowercase name as accepted by the HTTP boundary and CLI.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Remove => "remove",
        }
    }
}

impl std::str::FromStr for AgentAction {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pause" => Ok(Self::Pause),
            "unpause" => Ok(Self::Unpause),
            "remove" => Ok(Self::Remove),
            other => Err(AppError::Action(format!("invalid agent action: {other}"))),
        }
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent operation targeting one interface, optionally scoped to a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentActionCommand {
    /// Operation to perform.
    pub action: AgentAction,
    /// Agent interface, e.g. `Agent/1001` or `SIP/1001`.
    pub interface: String,
    /// Queue to scope the operation to; all queues when absent.
    pub queue: Option<String>,
}

impl AgentActionCommand {
    /// Build a command, treating an empty queue name as "no queue".
    #[must_use]
    pub fn new(action: AgentAction, interface: impl Into<String>, queue: Option<String>) -> Self {
        Self {
            action,
            interface: interface.into(),
            queue: queue.filter(|q| !q.is_empty()),
        }
    }

    /// Translate into the `QueuePause` / `QueueRemove` action block.
    ///
    /// Header order is `Interface`, then `Queue` when present, then `Paused`
    /// for the pause variants.
    #[must_use]
    pub fn to_request(&self) -> ActionRequest {
        let name = match self.action {
            AgentAction::Pause | AgentAction::Unpause => "QueuePause",
            AgentAction::Remove => "QueueRemove",
        };

        let request = ActionRequest::new(name)
            .header("Interface", self.interface.as_str())
            .optional_header("Queue", self.queue.as_deref());

        match self.action {
            AgentAction::Pause => request.header("Paused", "true"),
            AgentAction::Unpause => request.header("Paused", "false"),
            AgentAction::Remove => request,
        }
    }
}
