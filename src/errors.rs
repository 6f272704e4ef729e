//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Switch unreachable, socket closed unexpectedly, or a read timed out.
    Connection(String),
    /// The switch rejected the login exchange.
    Authentication(String),
    /// Response ended before its terminator or broke the expected grammar.
    Protocol(String),
    /// The switch answered a command with `Response: Error`.
    ///
    /// Carries the accumulated response block text.
    Action(String),
    /// File-system or I/O operation failure outside the AMI session.
    Io(String),
}

impl AppError {
    /// Whether this error leaves the AMI session unusable.
    ///
    /// `Action` errors are local to one command; every other session-level
    /// kind requires the session to be discarded.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Authentication(_) | Self::Protocol(_)
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Connection(msg) => write!(f, "connection: {msg}"),
            Self::Authentication(msg) => write!(f, "authentication: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Action(msg) => write!(f, "action: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

/// Required by the codec traits; raw I/O on the session socket is a
/// connection failure. Local file or bind failures map to `Io` explicitly.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
