//! Request/response exchange over a half-duplex manager session.
//!
//! The protocol carries no request identifiers: a response belongs to the
//! most recently written action. [`CommandDispatcher`] therefore takes
//! `&mut self` for the whole write-then-drain sequence, and every exchange
//! reads its response through the final line that belongs to it before
//! returning. Leaving unread lines behind would hand them to the next
//! command.
//!
//! Two response shapes exist:
//!
//! - **plain actions** answer with one block led by `Response: Success` or
//!   `Response: Error` and closed by a blank line;
//! - **list actions** answer `Response: Success`, then a series of `Event:`
//!   blocks decoded by an [`EventBlockParser`], closed by a completion event
//!   or `--END COMMAND--`.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::ami::action::ActionRequest;
use crate::ami::channel::LineChannel;
use crate::ami::parser::{Completion, EventBlockParser, Grammar, Progress};
use crate::{AppError, Result};

/// Status carried by a `Response:` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// `Response: Success` (or `Response: Goodbye` after `Logoff`).
    Success,
    /// `Response: Error`.
    Error,
}

impl ResponseStatus {
    /// Classify a line, returning `None` for anything but a response header.
    #[must_use]
    pub fn classify(line: &str) -> Option<Self> {
        match line.trim_end() {
            "Response: Success" | "Response: Goodbye" => Some(Self::Success),
            "Response: Error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Successful reply to a plain action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Every line read for this action, response header included, up to the
    /// closing blank line.
    pub lines: Vec<String>,
}

impl ActionOutcome {
    /// Value of the first `Message:` header, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| line.strip_prefix("Message:"))
            .map(str::trim)
    }
}

/// Serialises actions over one [`LineChannel`].
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    channel: LineChannel<S>,
}

impl<S> CommandDispatcher<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Take ownership of an authenticated channel.
    #[must_use]
    pub fn new(channel: LineChannel<S>) -> Self {
        Self { channel }
    }

    /// Send a plain action and wait for its `Response:` block.
    ///
    /// # Errors
    ///
    /// - `AppError::Action`: the switch answered `Response: Error`; the text
    ///   is the accumulated response, one line per `\n`. Also returned, with
    ///   nothing written, when a header contains a line break.
    /// - `AppError::Connection`: the stream ended or failed before any
    ///   response header.
    pub async fn send_action(&mut self, request: &ActionRequest) -> Result<ActionOutcome> {
        self.write(request).await?;

        let mut lines = Vec::new();
        loop {
            let Some(line) = self.channel.read_line().await? else {
                return Err(AppError::Connection(format!(
                    "stream closed before response to {}",
                    request.action()
                )));
            };

            match ResponseStatus::classify(&line) {
                Some(ResponseStatus::Success) => {
                    lines.push(line);
                    let lines = read_block_rest(&mut self.channel, lines).await?;
                    debug!(action = request.action(), "dispatcher: action succeeded");
                    return Ok(ActionOutcome { lines });
                }
                Some(ResponseStatus::Error) => {
                    lines.push(line);
                    let lines = read_block_rest(&mut self.channel, lines).await?;
                    warn!(action = request.action(), "dispatcher: action rejected");
                    return Err(AppError::Action(lines.join("\n")));
                }
                // Blank lines left over from the previous block (the one
                // after `--END COMMAND--`) are not part of this response.
                None if line.trim().is_empty() => {}
                None => lines.push(line),
            }
        }
    }

    /// Send a list action and decode its events with `grammar`.
    ///
    /// # Errors
    ///
    /// - `AppError::Action`: the switch answered `Response: Error`, or a
    ///   header contains a line break (nothing is written).
    /// - `AppError::Protocol`: the stream ended before the list's terminator
    ///   or completion event.
    /// - `AppError::Connection`: read or write failure, including timeout.
    pub async fn send_list<R>(
        &mut self,
        request: &ActionRequest,
        grammar: &Grammar<R>,
    ) -> Result<Vec<R>>
    where
        R: Default + 'static,
    {
        self.write(request).await?;

        let mut parser = EventBlockParser::new(grammar);
        loop {
            let Some(line) = self.channel.read_line().await? else {
                return Err(parser.truncated());
            };

            match ResponseStatus::classify(&line) {
                Some(ResponseStatus::Error) => {
                    let lines = read_block_rest(&mut self.channel, vec![line]).await?;
                    warn!(action = request.action(), "dispatcher: list action rejected");
                    return Err(AppError::Action(lines.join("\n")));
                }
                Some(ResponseStatus::Success) => continue,
                None => {}
            }

            match parser.feed(&line) {
                Progress::Continue => {}
                Progress::Complete(Completion::Terminator) => break,
                Progress::Complete(Completion::Event) => {
                    read_block_rest(&mut self.channel, Vec::new()).await?;
                    break;
                }
            }
        }

        let records = parser.into_records();
        debug!(
            action = request.action(),
            count = records.len(),
            "dispatcher: list complete"
        );
        Ok(records)
    }

    /// Shut down the underlying channel.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connection` if the shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    async fn write(&mut self, request: &ActionRequest) -> Result<()> {
        request.validate()?;
        debug!(action = request.action(), "dispatcher: sending action");
        self.channel.write_block(request.to_lines()).await
    }
}

/// Read the remainder of a header block through its closing blank line.
///
/// Lines are appended to `lines`, which is returned. End of stream also ends
/// the block: the response outcome is already known by the time this runs.
///
/// # Errors
///
/// Returns `AppError::Connection` on read failure or timeout.
pub(crate) async fn read_block_rest<S>(
    channel: &mut LineChannel<S>,
    mut lines: Vec<String>,
) -> Result<Vec<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(line) = channel.read_line().await? {
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines)
}
