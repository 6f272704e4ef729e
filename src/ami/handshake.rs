//! Manager interface login exchange.
//!
//! Right after the TCP connection opens, the switch writes a banner line
//! (`Asterisk Call Manager/x.y.z`). The client then:
//!
//! 1. writes a `Login` action carrying `Username` and `Secret`;
//! 2. reads lines until `Response: Success` or `Response: Error`;
//! 3. drains the rest of that response block through its blank line so the
//!    stream is positioned at the start of the next response.
//!
//! There is no retry here. The caller decides whether to build a new session.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::ami::action::ActionRequest;
use crate::ami::channel::LineChannel;
use crate::ami::dispatcher::{read_block_rest, ResponseStatus};
use crate::{AppError, Result};

/// Log in over a freshly opened channel.
///
/// # Errors
///
/// - `AppError::Authentication`: the switch answered `Response: Error`.
///   The text carries the switch's response block.
/// - `AppError::Connection`: the stream ended or failed before either
///   response marker arrived.
/// - `AppError::Config`: the username or secret contains a line break;
///   nothing is written.
pub async fn login<S>(channel: &mut LineChannel<S>, username: &str, secret: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = ActionRequest::login(username, secret);
    request
        .validate()
        .map_err(|_| AppError::Config("login credentials must not contain line breaks".into()))?;
    channel.write_block(request.to_lines()).await?;
    debug!(username, "handshake: login sent");

    loop {
        let Some(line) = channel.read_line().await? else {
            return Err(AppError::Connection(
                "stream closed during login handshake".into(),
            ));
        };

        match ResponseStatus::classify(&line) {
            Some(ResponseStatus::Success) => {
                read_block_rest(channel, Vec::new()).await?;
                info!(username, "handshake: authenticated");
                return Ok(());
            }
            Some(ResponseStatus::Error) => {
                let text = read_block_rest(channel, vec![line]).await?;
                warn!(username, "handshake: login rejected");
                return Err(AppError::Authentication(text.join("\n")));
            }
            None => {
                debug!(line = %line, "handshake: skipping line before login response");
            }
        }
    }
}
