//! Authenticated manager session and its public operations.
//!
//! Lifecycle:
//!
//! ```text
//! Disconnected --connect+login ok--> Ready --close()--> Closed
//!       |                              |
//!       +--login/connect failure--> Closed <--fatal error--+
//! ```
//!
//! No transition leaves `Closed`; callers build a new session instead.
//!
//! Every operation holds the session mutex from the first byte written to the
//! last byte of the response read. A command whose future is dropped while it
//! holds the lock leaves an in-flight marker behind; the next caller finds it,
//! discards the session, and fails with [`AppError::Connection`], since the
//! unread remainder of the abandoned response can no longer be bounded.
//!
//! Teardown is explicit: call [`AmiSession::close`] (or use
//! [`with_session`]) on every exit path. Dropping a ready session closes the
//! socket without sending `Logoff`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::ami::action::{ActionRequest, AgentActionCommand};
use crate::ami::channel::LineChannel;
use crate::ami::dispatcher::{ActionOutcome, CommandDispatcher};
use crate::ami::handshake;
use crate::ami::parser::{Grammar, CORE_SHOW_CHANNELS, QUEUE_STATUS};
use crate::config::{AmiConfig, TimeoutConfig};
use crate::models::channel::ChannelRecord;
use crate::models::queue::QueueSnapshot;
use crate::models::realtime::RealtimeSnapshot;
use crate::{AppError, Result};

/// Lifecycle state of an [`AmiSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection yet.
    Disconnected,
    /// Login in progress.
    Authenticating,
    /// Authenticated and accepting commands.
    Ready,
    /// Logged off, failed, or discarded. Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct Inner<S> {
    state: SessionState,
    dispatcher: Option<CommandDispatcher<S>>,
    in_flight: bool,
}

impl<S> Inner<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn discard(&mut self, reason: &str) {
        if self.state != SessionState::Closed {
            warn!(reason, "ami session discarded");
        }
        self.state = SessionState::Closed;
        self.dispatcher = None;
        self.in_flight = false;
    }

    async fn action(&mut self, request: &ActionRequest) -> Result<ActionOutcome> {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return Err(no_channel());
        };
        self.in_flight = true;
        let result = dispatcher.send_action(request).await;
        self.in_flight = false;
        self.settle(result)
    }

    async fn list<R>(&mut self, request: &ActionRequest, grammar: &Grammar<R>) -> Result<Vec<R>>
    where
        R: Default + 'static,
    {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return Err(no_channel());
        };
        self.in_flight = true;
        let result = dispatcher.send_list(request, grammar).await;
        self.in_flight = false;
        self.settle(result)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref err) = result {
            if err.is_session_fatal() {
                self.discard(&err.to_string());
            }
        }
        result
    }
}

fn no_channel() -> AppError {
    AppError::Connection("session has no open channel".into())
}

/// One authenticated manager connection.
///
/// All methods take `&self`; the internal mutex serialises commands, so the
/// session may be shared behind an [`Arc`]. For many concurrent callers
/// prefer a [`crate::ami::worker::AmiHandle`], which queues commands for a
/// single long-lived session.
pub struct AmiSession<S = TcpStream> {
    inner: Mutex<Inner<S>>,
}

impl<S> fmt::Debug for AmiSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmiSession").finish_non_exhaustive()
    }
}

impl AmiSession<TcpStream> {
    /// Open a TCP connection to the switch and log in.
    ///
    /// # Errors
    ///
    /// - `AppError::Config`: a required connection setting is missing; no
    ///   socket is opened.
    /// - `AppError::Connection`: the switch is unreachable, the connect
    ///   timed out, or the stream closed during login.
    /// - `AppError::Authentication`: the switch rejected the credentials.
    pub async fn connect(config: &AmiConfig, timeouts: &TimeoutConfig) -> Result<Self> {
        config.ensure_complete()?;
        let address = config.address();

        let stream = tokio::time::timeout(timeouts.connect(), TcpStream::connect(&address))
            .await
            .map_err(|_| {
                AppError::Connection(format!(
                    "connect to {address} timed out after {:?}",
                    timeouts.connect()
                ))
            })?
            .map_err(|err| AppError::Connection(format!("connect to {address} failed: {err}")))?;

        if let Err(err) = stream.set_nodelay(true) {
            debug!(%err, "ami session: failed to set TCP_NODELAY");
        }

        Self::establish(stream, &config.username, &config.secret, timeouts.read())
            .instrument(info_span!("ami_login", %address))
            .await
    }
}

impl<S> AmiSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Log in over an already connected stream.
    ///
    /// # Errors
    ///
    /// - `AppError::Authentication`: `Response: Error` to the login.
    /// - `AppError::Connection`: the stream failed or closed first.
    pub async fn establish(
        stream: S,
        username: &str,
        secret: &str,
        read_timeout: Duration,
    ) -> Result<Self> {
        let mut state = SessionState::Disconnected;
        let mut channel = LineChannel::new(stream, read_timeout);

        debug!(from = %state, to = %SessionState::Authenticating, "ami session: transition");
        state = SessionState::Authenticating;

        if let Err(err) = handshake::login(&mut channel, username, secret).await {
            // Best effort; the socket is dropped either way.
            let _ = channel.close().await;
            debug!(from = %state, to = %SessionState::Closed, %err, "ami session: transition");
            return Err(err);
        }

        info!(from = %state, to = %SessionState::Ready, "ami session: transition");
        Ok(Self {
            inner: Mutex::new(Inner {
                state: SessionState::Ready,
                dispatcher: Some(CommandDispatcher::new(channel)),
                in_flight: false,
            }),
        })
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Statistics for every queue (`QueueStatus`).
    ///
    /// # Errors
    ///
    /// - `AppError::Action`: the switch refused the action; session stays ready.
    /// - `AppError::Protocol`: the listing was truncated; session closed.
    /// - `AppError::Connection`: session not ready or stream failure.
    pub async fn get_queue_status(&self) -> Result<Vec<QueueSnapshot>> {
        let mut inner = self.acquire().await?;
        inner
            .list(&ActionRequest::queue_status(), &QUEUE_STATUS)
            .instrument(info_span!("queue_status"))
            .await
    }

    /// Active channels (`CoreShowChannels`).
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_queue_status`].
    pub async fn get_current_calls(&self) -> Result<Vec<ChannelRecord>> {
        let mut inner = self.acquire().await?;
        inner
            .list(&ActionRequest::core_show_channels(), &CORE_SHOW_CHANNELS)
            .instrument(info_span!("current_calls"))
            .await
    }

    /// Queues and channels in one snapshot, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_queue_status`].
    pub async fn snapshot(&self) -> Result<RealtimeSnapshot> {
        let queues = self.get_queue_status().await?;
        let calls = self.get_current_calls().await?;
        Ok(RealtimeSnapshot::new(queues, calls, Utc::now()))
    }

    /// Pause, unpause, or remove an agent.
    ///
    /// Returns `true` once the switch acknowledges the action. A stream that
    /// ends before any response is an error, not `false`: the outcome of the
    /// action is unknown.
    ///
    /// # Errors
    ///
    /// - `AppError::Action`: the switch answered `Response: Error`; the
    ///   session stays ready.
    /// - `AppError::Connection`: session not ready or stream failure.
    pub async fn perform_agent_action(&self, command: &AgentActionCommand) -> Result<bool> {
        let request = command.to_request();
        let span = info_span!(
            "agent_action",
            action = %command.action,
            interface = %command.interface,
            queue = command.queue.as_deref().unwrap_or("")
        );

        let mut inner = self.acquire().await?;
        let outcome = inner.action(&request).instrument(span).await?;
        info!(
            action = %command.action,
            interface = %command.interface,
            message = outcome.message().unwrap_or(""),
            "agent action acknowledged"
        );
        Ok(true)
    }

    /// Log off and close the connection.
    ///
    /// `Logoff` is sent only from `Ready` and its outcome is ignored.
    /// Idempotent: later calls do nothing.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Closed {
            debug!("ami session: close on closed session ignored");
            return;
        }

        let send_logoff = inner.state == SessionState::Ready && !inner.in_flight;
        let dispatcher = inner.dispatcher.take();
        // Closed before any await: a dropped `close` future must not leave a
        // ready session with no channel behind it.
        inner.state = SessionState::Closed;
        inner.in_flight = false;

        if let Some(mut dispatcher) = dispatcher {
            if send_logoff {
                match dispatcher.send_action(&ActionRequest::logoff()).await {
                    Ok(_) => debug!("ami session: logoff acknowledged"),
                    Err(err) => debug!(%err, "ami session: logoff failed, closing anyway"),
                }
            }
            if let Err(err) = dispatcher.close().await {
                debug!(%err, "ami session: channel shutdown failed");
            }
        }

        info!("ami session closed");
    }

    async fn acquire(&self) -> Result<MutexGuard<'_, Inner<S>>> {
        let mut inner = self.inner.lock().await;

        if inner.in_flight {
            inner.discard("previous command abandoned mid-response");
            return Err(AppError::Connection(
                "previous command was abandoned mid-response; session discarded".into(),
            ));
        }

        if inner.state != SessionState::Ready {
            return Err(AppError::Connection(format!(
                "session is {}, not ready",
                inner.state
            )));
        }

        Ok(inner)
    }
}

impl<S> Drop for AmiSession<S> {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.try_lock() {
            if inner.state == SessionState::Ready {
                warn!("ami session dropped while ready; no logoff was sent");
            }
        }
    }
}

/// Run `f` against a fresh session and close it afterwards.
///
/// The session is closed whether `f` succeeds or fails.
///
/// # Errors
///
/// Returns the connection error from [`AmiSession::connect`], or whatever
/// `f` returns.
pub async fn with_session<T, F, Fut>(config: &AmiConfig, timeouts: &TimeoutConfig, f: F) -> Result<T>
where
    F: FnOnce(Arc<AmiSession>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let session = Arc::new(AmiSession::connect(config, timeouts).await?);
    let result = f(Arc::clone(&session)).await;
    session.close().await;
    result
}
