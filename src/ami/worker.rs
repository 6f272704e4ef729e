//! Command queue in front of one long-lived manager session.
//!
//! Opening a session per request costs a full login and, under load, turns
//! into a connection storm against the switch. Instead a single worker task
//! owns the session and serves commands from a bounded FIFO channel. Callers
//! hold a cloneable [`AmiHandle`] and await a `oneshot` reply.
//!
//! The worker connects lazily on the first command. After any error that
//! leaves the session closed it drops the session; the next command opens a
//! fresh one (one attempt per command). A caller that stops waiting does not
//! interrupt the exchange in progress, so the stream always stays in sync.
//! On cancellation, or once every handle is dropped, the worker logs off.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ami::action::AgentActionCommand;
use crate::ami::session::{AmiSession, SessionState};
use crate::config::{AmiConfig, GlobalConfig, TimeoutConfig};
use crate::models::channel::ChannelRecord;
use crate::models::queue::QueueSnapshot;
use crate::models::realtime::RealtimeSnapshot;
use crate::{AppError, Result};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Work item queued for the session worker.
#[derive(Debug)]
enum AmiCommand {
    QueueStatus(Reply<Vec<QueueSnapshot>>),
    CurrentCalls(Reply<Vec<ChannelRecord>>),
    Snapshot(Reply<RealtimeSnapshot>),
    AgentAction(AgentActionCommand, Reply<bool>),
}

impl AmiCommand {
    fn fail(self, err: AppError) {
        let delivered = match self {
            Self::QueueStatus(reply) => reply.send(Err(err)).is_ok(),
            Self::CurrentCalls(reply) => reply.send(Err(err)).is_ok(),
            Self::Snapshot(reply) => reply.send(Err(err)).is_ok(),
            Self::AgentAction(_, reply) => reply.send(Err(err)).is_ok(),
        };
        if !delivered {
            debug!("ami worker: caller went away before the error reply");
        }
    }

    async fn execute(self, session: &AmiSession) {
        let delivered = match self {
            Self::QueueStatus(reply) => reply.send(session.get_queue_status().await).is_ok(),
            Self::CurrentCalls(reply) => reply.send(session.get_current_calls().await).is_ok(),
            Self::Snapshot(reply) => reply.send(session.snapshot().await).is_ok(),
            Self::AgentAction(command, reply) => reply
                .send(session.perform_agent_action(&command).await)
                .is_ok(),
        };
        if !delivered {
            debug!("ami worker: caller went away before the reply");
        }
    }
}

/// Cloneable front end of the session worker.
#[derive(Debug, Clone)]
pub struct AmiHandle {
    tx: mpsc::Sender<AmiCommand>,
}

impl AmiHandle {
    /// See [`AmiSession::get_queue_status`].
    ///
    /// # Errors
    ///
    /// Session errors as documented there, or `AppError::Connection` when
    /// the worker has stopped.
    pub async fn get_queue_status(&self) -> Result<Vec<QueueSnapshot>> {
        self.request(AmiCommand::QueueStatus).await
    }

    /// See [`AmiSession::get_current_calls`].
    ///
    /// # Errors
    ///
    /// As for [`Self::get_queue_status`].
    pub async fn get_current_calls(&self) -> Result<Vec<ChannelRecord>> {
        self.request(AmiCommand::CurrentCalls).await
    }

    /// See [`AmiSession::snapshot`]. Both listings run back to back on the
    /// same session without other commands in between.
    ///
    /// # Errors
    ///
    /// As for [`Self::get_queue_status`].
    pub async fn snapshot(&self) -> Result<RealtimeSnapshot> {
        self.request(AmiCommand::Snapshot).await
    }

    /// See [`AmiSession::perform_agent_action`].
    ///
    /// # Errors
    ///
    /// As for [`Self::get_queue_status`].
    pub async fn perform_agent_action(&self, command: AgentActionCommand) -> Result<bool> {
        self.request(|reply| AmiCommand::AgentAction(command, reply))
            .await
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> AmiCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| AppError::Connection("ami worker has stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| AppError::Connection("ami worker dropped the request".into()))?
    }
}

/// Start the session worker.
///
/// Returns the handle used to queue commands and the worker's join handle.
/// The worker exits when `cancel` fires or every [`AmiHandle`] is dropped,
/// logging off first.
#[must_use]
pub fn spawn_session_worker(
    config: &GlobalConfig,
    cancel: CancellationToken,
) -> (AmiHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.command_queue_capacity);
    let ami = config.ami.clone();
    let timeouts = config.timeouts;
    let task = tokio::spawn(run_worker(ami, timeouts, rx, cancel));
    (AmiHandle { tx }, task)
}

async fn run_worker(
    ami: AmiConfig,
    timeouts: TimeoutConfig,
    mut rx: mpsc::Receiver<AmiCommand>,
    cancel: CancellationToken,
) {
    let mut session: Option<AmiSession> = None;

    loop {
        let command = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("ami worker: cancellation received, stopping");
                break;
            }

            command = rx.recv() => match command {
                Some(command) => command,
                None => {
                    debug!("ami worker: all handles dropped, stopping");
                    break;
                }
            },
        };

        let live = match ensure_session(&mut session, &ami, &timeouts).await {
            Ok(live) => live,
            Err(err) => {
                warn!(%err, "ami worker: could not open session");
                command.fail(err);
                continue;
            }
        };

        command.execute(live).await;

        if live.state().await != SessionState::Ready {
            info!("ami worker: session closed, reconnecting on next command");
            session = None;
        }
    }

    if let Some(session) = session.take() {
        session.close().await;
    }
    info!("ami worker stopped");
}

async fn ensure_session<'a>(
    slot: &'a mut Option<AmiSession>,
    ami: &AmiConfig,
    timeouts: &TimeoutConfig,
) -> Result<&'a AmiSession> {
    if slot.is_none() {
        let session = AmiSession::connect(ami, timeouts).await?;
        info!(host = %ami.host, port = ami.port, "ami worker: session ready");
        *slot = Some(session);
    }
    slot.as_ref().ok_or_else(|| AppError::Connection("no ami session".into()))
}
