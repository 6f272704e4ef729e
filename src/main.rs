#![forbid(unsafe_code)]

//! `ami-monitor`: realtime queue monitor binary.
//!
//! Loads configuration, resolves the manager secret, then either serves the
//! HTTP endpoints over a long-lived session or runs a single command against
//! a short-lived one.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use ami_monitor::ami::action::{AgentAction, AgentActionCommand};
use ami_monitor::ami::session::with_session;
use ami_monitor::ami::worker::spawn_session_worker;
use ami_monitor::config::GlobalConfig;
use ami_monitor::http;
use ami_monitor::models::realtime::AgentActionResponse;
use ami_monitor::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "ami-monitor", about = "Realtime AMI queue monitor", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the realtime HTTP endpoints.
    Serve,
    /// Print queue and channel status as JSON.
    Status,
    /// Pause, unpause, or remove an agent.
    Agent {
        /// Operation: pause, unpause, or remove.
        action: AgentAction,
        /// Agent interface, e.g. `Agent/1001`.
        #[arg(long)]
        agent: String,
        /// Restrict the operation to one queue.
        #[arg(long)]
        queue: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    config.ami.ensure_complete()?;
    info!(host = %config.ami.host, port = config.ami.port, "configuration loaded");

    match args.command {
        Command::Serve => serve(&config).await,
        Command::Status => {
            let snapshot =
                with_session(&config.ami, &config.timeouts, |session| async move {
                    session.snapshot().await
                })
                .await?;
            print_json(&snapshot)
        }
        Command::Agent {
            action,
            agent,
            queue,
        } => {
            let command = AgentActionCommand::new(action, agent, queue);
            let success = with_session(&config.ami, &config.timeouts, |session| async move {
                session.perform_agent_action(&command).await
            })
            .await?;
            print_json(&AgentActionResponse {
                success,
                message: format!("{action} performed successfully"),
            })
        }
    }
}

async fn serve(config: &GlobalConfig) -> Result<()> {
    let ct = CancellationToken::new();
    let (handle, worker) = spawn_session_worker(config, ct.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let http_ct = ct.clone();
    let http_task = tokio::spawn(async move {
        if let Err(err) = http::serve(addr, handle, http_ct).await {
            error!(%err, "http server failed");
        }
    });

    info!("ami-monitor ready");
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = tokio::join!(http_task, worker);
    info!("ami-monitor shut down");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(format!("failed to encode output: {err}")))?;
    println!("{text}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
