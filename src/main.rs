//! Chatlink CLI entry point.
//!
//! `start` runs the adapter against the scripted client: hub commands
//! arrive on stdin as JSON lines, hub events and command replies leave on
//! stdout as JSON lines, logs go to stderr. `check-config` prints the
//! resolved configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use chatlink::actions::{wire, ActionRegistry};
use chatlink::client::mock::{MockFactory, MockScript};
use chatlink::config::Config;
use chatlink::hub::sink::{ChannelSink, StdoutSink};
use chatlink::hub::HubEnvelope;
use chatlink::session::{spawn_event_pump, SessionAdapter};

/// Bridges a messaging client's login lifecycle to a hub.
#[derive(Parser)]
#[command(name = "chatlink", version, about)]
struct Cli {
    /// Config file (default: `$CHATLINK_CONFIG_PATH` or `~/.chatlink/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the adapter, reading hub commands from stdin.
    Start,
    /// Print the resolved configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    match cli.command {
        Command::Start => handle_start(config).await,
        Command::CheckConfig => {
            chatlink::logging::init_cli(&config.logging.level);
            println!("{config:#?}");
            Ok(())
        }
    }
}

/// Run the adapter until a fatal session event, ctrl-c, or stdin EOF.
async fn handle_start(config: Config) -> anyhow::Result<()> {
    let _logging_guard = chatlink::logging::init(&config.logging)?;

    info!(
        client_id = %config.hub.client_id,
        client_type = %config.hub.client_type,
        cancel_policy = ?config.session.cancel_policy,
        "chatlink starting"
    );

    // Outbound: adapter -> channel sink -> stdout sink. Replies share stdout.
    let (hub_tx, hub_rx) = mpsc::channel::<HubEnvelope>(config.hub.channel_buffer_size);
    let sink = Arc::new(ChannelSink::new(config.hub.client_info(), hub_tx));
    let stdout = Arc::new(StdoutSink::stdout(config.hub.client_info()));
    let writer = tokio::spawn({
        let stdout = Arc::clone(&stdout);
        async move { stdout.forward(hub_rx).await }
    });

    let factory = Arc::new(MockFactory::new(
        MockScript::standard(Duration::from_millis(config.mock.step_delay_ms)),
        config.mock.qr_base_url.clone(),
    ));
    let (adapter, events_rx) =
        SessionAdapter::new(factory, sink.clone(), config.session.cancel_policy);
    let adapter = Arc::new(adapter);
    let pump = spawn_event_pump(Arc::clone(&adapter), events_rx);

    let registry = Arc::new(ActionRegistry::from_manifest(Arc::clone(&adapter)));
    info!(actions = ?registry.names(), "hub actions ready");

    let mut termination_rx = adapter.subscribe_termination();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let registry = Arc::clone(&registry);
                        let stdout = Arc::clone(&stdout);
                        tokio::spawn(async move {
                            let reply = wire::handle_line(&registry, &line).await;
                            if let Err(e) = stdout.write_json(&reply).await {
                                warn!(action = %reply.action, error = %e, "failed to write command reply");
                            }
                        });
                    }
                    Ok(None) => {
                        info!("hub command stream closed, logging out");
                        if let Err(e) = adapter.logout().await {
                            warn!(error = %e, "logout on shutdown failed");
                        }
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read hub command stream");
                        break;
                    }
                }
            }
            changed = termination_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(termination) = termination_rx.borrow().clone() {
                    info!(reason = %termination, "session ended, shutting down");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
        }
    }

    drain(&sink, Duration::from_secs(config.session.drain_timeout_secs)).await;
    pump.abort();
    writer.abort();
    info!("chatlink stopped");
    Ok(())
}

/// Wait for queued hub events to reach the writer, up to `timeout`.
async fn drain(sink: &ChannelSink, timeout: Duration) {
    let deadline = tokio::time::Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(tokio::time::Instant::now);

    while sink.pending() > 0 {
        if tokio::time::Instant::now() >= deadline {
            warn!(
                pending = sink.pending(),
                "drain timeout exceeded, dropping queued hub events"
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    // Let the writer flush the last envelope it took.
    tokio::task::yield_now().await;
}
