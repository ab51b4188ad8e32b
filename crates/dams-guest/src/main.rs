//! dams-guest: runs the guest over a line-delimited JSON channel
//!
//! Commands arrive on stdin, one `{"op": ..., "payload": ...}` object per
//! line. Events leave on stdout, one object per line; the first is the
//! `setUpFrame` readiness signal the host answers with `setContext`.
//! Logs go to stderr.

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use dams_guest::{EventHost, Guest, GuestCommand, GuestConfig, GuestEvent};

#[derive(Parser)]
#[command(name = "dams-guest")]
#[command(about = "Guest-side session and preference sync for the Dams MCDA scoring app")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "dams-guest.toml")]
    config: PathBuf,

    /// Preference store base URL (overrides config file)
    #[arg(long, env = "DAMS_STORE_URL")]
    base_url: Option<String>,

    /// Allow save/load before the session has been verified
    #[arg(long)]
    no_trust_gate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dams_guest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = GuestConfig::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.store.base_url = base_url;
    }
    if cli.no_trust_gate {
        config.guest.require_trusted_session = false;
    }

    info!(store = %config.store.base_url, "starting dams-guest");

    let capacity = config.guest.channel_capacity;
    let (event_tx, mut event_rx) = mpsc::channel::<GuestEvent>(capacity);
    let (cmd_tx, cmd_rx) = mpsc::channel::<GuestCommand>(capacity);

    // stdout writer
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = event_rx.recv().await {
            let line = format!("{}\n", event.to_wire());
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                warn!(error = %e, "stdout closed, dropping events");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    // stdin reader
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<GuestCommand>(&line) {
                    Ok(command) => {
                        if cmd_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring malformed command"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    });

    let host = EventHost::new(event_tx.clone());
    let guest = Guest::from_config(&config, event_tx);
    drop(guest.run(cmd_rx, host).await);

    writer.await?;
    info!("dams-guest stopped");
    Ok(())
}
