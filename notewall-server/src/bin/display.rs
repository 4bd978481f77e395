//! Standalone display process.
//!
//! Connects to a running `notewall-server` over its IPC socket and runs the
//! display runtime against it. With `--emit-frames` every frame whose visible
//! notes changed is written to stdout as one JSON line, for a renderer or a
//! log to consume.

use std::sync::Arc;

use clap::Parser;
use notewall_core::display::DisplayFrame;
use notewall_core::{NotewallConfig, RemoteStore, SessionStore};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use notewall_server::subsystems::display::DisplayRuntime;

#[derive(Parser, Debug)]
#[command(author, version, about = "Notewall display client", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "notewall.toml")]
    config: String,

    /// Override the store host socket from the config file
    #[arg(long)]
    socket: Option<String>,

    /// Write changed frames to stdout as JSON lines
    #[arg(long)]
    emit_frames: bool,
}

/// Ids currently on screen, in render order.
fn visible_ids(frame: &DisplayFrame) -> Vec<String> {
    let landscape = frame.landscape.iter().map(|card| card.note.id.clone());
    let portrait = frame
        .portrait
        .iter()
        .filter_map(|cell| cell.note.as_ref().map(|note| note.id.clone()));
    landscape.chain(portrait).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for frames
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match NotewallConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let socket_path = match args.socket {
        Some(path) => shellexpand::tilde(&path).into_owned(),
        None => config.service.resolved_socket_path(),
    };
    tracing::info!("Connecting to store host at {}", socket_path);

    let remote = RemoteStore::connect(&socket_path, &config.store);
    let signals = remote.signals();
    let store: Arc<dyn SessionStore> = Arc::new(remote);

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let (runtime, mut frames) = DisplayRuntime::new(store, signals, config.display.clone());
    let runtime_task = tokio::spawn(runtime.run(tx.subscribe()));

    let mut shutdown = tx.subscribe();
    let mut last_visible: Option<(bool, Vec<String>)> = None;
    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                let visible = (frame.connected, visible_ids(&frame));
                if last_visible.as_ref() == Some(&visible) {
                    continue;
                }
                tracing::info!(
                    mode = ?frame.mode,
                    connected = frame.connected,
                    notes = frame.note_count,
                    visible = visible.1.len(),
                    "Display frame changed"
                );
                if args.emit_frames {
                    println!("{}", serde_json::to_string(&frame)?);
                }
                last_visible = Some(visible);
            }
            _ = shutdown.recv() => break,
        }
    }

    runtime_task.await??;
    Ok(())
}
