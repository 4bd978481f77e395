use std::sync::Arc;

use clap::Parser;
use notewall_core::{MemoryStore, ModerationController, NotewallConfig, SessionStore, SignalBus};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use notewall_server::http::HttpState;
use notewall_server::server;
use notewall_server::subsystems::display::DisplayRuntime;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "notewall.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match NotewallConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let socket_path = config.service.resolved_socket_path();

    if args.health {
        println!("✅ Config loaded from {}", args.config);
        println!("   IPC socket: {}", socket_path);
        if config.http.enabled {
            println!("   HTTP API:   http://{}:{}", config.http.host, config.http.port);
        } else {
            println!("   HTTP API:   disabled");
        }
        println!(
            "   Display:    {}",
            if config.display.enabled { "in-process" } else { "external" }
        );
        if let Some(parent) = std::path::Path::new(&socket_path).parent() {
            if !parent.exists() {
                println!("❌ Socket directory {} does not exist", parent.display());
                std::process::exit(1);
            }
        }
        println!("✅ Notewall health check passed");
        return Ok(());
    }

    let store = MemoryStore::new();
    let signals = SignalBus::new();
    let shared: Arc<dyn SessionStore> = Arc::new(store.clone());

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

    // Moderation view follows the store for the HTTP API
    let moderation = ModerationController::new(shared.clone(), signals.clone(), config.moderation.clone());
    let moderation_task = moderation.clone();
    let moderation_shutdown = tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = moderation_task.run(moderation_shutdown).await {
            tracing::error!("Moderation controller stopped: {}", e);
        }
    });

    // In-process display runtime, if enabled
    let display = if config.display.enabled {
        let (runtime, frames) = DisplayRuntime::new(shared.clone(), signals.clone(), config.display.clone());
        let display_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = runtime.run(display_shutdown).await {
                tracing::error!("Display runtime error: {}", e);
            }
        });
        Some(frames)
    } else {
        None
    };

    // HTTP moderation API, if enabled
    if config.http.enabled {
        let state = Arc::new(HttpState {
            store: shared.clone(),
            moderation,
            config: config.clone(),
            display,
        });
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = notewall_server::http::start_http_server(state, http_shutdown).await {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    server::run_unix_server(&socket_path, store, signals, tx.subscribe()).await?;

    Ok(())
}
