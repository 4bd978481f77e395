use std::collections::HashMap;
use std::path::Path;

use futures::{SinkExt, StreamExt};
use notewall_core::ipc::{self, RequestFrame, ServerFrame, StoreRequest, StoreResponse};
use notewall_core::{MemoryStore, SessionStore, SignalBus};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::router;

/// Host the store over a Unix socket until shutdown.
pub async fn run_unix_server(
    socket_path: &str,
    store: MemoryStore,
    signals: SignalBus,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!("IPC Server listening on {}", socket_path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, _) = res?;
                let store = store.clone();
                let signals = signals.clone();
                let shutdown = shutdown.resubscribe();
                tokio::spawn(async move {
                    serve_connection(stream, store, signals, shutdown).await;
                });
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutting down IPC server...");
                break;
            }
        }
    }

    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

async fn serve_connection(
    stream: UnixStream,
    store: MemoryStore,
    signals: SignalBus,
    mut shutdown: broadcast::Receiver<()>,
) {
    let (read, write) = stream.into_split();
    let mut framed_read = FramedRead::new(read, ipc::frame_codec());
    let mut framed_write = FramedWrite::new(write, ipc::frame_codec());

    // Subscription tasks and replies share one outbound queue.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerFrame>();
    let mut subscriptions: HashMap<u64, JoinHandle<()>> = HashMap::new();
    let mut signal_rx = signals.subscribe();
    let mut signals_open = true;

    tracing::debug!("IPC client connected");

    loop {
        tokio::select! {
            frame = framed_read.next() => {
                let bytes = match frame {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        tracing::error!("Frame error: {}", e);
                        break;
                    }
                    None => break,
                };
                let request: RequestFrame = match ipc::decode(&bytes) {
                    Ok(req) => req,
                    Err(e) => {
                        let _ = out_tx.send(ServerFrame::Reply {
                            id: 0,
                            response: StoreResponse::err(e.to_string()),
                        });
                        continue;
                    }
                };

                let id = request.id;
                let response = match request.request {
                    StoreRequest::Subscribe { path } => {
                        match spawn_subscription(&store, id, &path, out_tx.clone()).await {
                            Ok(handle) => {
                                if let Some(previous) = subscriptions.insert(id, handle) {
                                    previous.abort();
                                }
                                StoreResponse::ok(serde_json::json!({ "sub": id }))
                            }
                            Err(e) => StoreResponse::err(e.to_string()),
                        }
                    }
                    StoreRequest::Unsubscribe { sub } => {
                        if let Some(handle) = subscriptions.remove(&sub) {
                            handle.abort();
                        }
                        StoreResponse::ok(serde_json::json!({ "sub": sub }))
                    }
                    other => router::handle_request(other, &store).await,
                };
                let _ = out_tx.send(ServerFrame::Reply { id, response });
            }
            Some(frame) = out_rx.recv() => {
                let bytes = match ipc::encode(&frame) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!("Failed to serialize frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = framed_write.send(bytes).await {
                    tracing::error!("Failed to send frame: {}", e);
                    break;
                }
            }
            signal = signal_rx.recv(), if signals_open => match signal {
                Ok(signal) => {
                    let _ = out_tx.send(ServerFrame::Signal { signal });
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "IPC client fell behind on display signals");
                }
                Err(RecvError::Closed) => signals_open = false,
            },
            _ = shutdown.recv() => break,
        }
    }

    for (_, handle) in subscriptions.drain() {
        handle.abort();
    }
    tracing::debug!("IPC client disconnected");
}

async fn spawn_subscription(
    store: &MemoryStore,
    sub: u64,
    path: &str,
    out: mpsc::UnboundedSender<ServerFrame>,
) -> notewall_core::error::Result<JoinHandle<()>> {
    let mut subscription = store.subscribe(path).await?;
    Ok(tokio::spawn(async move {
        while let Some(value) = subscription.next().await {
            if out.send(ServerFrame::Snapshot { sub, value }).is_err() {
                break;
            }
        }
    }))
}
