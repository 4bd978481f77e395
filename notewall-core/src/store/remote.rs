//! IPC client for a store hosted by `notewall-server`.
//!
//! One background task owns the socket. It multiplexes request/reply pairs
//! by id, fans subscription pushes out to per-subscription watch channels,
//! relays display signals, and reconnects with exponential backoff when the
//! host goes away. Subscriptions survive reconnects; requests issued while
//! offline fail fast with [`NotewallError::Disconnected`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::{SessionStore, Subscription};
use crate::config::StoreClientConfig;
use crate::error::{NotewallError, Result};
use crate::ipc::{self, RequestFrame, ServerFrame, StoreRequest, StoreResponse};
use crate::signal::SignalBus;

enum Command {
    Request {
        frame: RequestFrame,
        reply: oneshot::Sender<StoreResponse>,
    },
    Subscribe {
        id: u64,
        path: String,
        tx: watch::Sender<Option<Value>>,
    },
}

#[derive(Clone)]
pub struct RemoteStore {
    inner: Arc<RemoteInner>,
}

struct RemoteInner {
    next_id: AtomicU64,
    commands: mpsc::UnboundedSender<Command>,
    connected: watch::Receiver<bool>,
    signals: SignalBus,
    request_timeout: Duration,
}

impl RemoteStore {
    /// Start the connection task for the host at `socket_path`. Returns
    /// immediately; the first connection attempt happens in the background.
    pub fn connect(socket_path: &str, config: &StoreClientConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (connected_tx, connected) = watch::channel(false);
        let signals = SignalBus::new();

        let task = ConnectionTask {
            socket_path: socket_path.to_string(),
            config: config.clone(),
            commands: rx,
            connected: connected_tx,
            signals: signals.clone(),
            subscriptions: HashMap::new(),
            pending: HashMap::new(),
        };
        tokio::spawn(task.run());

        Self {
            inner: Arc::new(RemoteInner {
                next_id: AtomicU64::new(1),
                commands,
                connected,
                signals,
                request_timeout: Duration::from_millis(config.request_timeout_ms),
            }),
        }
    }

    /// Display signals relayed from the host.
    pub fn signals(&self) -> SignalBus {
        self.inner.signals.clone()
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, request: StoreRequest) -> Result<Value> {
        if !*self.inner.connected.borrow() {
            return Err(NotewallError::Disconnected);
        }
        let (reply, rx) = oneshot::channel();
        let frame = RequestFrame {
            id: self.next_id(),
            request,
        };
        self.inner
            .commands
            .send(Command::Request { frame, reply })
            .map_err(|_| NotewallError::Disconnected)?;

        match tokio::time::timeout(self.inner.request_timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(NotewallError::Disconnected),
            Err(_) => Err(NotewallError::Ipc("request timed out".to_string())),
        }
    }
}

#[async_trait]
impl SessionStore for RemoteStore {
    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let (tx, rx) = watch::channel(None);
        self.inner
            .commands
            .send(Command::Subscribe {
                id: self.next_id(),
                path: path.to_string(),
                tx,
            })
            .map_err(|_| NotewallError::Disconnected)?;
        Ok(Subscription::from_pushed(rx))
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.inner.connected.clone()
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.request(StoreRequest::Write {
            path: path.to_string(),
            value,
        })
        .await
        .map(|_| ())
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        self.request(StoreRequest::Patch {
            path: path.to_string(),
            fields,
        })
        .await
        .map(|_| ())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.request(StoreRequest::Delete {
            path: path.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn write_if_absent(&self, path: &str, value: Value) -> Result<bool> {
        let data = self
            .request(StoreRequest::WriteIfAbsent {
                path: path.to_string(),
                value,
            })
            .await?;
        Ok(data["written"].as_bool().unwrap_or(false))
    }
}

// ============================================================================
// Connection task
// ============================================================================

struct ConnectionTask {
    socket_path: String,
    config: StoreClientConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    connected: watch::Sender<bool>,
    signals: SignalBus,
    subscriptions: HashMap<u64, (String, watch::Sender<Option<Value>>)>,
    pending: HashMap<u64, oneshot::Sender<StoreResponse>>,
}

enum SessionEnd {
    Disconnected,
    ClientDropped,
}

impl ConnectionTask {
    async fn run(mut self) {
        loop {
            let Some(stream) = self.establish().await else {
                return;
            };
            tracing::info!(socket = %self.socket_path, "Connected to store host");
            self.connected.send_replace(true);

            let end = self.serve(stream).await;

            self.connected.send_replace(false);
            for (_, reply) in self.pending.drain() {
                let _ = reply.send(StoreResponse::err("disconnected"));
            }
            match end {
                SessionEnd::ClientDropped => return,
                SessionEnd::Disconnected => {
                    tracing::warn!(socket = %self.socket_path, "Lost connection to store host, reconnecting");
                }
            }
        }
    }

    /// Connect with backoff while still accepting commands. `None` when every
    /// `RemoteStore` handle has been dropped.
    async fn establish(&mut self) -> Option<UnixStream> {
        let strategy = ExponentialBackoff::from_millis(self.config.reconnect_initial_ms.max(1))
            .max_delay(Duration::from_millis(self.config.reconnect_max_ms))
            .map(jitter);
        let path = self.socket_path.clone();
        let connect = Retry::spawn(strategy, move || UnixStream::connect(path.clone()));
        tokio::pin!(connect);

        loop {
            tokio::select! {
                res = &mut connect => match res {
                    Ok(stream) => return Some(stream),
                    Err(e) => {
                        tracing::error!("Store host unreachable: {}", e);
                        return None;
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    None => return None,
                    Some(Command::Request { reply, .. }) => {
                        let _ = reply.send(StoreResponse::err("disconnected"));
                    }
                    Some(Command::Subscribe { id, path, tx }) => {
                        self.subscriptions.insert(id, (path, tx));
                    }
                },
            }
        }
    }

    async fn serve(&mut self, stream: UnixStream) -> SessionEnd {
        let (read, write) = stream.into_split();
        let mut framed_read = FramedRead::new(read, ipc::frame_codec());
        let mut framed_write = FramedWrite::new(write, ipc::frame_codec());

        // Replay live subscriptions on the fresh connection.
        let live: Vec<(u64, String)> = self
            .subscriptions
            .iter()
            .filter(|(_, (_, tx))| !tx.is_closed())
            .map(|(id, (path, _))| (*id, path.clone()))
            .collect();
        self.subscriptions.retain(|_, (_, tx)| !tx.is_closed());
        for (id, path) in live {
            let frame = RequestFrame {
                id,
                request: StoreRequest::Subscribe { path },
            };
            if send_frame(&mut framed_write, &frame).await.is_err() {
                return SessionEnd::Disconnected;
            }
        }

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let frame = match cmd {
                        None => return SessionEnd::ClientDropped,
                        Some(Command::Request { frame, reply }) => {
                            self.pending.insert(frame.id, reply);
                            frame
                        }
                        Some(Command::Subscribe { id, path, tx }) => {
                            self.subscriptions.insert(id, (path.clone(), tx));
                            RequestFrame { id, request: StoreRequest::Subscribe { path } }
                        }
                    };
                    if send_frame(&mut framed_write, &frame).await.is_err() {
                        return SessionEnd::Disconnected;
                    }
                }
                incoming = framed_read.next() => {
                    let bytes = match incoming {
                        Some(Ok(bytes)) => bytes,
                        Some(Err(e)) => {
                            tracing::error!("Frame error: {}", e);
                            return SessionEnd::Disconnected;
                        }
                        None => return SessionEnd::Disconnected,
                    };
                    let frame: ServerFrame = match ipc::decode(&bytes) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Dropping undecodable frame: {}", e);
                            continue;
                        }
                    };
                    if let Some(unsub) = self.dispatch(frame) {
                        if send_frame(&mut framed_write, &unsub).await.is_err() {
                            return SessionEnd::Disconnected;
                        }
                    }
                }
            }
        }
    }

    /// Route one host frame. Returns an unsubscribe request when a push
    /// arrives for a subscription nobody holds any more.
    fn dispatch(&mut self, frame: ServerFrame) -> Option<RequestFrame> {
        match frame {
            ServerFrame::Reply { id, response } => {
                if let Some(reply) = self.pending.remove(&id) {
                    let _ = reply.send(response);
                } else if !response.is_ok() {
                    tracing::warn!(id, error = ?response.error, "Store host rejected request");
                }
                None
            }
            ServerFrame::Snapshot { sub, value } => {
                let delivered = match self.subscriptions.get(&sub) {
                    Some((_, tx)) => tx.send(Some(value)).is_ok(),
                    None => false,
                };
                if delivered {
                    return None;
                }
                self.subscriptions.remove(&sub);
                Some(RequestFrame {
                    id: sub,
                    request: StoreRequest::Unsubscribe { sub },
                })
            }
            ServerFrame::Signal { signal } => {
                self.signals.publish(signal);
                None
            }
        }
    }
}

async fn send_frame<W>(framed: &mut FramedWrite<W, tokio_util::codec::LengthDelimitedCodec>, frame: &RequestFrame) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let bytes = ipc::encode(frame)?;
    framed.send(bytes).await.map_err(|e| {
        tracing::error!("Failed to send frame: {}", e);
        NotewallError::Io(e)
    })
}
