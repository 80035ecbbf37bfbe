//! TCP implementation of the inter-process channel
//!
//! Frames are bincode encoded `IpcMessage`s behind a 4-byte big-endian
//! length prefix. The server accepts any number of clients, answers their
//! requests from registered handlers and fans broadcasts out to all of them.
//! A second server on the same address fails to bind, which keeps the
//! server role unique per address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use shared::{IpcMessage, IpcRole, ProcessId, process_debug, process_warn};

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{IpcChannel, RequestHandler};

const MAX_FRAME_LEN: usize = 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type Handlers = Arc<Mutex<HashMap<String, RequestHandler>>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<IpcMessage>>>>;

pub struct TcpIpcChannel {
    role: IpcRole,
    address: SocketAddr,
    bound: OnceLock<SocketAddr>,
    connected: AtomicBool,
    handlers: Handlers,
    /// Server: one outbound queue per connected client
    peers: Arc<Mutex<Vec<mpsc::Sender<IpcMessage>>>>,
    /// Client: outbound queue towards the server
    upstream: Mutex<Option<mpsc::Sender<IpcMessage>>>,
    pending: Pending,
    next_id: AtomicU64,
    inbound: broadcast::Sender<IpcMessage>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TcpIpcChannel {
    pub fn new(role: IpcRole, address: SocketAddr) -> Self {
        let (inbound, _) = broadcast::channel(64);
        Self {
            role,
            address,
            bound: OnceLock::new(),
            connected: AtomicBool::new(false),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            peers: Arc::new(Mutex::new(Vec::new())),
            upstream: Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            inbound,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Address actually bound (server) or dialled (client)
    pub fn address(&self) -> SocketAddr {
        self.bound.get().copied().unwrap_or(self.address)
    }

    /// Number of clients currently attached to this server
    pub async fn peer_count(&self) -> usize {
        let mut peers = self.peers.lock().await;
        peers.retain(|peer| !peer.is_closed());
        peers.len()
    }

    async fn serve(&self) -> SupervisorResult<SocketAddr> {
        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|e| SupervisorError::ipc(format!("Failed to bind to {}: {e}", self.address)))?;
        let bound = listener.local_addr()?;
        let _ = self.bound.set(bound);

        let handlers = self.handlers.clone();
        let peers = self.peers.clone();

        let handle = tokio::spawn(async move {
            while let Ok((stream, addr)) = listener.accept().await {
                process_debug!(ProcessId::current(), "🔌 IPC client connected from {}", addr);
                let (reader, writer) = stream.into_split();
                let outbound = spawn_writer(writer);
                peers.lock().await.push(outbound.clone());

                let handlers = handlers.clone();
                tokio::spawn(async move {
                    let mut reader = reader;
                    while let Some(message) = read_frame(&mut reader).await {
                        if let IpcMessage::Request { id, topic, payload } = message {
                            let reply = answer(&handlers, id, &topic, payload).await;
                            if outbound.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                });
            }
        });

        self.tasks.lock().await.push(handle);
        Ok(bound)
    }

    async fn dial(&self) -> SupervisorResult<()> {
        let stream = TcpStream::connect(self.address)
            .await
            .map_err(|e| SupervisorError::ipc(format!("Connect failed to {}: {e}", self.address)))?;
        let (mut reader, writer) = stream.into_split();
        *self.upstream.lock().await = Some(spawn_writer(writer));

        let pending = self.pending.clone();
        let inbound = self.inbound.clone();
        let handle = tokio::spawn(async move {
            while let Some(message) = read_frame(&mut reader).await {
                match message {
                    IpcMessage::Reply { id, .. } => {
                        if let Some(waiter) = pending.lock().await.remove(&id) {
                            let _ = waiter.send(message);
                        }
                    }
                    IpcMessage::Broadcast { .. } => {
                        let _ = inbound.send(message);
                    }
                    IpcMessage::Request { .. } => {}
                }
            }
        });

        self.tasks.lock().await.push(handle);
        Ok(())
    }

    /// Abort background tasks and forget peers
    pub async fn shutdown(&self) {
        for handle in std::mem::take(&mut *self.tasks.lock().await) {
            handle.abort();
        }
        self.peers.lock().await.clear();
        *self.upstream.lock().await = None;
        self.connected.store(false, Ordering::SeqCst);
        process_debug!(ProcessId::current(), "🔌 IPC channel shut down");
    }
}

async fn answer(handlers: &Handlers, id: u64, topic: &str, payload: Option<String>) -> IpcMessage {
    let handler = handlers.lock().await.get(topic).cloned();
    match handler {
        Some(handler) => match handler(payload) {
            Ok(payload) => IpcMessage::Reply { id, payload, error: None },
            Err(error) => IpcMessage::Reply {
                id,
                payload: None,
                error: Some(error),
            },
        },
        None => IpcMessage::Reply {
            id,
            payload: None,
            error: Some(format!("no handler for {topic}")),
        },
    }
}

fn spawn_writer<W>(mut writer: W) -> mpsc::Sender<IpcMessage>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<IpcMessage>(64);
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &message).await {
                process_warn!(ProcessId::current(), "⚠️ IPC write failed: {}", e);
                break;
            }
        }
    });
    tx
}

pub(crate) async fn write_frame<W>(writer: &mut W, message: &IpcMessage) -> SupervisorResult<()>
where
    W: AsyncWrite + Unpin,
{
    let data = bincode::serialize(message).map_err(|e| SupervisorError::ipc(format!("Serialize failed: {e}")))?;
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// `None` on EOF, oversized frames or undecodable data
pub(crate) async fn read_frame<R>(reader: &mut R) -> Option<IpcMessage>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await.ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return None;
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await.ok()?;
    bincode::deserialize(&data).ok()
}

#[async_trait]
impl IpcChannel for TcpIpcChannel {
    fn role(&self) -> IpcRole {
        self.role
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> SupervisorResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        match self.role {
            IpcRole::Server => {
                let bound = self.serve().await?;
                process_debug!(ProcessId::current(), "🌐 IPC server listening on {}", bound);
            }
            IpcRole::Client => {
                self.dial().await?;
                process_debug!(ProcessId::current(), "🔗 IPC client connected to {}", self.address);
            }
            IpcRole::Neither => return Err(SupervisorError::ipc("process has no IPC role")),
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn broadcast(&self, topic: &str, payload: Option<String>) -> SupervisorResult<()> {
        if self.role != IpcRole::Server {
            return Err(SupervisorError::ipc("only the IPC server can broadcast"));
        }

        let message = IpcMessage::Broadcast {
            topic: topic.to_string(),
            payload,
        };
        // The peer list is not held across sends
        let peers = {
            let mut peers = self.peers.lock().await;
            peers.retain(|peer| !peer.is_closed());
            peers.clone()
        };
        for peer in &peers {
            let _ = peer.send(message.clone()).await;
        }

        process_debug!(ProcessId::current(), "📣 Broadcast {} to {} peers", topic, peers.len());
        Ok(())
    }

    async fn on(&self, topic: &str, handler: RequestHandler) -> SupervisorResult<()> {
        if self.role != IpcRole::Server {
            return Err(SupervisorError::ipc("only the IPC server answers requests"));
        }
        self.handlers.lock().await.insert(topic.to_string(), handler);
        Ok(())
    }

    async fn request(&self, topic: &str, payload: Option<String>) -> SupervisorResult<Option<String>> {
        let upstream = self
            .upstream
            .lock()
            .await
            .clone()
            .ok_or_else(|| SupervisorError::ipc("IPC client is not connected"))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = IpcMessage::Request {
            id,
            topic: topic.to_string(),
            payload,
        };
        if upstream.send(request).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(SupervisorError::ipc("IPC connection closed"));
        }

        let reply = tokio::time::timeout(REQUEST_TIMEOUT, rx).await;
        self.pending.lock().await.remove(&id);

        match reply {
            Ok(Ok(IpcMessage::Reply { error: Some(error), .. })) => Err(SupervisorError::ipc(error)),
            Ok(Ok(IpcMessage::Reply { payload, .. })) => Ok(payload),
            Ok(Ok(_)) => Err(SupervisorError::ipc("unexpected IPC frame")),
            Ok(Err(_)) => Err(SupervisorError::ipc("IPC connection closed")),
            Err(_) => Err(SupervisorError::ipc(format!("request {topic} timed out"))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<IpcMessage> {
        self.inbound.subscribe()
    }
}
