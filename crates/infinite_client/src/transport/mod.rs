//! Socket.IO transport to the game server.
//!
//! The transport runs in its own task and talks to the session runtime only
//! through channels: [`TransportCommand`]s go in, [`TransportEvent`]s come
//! out. Connection retries and websocket → polling fallback live here; the
//! session sees a single `Connected` or `ConnectError`.

pub mod codec;
mod polling;
mod websocket;

use crate::config::{TransportConfig, TransportKind};
use crate::error::{ClientError, ClientErrorKind};
use codec::{EnginePacket, Handshake, SocketPacket};
use infinite_tictactoe::{ClientEvent, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Time a closing transport gets before its task is aborted.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between connection rounds, multiplied by the round number.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Signals from the transport to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Namespace connected; events may flow.
    Connected,
    /// Server event.
    Message(ServerEvent),
    /// The connection dropped after it was established.
    Disconnected {
        /// Why it dropped.
        reason: String,
    },
    /// Every connection attempt failed.
    ConnectError {
        /// Last failure.
        message: String,
    },
}

/// Requests from the session to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send an event to the server.
    Emit(ClientEvent),
    /// Disconnect and stop.
    Close,
}

/// Write half of an open engine session.
#[async_trait::async_trait]
pub trait PacketSink: Send {
    /// Sends packets in order.
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), ClientError>;

    /// Closes the session, best effort.
    async fn close(&mut self);
}

/// Read half of an open engine session.
#[async_trait::async_trait]
pub trait PacketStream: Send {
    /// Next batch of packets, or `None` once the session is gone. Must be
    /// cancel safe.
    async fn next_batch(&mut self) -> Option<Result<Vec<EnginePacket>, ClientError>>;
}

/// An open engine session.
pub struct Link {
    /// Transport that carried the handshake.
    pub kind: TransportKind,
    /// Handshake parameters.
    pub handshake: Handshake,
    /// Write half.
    pub sink: Box<dyn PacketSink>,
    /// Read half.
    pub stream: Box<dyn PacketStream>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("kind", &self.kind)
            .field("handshake", &self.handshake)
            .finish_non_exhaustive()
    }
}

/// Opens engine sessions over a given transport.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Opens a session and completes the engine handshake.
    async fn open(&self, kind: TransportKind, server: &Url) -> Result<Link, ClientError>;
}

/// Connector for real websocket and polling transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

#[async_trait::async_trait]
impl Connector for NetworkConnector {
    #[instrument(skip(self), fields(server = %server))]
    async fn open(&self, kind: TransportKind, server: &Url) -> Result<Link, ClientError> {
        match kind {
            TransportKind::Websocket => websocket::open(server).await,
            TransportKind::Polling => polling::open(server).await,
        }
    }
}

/// Builds the Socket.IO endpoint for a transport.
///
/// # Errors
///
/// Fails for URL schemes other than http(s) and ws(s).
pub fn endpoint(server: &Url, kind: TransportKind, sid: Option<&str>) -> Result<Url, ClientError> {
    let secure = match server.scheme() {
        "http" | "ws" => false,
        "https" | "wss" => true,
        other => {
            return Err(ClientError::new(
                ClientErrorKind::Config,
                format!("Unsupported URL scheme '{}'", other),
            ));
        }
    };
    let scheme = match (kind, secure) {
        (TransportKind::Websocket, false) => "ws",
        (TransportKind::Websocket, true) => "wss",
        (TransportKind::Polling, false) => "http",
        (TransportKind::Polling, true) => "https",
    };

    let mut url = server.clone();
    url.set_path("/socket.io/");
    url.set_query(None);
    url.set_fragment(None);
    // Switching between special schemes (http <-> ws) is always allowed.
    url.set_scheme(scheme)
        .map_err(|_| ClientError::new(ClientErrorKind::Config, "Cannot switch URL scheme"))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("EIO", "4");
        query.append_pair("transport", &kind.to_string());
        if let Some(sid) = sid {
            query.append_pair("sid", sid);
        }
    }
    Ok(url)
}

/// Session-side handle to a running transport task.
#[derive(Debug)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<TransportCommand>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    /// Wraps an already spawned transport task.
    pub fn from_parts(commands: mpsc::UnboundedSender<TransportCommand>, task: JoinHandle<()>) -> Self {
        Self { commands, task }
    }

    /// Queues an event for the server.
    ///
    /// # Errors
    ///
    /// Fails once the transport task has stopped.
    pub fn emit(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.commands
            .send(TransportCommand::Emit(event))
            .map_err(|_| ClientError::new(ClientErrorKind::ChannelClosed, "Transport task has stopped"))
    }

    /// Asks the transport to close and aborts it if it does not finish in
    /// time. An attempt still connecting is aborted outright.
    #[instrument(skip(self))]
    pub fn shutdown(self) {
        let Self { commands, mut task } = self;
        let _ = commands.send(TransportCommand::Close);
        tokio::spawn(async move {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_err() {
                debug!("Transport did not close in time, aborting");
                task.abort();
            }
        });
    }
}

/// Creates transports for the session runtime.
pub trait TransportFactory: Send + Sync {
    /// Spawns a transport that reports on `events`.
    fn open(&self, events: mpsc::UnboundedSender<TransportEvent>) -> TransportHandle;
}

/// Factory for Socket.IO transports over the network.
#[derive(Clone)]
pub struct SocketIoFactory {
    server: Url,
    config: TransportConfig,
    connector: Arc<dyn Connector>,
}

impl SocketIoFactory {
    /// Creates a factory for the given server.
    pub fn new(server: Url, config: TransportConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            server,
            config,
            connector,
        }
    }
}

impl TransportFactory for SocketIoFactory {
    fn open(&self, events: mpsc::UnboundedSender<TransportEvent>) -> TransportHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(
            Arc::clone(&self.connector),
            self.server.clone(),
            self.config.clone(),
            commands_rx,
            events,
        ));
        TransportHandle::from_parts(commands_tx, task)
    }
}

/// Runs one transport from first attempt to close.
#[instrument(skip_all, fields(server = %server))]
pub async fn drive(
    connector: Arc<dyn Connector>,
    server: Url,
    config: TransportConfig,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut link, pending) = match establish(connector.as_ref(), &server, &config).await {
        Ok(established) => established,
        Err(e) => {
            warn!(error = %e, "All connection attempts failed");
            let _ = events.send(TransportEvent::ConnectError { message: e.message });
            return;
        }
    };

    info!(transport = %link.kind, sid = %link.handshake.sid, "Transport connected");
    if events.send(TransportEvent::Connected).is_err() {
        link.sink.close().await;
        return;
    }

    if let Err(reason) = dispatch(&mut link, pending, &events).await {
        let _ = events.send(TransportEvent::Disconnected { reason });
        return;
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Emit(event)) => {
                    let packet = SocketPacket::event(event.name(), event.payload());
                    debug!(event = event.name(), "Emitting event");
                    if let Err(e) = link.sink.send(vec![EnginePacket::Message(packet.encode())]).await {
                        warn!(error = %e, "Send failed");
                        let _ = events.send(TransportEvent::Disconnected { reason: e.message });
                        return;
                    }
                }
                Some(TransportCommand::Close) | None => {
                    info!("Closing transport");
                    let goodbye = SocketPacket::Disconnect { namespace: codec::DEFAULT_NAMESPACE.to_string() };
                    let _ = link.sink.send(vec![EnginePacket::Message(goodbye.encode())]).await;
                    link.sink.close().await;
                    return;
                }
            },
            batch = link.stream.next_batch() => match batch {
                Some(Ok(packets)) => {
                    if let Err(reason) = dispatch(&mut link, packets, &events).await {
                        let _ = events.send(TransportEvent::Disconnected { reason });
                        return;
                    }
                }
                Some(Err(e)) if e.kind == ClientErrorKind::Codec => {
                    warn!(error = %e, "Skipping malformed frame");
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Transport error");
                    let _ = events.send(TransportEvent::Disconnected { reason: e.message });
                    return;
                }
                None => {
                    let _ = events.send(TransportEvent::Disconnected { reason: "transport close".to_string() });
                    return;
                }
            },
        }
    }
}

/// Tries every configured transport, for `reconnection_attempts + 1`
/// rounds, until one connects to the default namespace.
#[instrument(skip_all)]
async fn establish(
    connector: &dyn Connector,
    server: &Url,
    config: &TransportConfig,
) -> Result<(Link, Vec<EnginePacket>), ClientError> {
    let mut last_error = ClientError::transport("No transports configured");

    for round in 0..=*config.reconnection_attempts() {
        if round > 0 {
            tokio::time::sleep(RETRY_BACKOFF * round).await;
        }
        for kind in config.transports() {
            debug!(round, transport = %kind, "Connection attempt");
            let attempt = tokio::time::timeout(
                config.connect_timeout(),
                connect_namespace(connector, *kind, server),
            )
            .await;
            match attempt {
                Ok(Ok(established)) => return Ok(established),
                Ok(Err(e)) => {
                    warn!(round, transport = %kind, error = %e, "Connection attempt failed");
                    last_error = e;
                }
                Err(_) => {
                    warn!(round, transport = %kind, "Connection attempt timed out");
                    last_error = ClientError::transport("Connection timeout");
                }
            }
        }
    }

    Err(last_error)
}

/// Opens a link and joins the default namespace. Packets that arrived
/// alongside the connect ack are handed back for dispatch.
async fn connect_namespace(
    connector: &dyn Connector,
    kind: TransportKind,
    server: &Url,
) -> Result<(Link, Vec<EnginePacket>), ClientError> {
    let mut link = connector.open(kind, server).await?;
    link.sink
        .send(vec![EnginePacket::Message(SocketPacket::connect().encode())])
        .await?;

    loop {
        let batch = match link.stream.next_batch().await {
            Some(Err(e)) if e.kind == ClientErrorKind::Codec => {
                warn!(error = %e, "Skipping malformed frame");
                continue;
            }
            Some(batch) => batch?,
            None => return Err(ClientError::transport("Closed during connect")),
        };
        let mut packets = batch.into_iter();
        while let Some(packet) = packets.next() {
            match packet {
                EnginePacket::Ping(data) => link.sink.send(vec![EnginePacket::Pong(data)]).await?,
                EnginePacket::Close => return Err(ClientError::transport("Closed during connect")),
                EnginePacket::Message(text) => match SocketPacket::decode(&text) {
                    Ok(SocketPacket::Connect { .. }) => {
                        let pending = packets.collect();
                        return Ok((link, pending));
                    }
                    Ok(SocketPacket::ConnectError { message, .. }) => {
                        return Err(ClientError::transport(message));
                    }
                    Ok(other) => debug!(?other, "Ignoring packet before connect ack"),
                    Err(e) => warn!(error = %e, "Skipping malformed packet before connect ack"),
                },
                _ => {}
            }
        }
    }
}

/// Handles a batch of engine packets. Returns the disconnect reason when
/// the server ends the session.
async fn dispatch(
    link: &mut Link,
    packets: Vec<EnginePacket>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), String> {
    for packet in packets {
        match packet {
            EnginePacket::Ping(data) => {
                if let Err(e) = link.sink.send(vec![EnginePacket::Pong(data)]).await {
                    return Err(e.message);
                }
            }
            EnginePacket::Close => return Err("transport close".to_string()),
            EnginePacket::Message(text) => match SocketPacket::decode(&text) {
                Ok(SocketPacket::Event { name, data, .. }) => match ServerEvent::decode(&name, data) {
                    Ok(event) => {
                        debug!(event = %name, "Server event");
                        let _ = events.send(TransportEvent::Message(event));
                    }
                    Err(e) => warn!(event = %name, error = %e, "Skipping undecodable event"),
                },
                Ok(SocketPacket::Disconnect { .. }) => return Err("io server disconnect".to_string()),
                Ok(other) => debug!(?other, "Ignoring socket packet"),
                Err(e) => warn!(error = %e, "Skipping malformed socket packet"),
            },
            EnginePacket::Open(_) | EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }
    }
    Ok(())
}
