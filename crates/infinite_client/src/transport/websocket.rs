//! Websocket transport over tokio-tungstenite.

use super::codec::{EnginePacket, Handshake};
use super::{Link, PacketSink, PacketStream, endpoint};
use crate::config::TransportKind;
use crate::error::ClientError;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects and waits for the engine `open` packet.
#[instrument(fields(server = %server))]
pub(super) async fn open(server: &Url) -> Result<Link, ClientError> {
    let url = endpoint(server, TransportKind::Websocket, None)?;
    debug!(url = %url, "Opening websocket");
    let (socket, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (write, mut read) = socket.split();

    let handshake = read_handshake(&mut read).await?;
    debug!(sid = %handshake.sid, "Websocket handshake complete");

    Ok(Link {
        kind: TransportKind::Websocket,
        handshake,
        sink: Box::new(WebsocketSink { write }),
        stream: Box::new(WebsocketStream { read }),
    })
}

async fn read_handshake(read: &mut SplitStream<Socket>) -> Result<Handshake, ClientError> {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match EnginePacket::decode(text.as_str())? {
                EnginePacket::Open(handshake) => return Ok(handshake),
                other => debug!(?other, "Ignoring packet before open"),
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(ClientError::transport("Websocket closed before handshake"));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

struct WebsocketSink {
    write: SplitSink<Socket, Message>,
}

#[async_trait::async_trait]
impl PacketSink for WebsocketSink {
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), ClientError> {
        for packet in packets {
            self.write.send(Message::text(packet.encode())).await?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.write.send(Message::Close(None)).await;
        let _ = self.write.close().await;
    }
}

struct WebsocketStream {
    read: SplitStream<Socket>,
}

#[async_trait::async_trait]
impl PacketStream for WebsocketStream {
    async fn next_batch(&mut self) -> Option<Result<Vec<EnginePacket>, ClientError>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(EnginePacket::decode(text.as_str()).map(|packet| vec![packet]));
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Websocket close frame");
                    return Some(Ok(vec![EnginePacket::Close]));
                }
                // Binary and control frames carry nothing for us.
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
