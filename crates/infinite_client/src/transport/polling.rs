//! HTTP long-polling transport over reqwest.
//!
//! A background task keeps one GET outstanding and forwards each payload on
//! a channel, so reading stays cancel safe. Sends are POSTs.

use super::codec::{EnginePacket, decode_payload, encode_payload};
use super::{Link, PacketSink, PacketStream, endpoint};
use crate::config::TransportKind;
use crate::error::ClientError;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

/// Slack on top of the server's ping period for a long-poll GET.
const POLL_SLACK: Duration = Duration::from_secs(5);

/// Performs the handshake GET and starts the poll loop.
#[instrument(fields(server = %server))]
pub(super) async fn open(server: &Url) -> Result<Link, ClientError> {
    let client = reqwest::Client::new();
    let url = endpoint(server, TransportKind::Polling, None)?;
    debug!(url = %url, "Polling handshake");

    let body = client.get(url).send().await?.error_for_status()?.text().await?;
    let mut packets = decode_payload(&body).into_iter();
    let handshake = match packets.next() {
        Some(EnginePacket::Open(handshake)) => handshake,
        other => {
            return Err(ClientError::transport(format!(
                "Expected open packet, got {:?}",
                other
            )));
        }
    };
    let leftover: Vec<EnginePacket> = packets.collect();

    let session_url = endpoint(server, TransportKind::Polling, Some(&handshake.sid))?;
    let poll_timeout =
        Duration::from_millis(handshake.ping_interval + handshake.ping_timeout) + POLL_SLACK;

    let (tx, rx) = mpsc::unbounded_channel();
    if !leftover.is_empty() {
        let _ = tx.send(Ok(leftover));
    }
    let reader = tokio::spawn(poll_loop(
        client.clone(),
        session_url.clone(),
        poll_timeout,
        tx,
    ));

    Ok(Link {
        kind: TransportKind::Polling,
        handshake,
        sink: Box::new(PollingSink {
            client,
            url: session_url,
        }),
        stream: Box::new(PollingStream { rx, reader }),
    })
}

async fn poll_loop(
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
    tx: mpsc::UnboundedSender<Result<Vec<EnginePacket>, ClientError>>,
) {
    loop {
        let result = fetch(&client, &url, timeout).await;
        let closed = match &result {
            Ok(packets) => packets.contains(&EnginePacket::Close),
            Err(e) => {
                warn!(error = %e, "Poll failed");
                true
            }
        };
        if tx.send(result).is_err() || closed {
            return;
        }
    }
}

async fn fetch(
    client: &reqwest::Client,
    url: &Url,
    timeout: Duration,
) -> Result<Vec<EnginePacket>, ClientError> {
    let body = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(decode_payload(&body))
}

struct PollingSink {
    client: reqwest::Client,
    url: Url,
}

#[async_trait::async_trait]
impl PacketSink for PollingSink {
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), ClientError> {
        self.client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(encode_payload(&packets))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.send(vec![EnginePacket::Close]).await {
            debug!(error = %e, "Close POST failed");
        }
    }
}

struct PollingStream {
    rx: mpsc::UnboundedReceiver<Result<Vec<EnginePacket>, ClientError>>,
    reader: JoinHandle<()>,
}

#[async_trait::async_trait]
impl PacketStream for PollingStream {
    async fn next_batch(&mut self) -> Option<Result<Vec<EnginePacket>, ClientError>> {
        self.rx.recv().await
    }
}

impl Drop for PollingStream {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
