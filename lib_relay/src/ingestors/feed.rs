//! # Live Feed Ingestor
//!
//! Subscribes to the public telemetry relay (ZeroMQ pub/sub, zlib-compressed
//! JSON envelopes) and feeds relayed journal events into the pipeline.
//!
//! The loop reconnects forever: a receive timeout is treated as a dead
//! subscription and tears the socket down, as does any socket error. A
//! message that fails to decode is logged and skipped; one bad message must
//! never take the subscription loop with it.

use std::io::Read;
use std::time::Duration;

use flate2::read::ZlibDecoder;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zeromq::{Socket, SocketRecv, SubSocket, ZmqMessage};

use crate::configs::settings::EddnSettings;
use crate::core::pipeline::Pipeline;
use crate::journal::event::{EventError, JournalEvent};
use crate::journal::{is_relayed_event, JOURNAL_SCHEMA_REF};

/// Pause before reconnecting after a socket error.
const RECONNECT_WAIT: Duration = Duration::from_secs(10);

/// One feed envelope: a schema tag plus the wrapped journal message.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "$schemaRef")]
    schema_ref: String,
    message: serde_json::Value,
}

/// Errors decoding one raw feed frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to inflate frame: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("frame is not a valid feed envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error(transparent)]
    Event(#[from] EventError),
}

/// Decodes one raw frame into a journal event.
///
/// Returns `Ok(None)` for well-formed frames we simply do not relay
/// (other schemas, other event types).
pub fn decode_frame(raw: &[u8]) -> Result<Option<JournalEvent>, FrameError> {
    let mut inflated = Vec::new();
    ZlibDecoder::new(raw).read_to_end(&mut inflated)?;
    let envelope: Envelope = serde_json::from_slice(&inflated)?;
    if envelope.schema_ref != JOURNAL_SCHEMA_REF {
        return Ok(None);
    }
    let event_name = envelope
        .message
        .get("event")
        .and_then(|name| name.as_str())
        .unwrap_or_default();
    if !is_relayed_event(event_name) {
        return Ok(None);
    }
    Ok(Some(JournalEvent::from_value(envelope.message)?))
}

/// Reconnecting subscriber for the live feed.
pub struct EddnFeed {
    relay: String,
    timeout: Duration,
}

impl EddnFeed {
    pub fn new(settings: &EddnSettings) -> Self {
        Self {
            relay: settings.relay.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// Runs the subscription loop until `shutdown` is cancelled.
    pub async fn run(
        &self,
        pipeline: &mut Pipeline,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        while !shutdown.is_cancelled() {
            let mut subscriber = SubSocket::new();
            if let Err(error) = self.connect(&mut subscriber).await {
                warn!(%error, relay = %self.relay, "failed to connect to feed");
                if wait_or_shutdown(RECONNECT_WAIT, &shutdown).await {
                    break;
                }
                continue;
            }
            info!(relay = %self.relay, "connected to feed");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("shutdown requested, leaving feed loop");
                        return Ok(());
                    }
                    received = tokio::time::timeout(self.timeout, subscriber.recv()) => {
                        match received {
                            // Silence past the timeout means a dead
                            // subscription; reconnect from scratch.
                            Err(_) => {
                                warn!("disconnect from feed (after timeout)");
                                break;
                            }
                            Ok(Err(error)) => {
                                warn!(%error, "disconnect from feed (receive error)");
                                if wait_or_shutdown(RECONNECT_WAIT, &shutdown).await {
                                    return Ok(());
                                }
                                break;
                            }
                            Ok(Ok(message)) => self.handle(message, pipeline).await,
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect(&self, subscriber: &mut SubSocket) -> anyhow::Result<()> {
        subscriber.connect(&self.relay).await?;
        subscriber.subscribe("").await?;
        Ok(())
    }

    async fn handle(&self, message: ZmqMessage, pipeline: &mut Pipeline) {
        let Some(frame) = message.get(0) else {
            return;
        };
        match decode_frame(frame) {
            Ok(Some(event)) => {
                pipeline.consume(&event).await;
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "discarding undecodable feed message"),
        }
    }
}

/// Sleeps for `wait`, returning true if shutdown arrived first.
async fn wait_or_shutdown(wait: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(wait) => false,
        _ = shutdown.cancelled() => true,
    }
}
