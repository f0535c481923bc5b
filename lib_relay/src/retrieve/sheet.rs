//! # Sheet Delivery Client
//!
//! Posts flattened records to the spreadsheet sink. A delivery needs an
//! API key attached and must survive infrastructure hiccups, so transport
//! failures and non-200 statuses are retried on a fixed interval up to a
//! fixed budget. A 200 whose body does not report `"result": "success"` is
//! an application-level rejection (bad token, malformed payload) — retrying
//! cannot help, so it terminates the delivery immediately.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::configs::settings::SheetSettings;
use crate::core::record::OutputRecord;

/// Form field carrying the hashed shared secret.
const API_KEY_FIELD: &str = "API_KEY";

/// Errors constructing the client from configuration.
#[derive(Debug, Error)]
pub enum SheetConfigError {
    #[error("invalid sheet url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Terminal result of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The sink confirmed the record was stored.
    Delivered,
    /// The sink answered but refused the record; not retried.
    Rejected(String),
    /// The retry budget ran out without a usable answer.
    Unreachable,
}

/// Result of a single POST attempt, before retry policy is applied.
enum Attempt {
    /// 200 with a (prefix of the) body to interpret.
    Accepted(Vec<u8>),
    /// Transport failure or non-200 status; eligible for retry.
    Transient(String),
}

/// Application-level acknowledgment inside a 200 response.
#[derive(Debug, Deserialize)]
struct SheetAck {
    result: String,
}

/// HTTP client for the spreadsheet sink.
pub struct SheetClient {
    client: reqwest::Client,
    url: Url,
    /// MD5 hex digest of the configured shared secret, the token form the
    /// sink validates against.
    api_key: String,
    retries: u32,
    retry_wait: Duration,
    response_buffer: usize,
    shutdown: CancellationToken,
}

impl SheetClient {
    /// Builds the client, validating the endpoint URL and fixing the
    /// request timeout up front.
    pub fn new(
        settings: &SheetSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, SheetConfigError> {
        let url = Url::parse(&settings.url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            api_key: format!("{:x}", md5::compute(settings.api_key.as_bytes())),
            retries: settings.retries,
            retry_wait: Duration::from_secs(settings.retry_wait_secs),
            response_buffer: settings.response_buffer,
            shutdown,
        })
    }

    /// Delivers one record, retrying transient faults up to the configured
    /// budget with a fixed wait between attempts.
    pub async fn send(&self, record: &OutputRecord) -> DeliveryOutcome {
        let mut form = record.fields().to_vec();
        form.push((API_KEY_FIELD.to_owned(), self.api_key.clone()));

        let mut attempts_left = self.retries;
        while attempts_left > 0 {
            attempts_left -= 1;
            match self.attempt(&form).await {
                Attempt::Accepted(body) => return self.interpret(&body),
                Attempt::Transient(reason) => {
                    debug!(%reason, attempts_left, "transient failure posting to sheet");
                    if attempts_left == 0 {
                        break;
                    }
                    // Shutdown must not wait out the remaining budget.
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_wait) => {}
                        _ = self.shutdown.cancelled() => {
                            debug!("shutdown requested, abandoning delivery");
                            return DeliveryOutcome::Unreachable;
                        }
                    }
                }
            }
        }
        warn!(retries = self.retries, "sheet unreachable, retry budget exhausted");
        DeliveryOutcome::Unreachable
    }

    /// One POST. Non-200 statuses are folded into the transient path: the
    /// sink exposes its own infrastructure failures that way.
    async fn attempt(&self, form: &[(String, String)]) -> Attempt {
        let response = match self.client.post(self.url.clone()).form(&form).send().await {
            Ok(response) => response,
            Err(error) => return Attempt::Transient(error.to_string()),
        };
        let status = response.status();
        if status != StatusCode::OK {
            return Attempt::Transient(format!("sink returned status {status}"));
        }
        match read_prefix(response, self.response_buffer).await {
            Ok(body) => Attempt::Accepted(body),
            Err(error) => Attempt::Transient(format!("failed reading response body: {error}")),
        }
    }

    /// Interprets the sink's application-level acknowledgment.
    fn interpret(&self, body: &[u8]) -> DeliveryOutcome {
        match serde_json::from_slice::<SheetAck>(body) {
            Ok(ack) if ack.result == "success" => {
                debug!("sheet acknowledged the update");
                DeliveryOutcome::Delivered
            }
            Ok(ack) => {
                warn!(result = %ack.result, "sheet rejected the update");
                DeliveryOutcome::Rejected(ack.result)
            }
            Err(_) => {
                let snippet = String::from_utf8_lossy(body).into_owned();
                warn!(body = %snippet, "sheet returned an unparseable acknowledgment");
                DeliveryOutcome::Rejected(snippet)
            }
        }
    }
}

/// Reads at most `cap` bytes of the response body, dropping the rest, so a
/// misbehaving sink cannot balloon memory.
async fn read_prefix(response: reqwest::Response, cap: usize) -> reqwest::Result<Vec<u8>> {
    let mut stream = response.bytes_stream();
    let mut buffer = Vec::with_capacity(cap.min(4096));
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let remaining = cap - buffer.len();
        if chunk.len() >= remaining {
            buffer.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}
