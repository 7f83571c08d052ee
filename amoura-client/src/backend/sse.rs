//! SSE consumer of the hosted realtime feed.
//!
//! The feed is a `text/event-stream` of JSON change events. An accepted
//! stream counts as the subscription acknowledgment; malformed events are
//! logged and dropped rather than ending the session.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use shared::config::Config;
use shared::models::{ChangeEvent, ChangeFilter, ClientError, ClientResult};

use super::{Realtime, Subscription};

/// Realtime collaborator backed by the hosted SSE endpoint.
#[derive(Debug, Clone)]
pub struct SseRealtime {
    http: reqwest::Client,
    base: Url,
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl SseRealtime {
    /// Builds a realtime client from the configuration and the caller's
    /// opaque auth token.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the configured backend URL does
    /// not parse.
    pub fn new(config: &Config, bearer_token: Option<String>) -> ClientResult<Self> {
        let base = Url::parse(&config.backend_url)
            .map_err(|err| ClientError::validation(format!("invalid backend URL: {err}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            api_key: config.api_key.clone(),
            bearer_token,
        })
    }

    fn changes_url(&self, filter: &ChangeFilter) -> ClientResult<Url> {
        let mut url = self
            .base
            .join("realtime/v1/changes")
            .map_err(|err| ClientError::validation(format!("invalid changes path: {err}")))?;

        url.query_pairs_mut().append_pair("table", &filter.table);
        if let Some(op) = filter.op {
            let op = serde_json::to_value(op).map_err(|err| ClientError::Decode {
                entity: "change_filter",
                message: err.to_string(),
            })?;
            if let Some(op) = op.as_str() {
                url.query_pairs_mut().append_pair("op", op);
            }
        }
        if let Some(conversation_id) = filter.conversation_id {
            url.query_pairs_mut()
                .append_pair("conversation_id", &conversation_id.to_string());
        }
        Ok(url)
    }
}

/// Extracts the payload of one SSE block: its `data:` lines joined with
/// newlines. Returns `None` for heartbeat/comment-only blocks.
fn event_data(block: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[async_trait]
impl Realtime for SseRealtime {
    async fn subscribe(&self, filter: ChangeFilter) -> ClientResult<Subscription> {
        let url = self.changes_url(&filter)?;

        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ClientError::subscription(format!("connect failed: {err}")))?;
        if !response.status().is_success() {
            return Err(ClientError::subscription(format!(
                "backend refused the channel: {}",
                response.status()
            )));
        }

        // From here on the channel is acknowledged; the stream ends on
        // transport failure or cancellation.
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            loop {
                let chunk = tokio::select! {
                    () = token.cancelled() => break,
                    chunk = bytes.next() => chunk,
                };
                let Some(chunk) = chunk else { break };
                let Ok(chunk) = chunk else {
                    // Transport error ends the subscription; the listener's
                    // reconnect loop owns recovery.
                    break;
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(boundary) = buffer.find("\n\n") {
                    let block: String = buffer.drain(..boundary + 2).collect();
                    let Some(data) = event_data(&block) else {
                        continue;
                    };
                    match serde_json::from_str::<ChangeEvent>(&data) {
                        Ok(event) if filter.matches(&event) => {
                            yield event;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(error = %err, "dropping malformed change event");
                        }
                    }
                }
            }
        };

        Ok(Subscription::new(Box::pin(stream), cancel))
    }
}
