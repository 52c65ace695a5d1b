//! Remote indexing API client
//!
//! Each call publishes one URL notification. Failures are classified so the
//! engine can decide between retrying, giving up on the URL, refreshing the
//! credential, or stopping the run:
//!
//! | Response | Kind |
//! |----------|------|
//! | Timeout, connection error | Transient |
//! | HTTP 408, 5xx | Transient |
//! | HTTP 429 (rate limit) | Transient |
//! | HTTP 429 naming a per-day quota | QuotaExhausted |
//! | HTTP 401 | Unauthorized |
//! | Any other 4xx | Permanent |

use crate::config::Operation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Longest error body excerpt kept in a message
const MAX_MESSAGE_LEN: usize = 300;

/// How the engine should react to a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Worth retrying after a backoff
    Transient,
    /// The request itself is unacceptable; retrying will not help
    Permanent,
    /// The access token was refused
    Unauthorized,
    /// The provider's daily quota is used up
    QuotaExhausted,
}

/// A failed publish call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// HTTP status, if a response was received
    pub status: Option<u16>,
    pub message: String,
    /// Server-requested delay before the next attempt
    pub retry_after: Option<Duration>,
}

impl RemoteError {
    fn transport(error: reqwest::Error) -> Self {
        let kind = if error.is_builder() {
            RemoteErrorKind::Permanent
        } else {
            RemoteErrorKind::Transient
        };
        let message = if error.is_timeout() {
            format!("request timed out: {}", error)
        } else {
            format!("request failed: {}", error)
        };
        Self {
            kind,
            status: None,
            message,
            retry_after: None,
        }
    }
}

/// Publishes URL notifications to the indexing service
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Notifies the service about `url`, returning the notification time it reports
    async fn publish(
        &self,
        url: &str,
        operation: Operation,
        access_token: &str,
    ) -> Result<DateTime<Utc>, RemoteError>;
}

/// [`IndexClient`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpIndexClient {
    client: Client,
    endpoint: String,
}

impl HttpIndexClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn publish(
        &self,
        url: &str,
        operation: Operation,
        access_token: &str,
    ) -> Result<DateTime<Utc>, RemoteError> {
        let body = json!({
            "url": url,
            "type": operation.notification_type(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(RemoteError::transport)?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.map_err(RemoteError::transport)?;

        if (200..300).contains(&status) {
            return Ok(parse_notify_time(&text, operation).unwrap_or_else(Utc::now));
        }

        Err(classify(status, &text, retry_after))
    }
}

/// Classifies a non-success response
pub fn classify(status: u16, body: &str, retry_after: Option<Duration>) -> RemoteError {
    let kind = match status {
        401 => RemoteErrorKind::Unauthorized,
        429 if names_daily_quota(body) => RemoteErrorKind::QuotaExhausted,
        408 | 429 | 500..=599 => RemoteErrorKind::Transient,
        _ => RemoteErrorKind::Permanent,
    };

    RemoteError {
        kind,
        status: Some(status),
        message: format!("HTTP {}: {}", status, error_message(body)),
        retry_after,
    }
}

fn names_daily_quota(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("per day") || lower.contains("perday") || lower.contains("dailylimitexceeded")
}

/// Extracts `error.message` from a JSON error body, else a trimmed excerpt
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return "<empty body>".to_string();
    }
    message.chars().take(MAX_MESSAGE_LEN).collect()
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Reads `urlNotificationMetadata.latestUpdate|latestRemove.notifyTime`
fn parse_notify_time(body: &str, operation: Operation) -> Option<DateTime<Utc>> {
    let value: Value = serde_json::from_str(body).ok()?;
    let metadata = value.get("urlNotificationMetadata")?;
    let key = match operation {
        Operation::Register => "latestUpdate",
        Operation::Delete => "latestRemove",
    };
    let notify_time = metadata.get(key)?.get("notifyTime")?.as_str()?;
    DateTime::parse_from_rfc3339(notify_time)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}
