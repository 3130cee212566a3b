// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook sink: posts operator status messages to a Feishu bot URL.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Request timeout for webhook posts.
const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from webhook delivery
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook returned HTTP {0}")]
    Status(u16),
    #[error("webhook transport error: {0}")]
    Transport(String),
}

/// Capability to post a text message to a webhook URL.
///
/// Implementations must not assume any dispatcher lock is held; payloads are
/// captured before the call and posts run lock-free.
#[async_trait]
pub trait WebhookSink: Clone + Send + Sync + 'static {
    async fn post(&self, url: &str, text: &str) -> Result<(), WebhookError>;
}

/// Feishu bot sink over HTTPS.
///
/// The payload is the Feishu text-message shape:
/// `{"msg_type": "text", "content": {"text": …}}`.
#[derive(Clone)]
pub struct HttpWebhookSink {
    client: reqwest::Client,
}

impl HttpWebhookSink {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(POST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpWebhookSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn post(&self, url: &str, text: &str) -> Result<(), WebhookError> {
        let payload = serde_json::json!({
            "msg_type": "text",
            "content": { "text": text },
        });
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::Status(status.as_u16()))
        }
    }
}

/// Sink that drops every message (for embeddings without a webhook).
#[derive(Clone, Default)]
pub struct NoopWebhookSink;

#[async_trait]
impl WebhookSink for NoopWebhookSink {
    async fn post(&self, _url: &str, _text: &str) -> Result<(), WebhookError> {
        Ok(())
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWebhookSink, WebhookCall};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{WebhookError, WebhookSink};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded webhook post
    #[derive(Debug, Clone)]
    pub struct WebhookCall {
        pub url: String,
        pub text: String,
    }

    #[derive(Default)]
    struct FakeWebhookState {
        calls: Vec<WebhookCall>,
        fail_with_status: Option<u16>,
        fail_with_transport: Option<String>,
    }

    /// Fake webhook sink for testing
    #[derive(Clone, Default)]
    pub struct FakeWebhookSink {
        inner: Arc<Mutex<FakeWebhookState>>,
    }

    impl FakeWebhookSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded posts
        pub fn calls(&self) -> Vec<WebhookCall> {
            self.inner.lock().calls.clone()
        }

        /// Make subsequent posts fail with the given HTTP status.
        pub fn fail_with_status(&self, status: Option<u16>) {
            self.inner.lock().fail_with_status = status;
        }

        /// Make subsequent posts fail with a transport error.
        pub fn fail_with_transport(&self, message: Option<String>) {
            self.inner.lock().fail_with_transport = message;
        }
    }

    #[async_trait]
    impl WebhookSink for FakeWebhookSink {
        async fn post(&self, url: &str, text: &str) -> Result<(), WebhookError> {
            let mut state = self.inner.lock();
            if let Some(status) = state.fail_with_status {
                return Err(WebhookError::Status(status));
            }
            if let Some(message) = &state.fail_with_transport {
                return Err(WebhookError::Transport(message.clone()));
            }
            state.calls.push(WebhookCall {
                url: url.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
