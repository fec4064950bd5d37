use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::settings::ChannelCredentials;

/// Default WhatsApp Cloud API base.
const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

/// The consumed outbound transport capability. Credentials come from the
/// settings singleton on every call so an update takes effect without a
/// restart.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Send a text message. Returns the platform's delivery id.
    async fn send(
        &self,
        credentials: &ChannelCredentials,
        to: &str,
        text: &str,
    ) -> Result<String>;

    /// Mark an inbound message as read. Best-effort for callers; failures
    /// here are never escalated past a log line.
    async fn mark_read(
        &self,
        credentials: &ChannelCredentials,
        channel_message_id: &str,
    ) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessageId>,
}

#[derive(Debug, Deserialize)]
struct SentMessageId {
    id: String,
}

/// WhatsApp Cloud API client (graph.facebook.com).
pub struct CloudApiChannel {
    client: reqwest::Client,
    base_url: String,
}

impl CloudApiChannel {
    pub fn new() -> Self {
        Self::with_base_url(GRAPH_API_BASE.to_string())
    }

    /// Override the API base; used by tests to point at a local mock server.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
        }
    }

    fn messages_url(&self, credentials: &ChannelCredentials) -> String {
        format!("{}/{}/messages", self.base_url, credentials.phone_number_id)
    }
}

impl Default for CloudApiChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutboundChannel for CloudApiChannel {
    async fn send(
        &self,
        credentials: &ChannelCredentials,
        to: &str,
        text: &str,
    ) -> Result<String> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {"body": text, "preview_url": false}
        });

        debug!("cloud api send: to={}, content_len={}", to, text.len());
        let response = self
            .client
            .post(self.messages_url(credentials))
            .bearer_auth(&credentials.access_token)
            .json(&payload)
            .send()
            .await
            .context("cloud api send request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("cloud api send returned {}: {}", status, body));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .context("cloud api send response was not valid JSON")?;
        let delivery_id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| anyhow!("cloud api send response carried no message id"))?;

        info!("cloud api message sent to {}: id={}", to, delivery_id);
        Ok(delivery_id)
    }

    async fn mark_read(
        &self,
        credentials: &ChannelCredentials,
        channel_message_id: &str,
    ) -> Result<()> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": channel_message_id
        });

        let response = self
            .client
            .post(self.messages_url(credentials))
            .bearer_auth(&credentials.access_token)
            .json(&payload)
            .send()
            .await
            .context("cloud api mark-read request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("cloud api mark-read returned {}: {}", status, body));
        }
        debug!("marked {} as read", channel_message_id);
        Ok(())
    }
}
