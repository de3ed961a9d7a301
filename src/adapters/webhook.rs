//! Webhook publisher: POSTs the channel payload to an HTTP endpoint.
//!
//! Auth: optional Bearer token. Expects a 2xx response; a JSON body with an
//! `id` field is used as the external post id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::{ChannelAdapter, ChannelKind};
use crate::domain::GeneratedContent;

/// Channel adapter that delivers payloads to a webhook
pub struct WebhookChannel {
    channel_id: String,
    kind: ChannelKind,
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

/// Response body (all fields optional)
#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    id: Option<String>,
}

impl WebhookChannel {
    pub fn new(
        channel_id: impl Into<String>,
        kind: ChannelKind,
        endpoint: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            kind,
            endpoint: endpoint.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChannelAdapter for WebhookChannel {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    async fn post(&self, content: &GeneratedContent) -> Result<String> {
        let payload = self.kind.payload(content);

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload);

        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} post to webhook", self.channel_id))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook error for {} ({}): {}", self.channel_id, status, text);
        }

        // Body is optional; fall back to a local id
        let text = response.text().await.unwrap_or_default();
        let id = serde_json::from_str::<WebhookResponse>(&text)
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| format!("{}-{}", self.channel_id, Uuid::new_v4()));

        Ok(id)
    }
}
