//! Chat-style notifications.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{CapabilityError, CapabilityResult};

/// Sends a short human-readable message to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> CapabilityResult<()>;
}

/// Posts `{"text": message}` (also mirrored as `content`) to a webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> CapabilityResult<Self> {
        let http = Client::builder().build().map_err(CapabilityError::Network)?;
        Ok(Self { http, url: url.into() })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> CapabilityResult<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "text": message, "content": message }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::request_failed("notify", status.as_u16(), body));
        }

        info!("Notification sent");
        Ok(())
    }
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: &str) -> CapabilityResult<()> {
        debug!(message = %message, "Notifications disabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_webhook_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({"text": "done", "content": "done"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.uri())).unwrap();
        notifier.notify("done").await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri()).unwrap();
        assert!(notifier.notify("done").await.is_err());
    }
}
