//! Best-effort deletion of superseded artifacts.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::StorageClient;

/// Deletes stored files by their public URL.
///
/// Deletion is best-effort: failures are logged and reported as `false`,
/// never raised.
#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn delete_stored_file(&self, url: &str) -> bool;
}

#[async_trait]
impl FileRemover for StorageClient {
    async fn delete_stored_file(&self, url: &str) -> bool {
        let key = match self.key_for_url(url) {
            Ok(key) => key,
            Err(e) => {
                warn!(url = %url, "Cannot delete stored file: {}", e);
                return false;
            }
        };

        match self.delete_object(&key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(url = %url, key = %key, "Failed to delete stored file: {}", e);
                false
            }
        }
    }
}

/// A remover that deletes nothing, for runs without storage credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRemover;

#[async_trait]
impl FileRemover for NoopRemover {
    async fn delete_stored_file(&self, url: &str) -> bool {
        debug!(url = %url, "Storage not configured, keeping file");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_remover_reports_nothing_deleted() {
        assert!(!NoopRemover.delete_stored_file("https://cdn.test/a.mp4").await);
    }

    #[tokio::test]
    async fn test_foreign_url_is_not_deleted() {
        let client = StorageClient::new(crate::client::StorageConfig {
            endpoint_url: "http://127.0.0.1:1".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "media".to_string(),
            region: "auto".to_string(),
            public_base_url: None,
        });
        assert!(!client.delete_stored_file("not a url").await);
    }
}
