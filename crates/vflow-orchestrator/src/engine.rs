//! Shared handles every stage and batch runs against.

use std::sync::Arc;

use tracing::{debug, info, warn};

use vflow_capabilities::{
    Capabilities, CapabilityClientConfig, HttpCapabilityClient, NoopNotifier, Notifier, WebhookNotifier,
};
use vflow_datastore::{DataStore, DataStoreClient};
use vflow_models::{DashboardEvent, WorkItem};
use vflow_storage::{FileRemover, NoopRemover, StorageClient};

use crate::config::OrchestratorConfig;
use crate::context::OrchestrationContext;
use crate::error::OrchestratorResult;
use crate::store::WorkItemStore;

/// External collaborators the orchestrator calls.
pub struct Services {
    pub data: Arc<dyn DataStore>,
    pub capabilities: Arc<dyn Capabilities>,
    pub files: Arc<dyn FileRemover>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    /// Build the HTTP clients from environment variables.
    ///
    /// The data layer is required. Without storage credentials superseded
    /// files are kept; without a webhook URL notifications are dropped.
    pub fn from_env() -> OrchestratorResult<Self> {
        let data = DataStoreClient::from_env()?;

        let capability_config = CapabilityClientConfig::from_env();
        let notifier: Arc<dyn Notifier> = match capability_config.notify_webhook_url.clone() {
            Some(url) => Arc::new(WebhookNotifier::new(url)?),
            None => {
                info!("NOTIFY_WEBHOOK_URL not set, notifications disabled");
                Arc::new(NoopNotifier)
            }
        };
        let capabilities = HttpCapabilityClient::new(capability_config)?;

        let files: Arc<dyn FileRemover> = match StorageClient::from_env() {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!("Object storage not configured, superseded files are kept: {}", e);
                Arc::new(NoopRemover)
            }
        };

        Ok(Self {
            data: Arc::new(data),
            capabilities: Arc::new(capabilities),
            files,
            notifier,
        })
    }
}

/// Orchestration context, store, services and config in one cheap handle.
#[derive(Clone)]
pub struct Engine {
    pub ctx: Arc<OrchestrationContext>,
    pub store: Arc<WorkItemStore>,
    pub services: Arc<Services>,
    pub config: Arc<OrchestratorConfig>,
}

impl Engine {
    pub fn new(services: Services, config: OrchestratorConfig) -> Self {
        let ctx = Arc::new(OrchestrationContext::new(config.event_buffer));
        let store = Arc::new(WorkItemStore::new(services.data.clone()));
        Self {
            ctx,
            store,
            services: Arc::new(services),
            config: Arc::new(config),
        }
    }

    pub fn data(&self) -> &dyn DataStore {
        self.services.data.as_ref()
    }

    pub fn capabilities(&self) -> &dyn Capabilities {
        self.services.capabilities.as_ref()
    }

    pub fn files(&self) -> &dyn FileRemover {
        self.services.files.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.services.notifier.as_ref()
    }

    /// Refetch videos and scenes and tell the UI.
    pub async fn refresh_and_report(&self) -> OrchestratorResult<()> {
        let (videos, scenes) = self.store.refresh().await?;
        self.ctx.emit(DashboardEvent::DataRefreshed { videos, scenes });
        Ok(())
    }

    /// Delete a file replaced by `new_url`, unless it is the same file or the
    /// video's original upload. Returns whether anything was deleted.
    pub async fn supersede(&self, video: &WorkItem, old_url: Option<&str>, new_url: &str) -> bool {
        match old_url {
            Some(old) if old != new_url && !video.is_original_upload(old) => {
                self.files().delete_stored_file(old).await
            }
            Some(old) => {
                debug!(video_id = %video.id, url = %old, "Keeping file");
                false
            }
            None => false,
        }
    }
}
