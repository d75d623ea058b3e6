//! The data-layer seam used by the orchestration core.

use async_trait::async_trait;

use vflow_models::{SceneId, ScenePatch, SceneItem, VideoId, VideoPatch, WorkItem};

use crate::error::DataStoreResult;

/// Row fetch/update/delete over the videos and scenes tables.
///
/// Reads are snapshots: callers refetch rather than subscribe.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch every work item.
    async fn fetch_all(&self) -> DataStoreResult<Vec<WorkItem>>;

    /// Fetch every scene.
    async fn fetch_scenes(&self) -> DataStoreResult<Vec<SceneItem>>;

    /// Persist a partial update of a work item.
    async fn update_video(&self, id: VideoId, patch: &VideoPatch) -> DataStoreResult<()>;

    /// Persist a partial update of a scene.
    async fn update_scene(&self, id: SceneId, patch: &ScenePatch) -> DataStoreResult<()>;

    /// Delete a work item. Deleting a missing row succeeds.
    async fn delete_video(&self, id: VideoId) -> DataStoreResult<()>;

    /// Delete a scene. Deleting a missing row succeeds.
    async fn delete_scene(&self, id: SceneId) -> DataStoreResult<()>;
}
