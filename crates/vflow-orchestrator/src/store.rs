//! Refreshable snapshot of the work items and their scenes.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use vflow_datastore::DataStore;
use vflow_models::{sort_by_order, SceneItem, VideoId, WorkItem};

use crate::error::OrchestratorResult;

/// In-memory copy of the data layer's collections.
///
/// Never a live view: callers refetch after writes. Videos are kept in
/// presentation order, scenes in `(video, id)` order.
pub struct WorkItemStore {
    data: Arc<dyn DataStore>,
    videos: RwLock<Vec<WorkItem>>,
    scenes: RwLock<Vec<SceneItem>>,
}

impl WorkItemStore {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self {
            data,
            videos: RwLock::new(Vec::new()),
            scenes: RwLock::new(Vec::new()),
        }
    }

    pub fn data(&self) -> &Arc<dyn DataStore> {
        &self.data
    }

    /// Refetch the videos and return the new snapshot.
    pub async fn refresh_videos(&self) -> OrchestratorResult<Vec<WorkItem>> {
        let mut videos = self.data.fetch_all().await?;
        sort_by_order(&mut videos);
        *self.videos.write() = videos.clone();
        debug!(videos = videos.len(), "Refreshed videos");
        Ok(videos)
    }

    /// Refetch the scenes and return the new snapshot.
    pub async fn refresh_scenes(&self) -> OrchestratorResult<Vec<SceneItem>> {
        let mut scenes = self.data.fetch_scenes().await?;
        scenes.sort_by_key(|s| (s.video_id, s.id));
        *self.scenes.write() = scenes.clone();
        debug!(scenes = scenes.len(), "Refreshed scenes");
        Ok(scenes)
    }

    /// Refetch both collections. Returns `(videos, scenes)` counts.
    pub async fn refresh(&self) -> OrchestratorResult<(usize, usize)> {
        let videos = self.refresh_videos().await?.len();
        let scenes = self.refresh_scenes().await?.len();
        Ok((videos, scenes))
    }

    pub fn videos(&self) -> Vec<WorkItem> {
        self.videos.read().clone()
    }

    pub fn scenes(&self) -> Vec<SceneItem> {
        self.scenes.read().clone()
    }

    pub fn video(&self, id: VideoId) -> Option<WorkItem> {
        self.videos.read().iter().find(|v| v.id == id).cloned()
    }

    pub fn scenes_of(&self, video_id: VideoId) -> Vec<SceneItem> {
        self.scenes
            .read()
            .iter()
            .filter(|s| s.video_id == video_id)
            .cloned()
            .collect()
    }

    /// Overwrite local `order` values without persisting, then re-sort.
    pub fn apply_orders(&self, orders: &[(VideoId, i64)]) {
        let mut videos = self.videos.write();
        for (id, order) in orders {
            if let Some(video) = videos.iter_mut().find(|v| v.id == *id) {
                video.order = Some(*order);
            }
        }
        sort_by_order(&mut videos);
    }
}
