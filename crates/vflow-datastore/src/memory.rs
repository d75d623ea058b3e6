//! In-memory data store.
//!
//! Used for local runs without a database and as the backing store in tests.
//! Failures can be injected per row to exercise error paths.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use vflow_models::{SceneId, ScenePatch, SceneItem, VideoId, VideoPatch, WorkItem};

use crate::error::{DataStoreError, DataStoreResult};
use crate::store::DataStore;

#[derive(Default)]
struct Inner {
    videos: BTreeMap<VideoId, WorkItem>,
    scenes: BTreeMap<SceneId, SceneItem>,
    failing_video_updates: HashSet<VideoId>,
    failing_scene_updates: HashSet<SceneId>,
    fail_fetches: bool,
    video_updates: Vec<(VideoId, VideoPatch)>,
    scene_updates: Vec<(SceneId, ScenePatch)>,
}

/// A [`DataStore`] backed by maps in memory.
#[derive(Default)]
pub struct InMemoryDataStore {
    inner: Mutex<Inner>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(videos: Vec<WorkItem>, scenes: Vec<SceneItem>) -> Self {
        let store = Self::new();
        for video in videos {
            store.insert_video(video);
        }
        for scene in scenes {
            store.insert_scene(scene);
        }
        store
    }

    pub fn insert_video(&self, video: WorkItem) {
        self.inner.lock().videos.insert(video.id, video);
    }

    pub fn insert_scene(&self, scene: SceneItem) {
        self.inner.lock().scenes.insert(scene.id, scene);
    }

    pub fn video(&self, id: VideoId) -> Option<WorkItem> {
        self.inner.lock().videos.get(&id).cloned()
    }

    pub fn scene(&self, id: SceneId) -> Option<SceneItem> {
        self.inner.lock().scenes.get(&id).cloned()
    }

    pub fn scenes_of(&self, video_id: VideoId) -> Vec<SceneItem> {
        self.inner
            .lock()
            .scenes
            .values()
            .filter(|s| s.video_id == video_id)
            .cloned()
            .collect()
    }

    /// Make every update of this video fail.
    pub fn fail_updates_for(&self, id: VideoId) {
        self.inner.lock().failing_video_updates.insert(id);
    }

    /// Make every update of this scene fail.
    pub fn fail_scene_updates_for(&self, id: SceneId) {
        self.inner.lock().failing_scene_updates.insert(id);
    }

    /// Make list calls fail.
    pub fn set_fail_fetches(&self, fail: bool) {
        self.inner.lock().fail_fetches = fail;
    }

    /// Every video update persisted so far, in call order.
    pub fn video_updates(&self) -> Vec<(VideoId, VideoPatch)> {
        self.inner.lock().video_updates.clone()
    }

    /// Every scene update persisted so far, in call order.
    pub fn scene_updates(&self) -> Vec<(SceneId, ScenePatch)> {
        self.inner.lock().scene_updates.clone()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn fetch_all(&self) -> DataStoreResult<Vec<WorkItem>> {
        let inner = self.inner.lock();
        if inner.fail_fetches {
            return Err(DataStoreError::from_http_status(500, "videos: injected failure"));
        }
        Ok(inner.videos.values().cloned().collect())
    }

    async fn fetch_scenes(&self) -> DataStoreResult<Vec<SceneItem>> {
        let inner = self.inner.lock();
        if inner.fail_fetches {
            return Err(DataStoreError::from_http_status(500, "scenes: injected failure"));
        }
        Ok(inner.scenes.values().cloned().collect())
    }

    async fn update_video(&self, id: VideoId, patch: &VideoPatch) -> DataStoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.failing_video_updates.contains(&id) {
            return Err(DataStoreError::request_failed(format!("videos/{}: injected failure", id)));
        }
        let video = inner
            .videos
            .get_mut(&id)
            .ok_or_else(|| DataStoreError::not_found(format!("videos/{}", id)))?;
        video.apply(patch);
        inner.video_updates.push((id, patch.clone()));
        Ok(())
    }

    async fn update_scene(&self, id: SceneId, patch: &ScenePatch) -> DataStoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.failing_scene_updates.contains(&id) {
            return Err(DataStoreError::request_failed(format!("scenes/{}: injected failure", id)));
        }
        let scene = inner
            .scenes
            .get_mut(&id)
            .ok_or_else(|| DataStoreError::not_found(format!("scenes/{}", id)))?;
        scene.apply(patch);
        inner.scene_updates.push((id, patch.clone()));
        Ok(())
    }

    async fn delete_video(&self, id: VideoId) -> DataStoreResult<()> {
        let mut inner = self.inner.lock();
        inner.videos.remove(&id);
        inner.scenes.retain(|_, s| s.video_id != id);
        Ok(())
    }

    async fn delete_scene(&self, id: SceneId) -> DataStoreResult<()> {
        self.inner.lock().scenes.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_applies_and_logs() {
        let store = InMemoryDataStore::with_items(vec![WorkItem::new(1)], vec![]);
        store.update_video(VideoId(1), &VideoPatch::order(4)).await.unwrap();

        assert_eq!(store.video(VideoId(1)).unwrap().order, Some(4));
        assert_eq!(store.video_updates(), vec![(VideoId(1), VideoPatch::order(4))]);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = InMemoryDataStore::new();
        let err = store.update_video(VideoId(9), &VideoPatch::order(1)).await.unwrap_err();
        assert!(matches!(err, DataStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_video_cascades_scenes() {
        let store = InMemoryDataStore::with_items(
            vec![WorkItem::new(1), WorkItem::new(2)],
            vec![SceneItem::new(10, 1), SceneItem::new(11, 2)],
        );
        store.delete_video(VideoId(1)).await.unwrap();

        let scenes = store.fetch_scenes().await.unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].id, SceneId(11));
        // Deleting again is fine.
        store.delete_video(VideoId(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryDataStore::with_items(vec![WorkItem::new(1)], vec![]);
        store.fail_updates_for(VideoId(1));
        assert!(store.update_video(VideoId(1), &VideoPatch::order(2)).await.is_err());

        store.set_fail_fetches(true);
        assert!(store.fetch_all().await.is_err());
    }
}
