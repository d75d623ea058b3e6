//! Drag-to-reorder for the video list.

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use vflow_models::{DashboardEvent, VideoId, VideoPatch, WorkItem};

use crate::engine::Engine;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::metrics;

/// Move `dragged` to the position of `target` and renumber the whole list.
///
/// The dragged entry is removed and reinserted at the target's original
/// index. Every entry then gets `order = 1 + position`, so the result is
/// always a dense `1..=N` sequence.
pub fn compute_reorder(items: &[WorkItem], dragged: VideoId, target: VideoId) -> OrchestratorResult<Vec<(VideoId, i64)>> {
    if dragged == target {
        return Err(OrchestratorError::invalid_reorder("cannot drop an item onto itself"));
    }
    let from = items
        .iter()
        .position(|v| v.id == dragged)
        .ok_or_else(|| OrchestratorError::invalid_reorder(format!("unknown video {}", dragged)))?;
    let to = items
        .iter()
        .position(|v| v.id == target)
        .ok_or_else(|| OrchestratorError::invalid_reorder(format!("unknown video {}", target)))?;

    let mut ids: Vec<VideoId> = items.iter().map(|v| v.id).collect();
    let moved = ids.remove(from);
    ids.insert(to, moved);

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i as i64 + 1))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReorderOutcome {
    /// Every changed order was persisted.
    Applied { orders: Vec<(VideoId, i64)>, persisted: usize },
    /// A write failed; local state was replaced by a fresh fetch.
    Reverted { failed: usize },
}

/// Applies reorders optimistically and rolls back by refetching.
pub struct ReorderCoordinator<'a> {
    engine: &'a Engine,
}

impl<'a> ReorderCoordinator<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Reorder the list as currently presented, fetching it first if the
    /// store has never been loaded.
    pub async fn reorder_presented(&self, dragged: VideoId, target: VideoId) -> OrchestratorResult<ReorderOutcome> {
        let mut items = self.engine.store.videos();
        if items.is_empty() {
            items = self.engine.store.refresh_videos().await?;
        }
        self.reorder(&items, dragged, target).await
    }

    /// Reorder `items` (in presentation order).
    ///
    /// Only rows whose order changed are written, all at once. If any write
    /// fails the canonical list is refetched.
    pub async fn reorder(&self, items: &[WorkItem], dragged: VideoId, target: VideoId) -> OrchestratorResult<ReorderOutcome> {
        let orders = compute_reorder(items, dragged, target)?;
        let changed: Vec<(VideoId, i64)> = orders
            .iter()
            .filter(|(id, order)| {
                items
                    .iter()
                    .find(|v| v.id == *id)
                    .map_or(true, |v| v.order != Some(*order))
            })
            .copied()
            .collect();

        let store = &self.engine.store;
        store.apply_orders(&orders);
        self.engine.ctx.emit(DashboardEvent::OrderChanged { orders: orders.clone() });

        let data = self.engine.data();
        let writes = changed.iter().map(|(id, order)| async move {
            data.update_video(*id, &VideoPatch::order(*order))
                .await
                .map_err(|e| (*id, e))
        });
        let failures: Vec<_> = join_all(writes).await.into_iter().filter_map(Result::err).collect();

        if failures.is_empty() {
            metrics::record_reorder("applied");
            info!(dragged = %dragged, target = %target, persisted = changed.len(), "Reorder applied");
            return Ok(ReorderOutcome::Applied {
                orders,
                persisted: changed.len(),
            });
        }

        for (id, e) in &failures {
            warn!(video_id = %id, "Failed to persist order: {}", e);
        }
        metrics::record_reorder("reverted");

        let videos = store.refresh_videos().await?;
        let canonical = videos.iter().map(|v| (v.id, v.effective_order())).collect();
        self.engine.ctx.emit(DashboardEvent::OrderChanged { orders: canonical });
        self.engine.ctx.emit(DashboardEvent::DataRefreshed {
            videos: videos.len(),
            scenes: store.scenes().len(),
        });
        Ok(ReorderOutcome::Reverted { failed: failures.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use std::collections::BTreeMap;

    fn video(id: i64, order: i64) -> WorkItem {
        let mut v = WorkItem::new(id);
        v.order = Some(order);
        v
    }

    fn as_map(orders: &[(VideoId, i64)]) -> BTreeMap<i64, i64> {
        orders.iter().map(|(id, o)| (id.get(), *o)).collect()
    }

    #[test]
    fn test_drag_first_onto_second() {
        let items = vec![video(1, 3), video(2, 1), video(3, 2)];
        let orders = compute_reorder(&items, VideoId(1), VideoId(2)).unwrap();
        assert_eq!(as_map(&orders), BTreeMap::from([(2, 1), (1, 2), (3, 3)]));
    }

    #[test]
    fn test_drag_backwards_moves_before_target() {
        let items = vec![video(1, 1), video(2, 2), video(3, 3), video(4, 4)];
        let orders = compute_reorder(&items, VideoId(4), VideoId(2)).unwrap();
        let ids: Vec<i64> = orders.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_orders_are_dense_even_with_gaps_and_duplicates() {
        let items = vec![video(5, 10), video(6, 10), video(7, 40), video(8, 2)];
        let orders = compute_reorder(&items, VideoId(8), VideoId(5)).unwrap();

        let mut ids: Vec<i64> = orders.iter().map(|(id, _)| id.get()).collect();
        ids.sort();
        assert_eq!(ids, vec![5, 6, 7, 8]);
        let values: Vec<i64> = orders.iter().map(|(_, o)| *o).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_requests() {
        let items = vec![video(1, 1), video(2, 2)];
        assert!(matches!(
            compute_reorder(&items, VideoId(1), VideoId(1)),
            Err(OrchestratorError::InvalidReorder(_))
        ));
        tokio_test::assert_err!(compute_reorder(&items, VideoId(9), VideoId(1)));
        tokio_test::assert_err!(compute_reorder(&items, VideoId(1), VideoId(9)));
    }

    #[tokio::test]
    async fn test_reorder_persists_only_changed_rows() {
        let items = vec![video(1, 1), video(2, 2), video(3, 3)];
        let harness = TestHarness::new(items.clone(), vec![]);
        harness.engine.store.refresh_videos().await.unwrap();

        let outcome = ReorderCoordinator::new(&harness.engine)
            .reorder(&items, VideoId(1), VideoId(2))
            .await
            .unwrap();

        assert!(matches!(outcome, ReorderOutcome::Applied { persisted: 2, .. }));
        let mut written: Vec<i64> = harness.data.video_updates().iter().map(|(id, _)| id.get()).collect();
        written.sort();
        assert_eq!(written, vec![1, 2]);

        let ids: Vec<i64> = harness.engine.store.videos().iter().map(|v| v.id.get()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_failed_write_reverts_to_server_state() {
        let items = vec![video(1, 1), video(2, 2), video(3, 3)];
        let harness = TestHarness::new(items.clone(), vec![]);
        harness.data.fail_updates_for(VideoId(2));
        let mut rx = harness.engine.ctx.subscribe();

        let outcome = ReorderCoordinator::new(&harness.engine)
            .reorder_presented(VideoId(1), VideoId(2))
            .await
            .unwrap();

        assert_eq!(outcome, ReorderOutcome::Reverted { failed: 1 });
        // Only the write for video 1 landed; the refetch shows exactly that.
        let stored: Vec<(i64, Option<i64>)> = harness
            .engine
            .store
            .videos()
            .iter()
            .map(|v| (v.id.get(), v.order))
            .collect();
        assert_eq!(stored, vec![(1, Some(2)), (2, Some(2)), (3, Some(3))]);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.last(), Some(DashboardEvent::DataRefreshed { videos: 3, .. })));
    }
}
