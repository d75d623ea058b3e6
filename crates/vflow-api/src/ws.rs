//! Dashboard event stream over WebSocket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use vflow_models::DashboardEvent;

use crate::metrics;
use crate::state::AppState;

/// Upgrade to a socket that forwards every [`DashboardEvent`] as JSON text.
pub async fn ws_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before the upgrade so nothing emitted in between is missed
    let events = state.engine.ctx.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

async fn forward_events(socket: WebSocket, mut events: tokio::sync::broadcast::Receiver<DashboardEvent>) {
    metrics::record_ws_connection();
    info!("Event stream client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                    metrics::record_ws_message_sent(event_type(&event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream client lagging, events dropped");
                    metrics::record_ws_events_dropped(skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Event stream receive error: {}", e);
                    break;
                }
            },
        }
    }

    metrics::record_ws_disconnect();
    info!("Event stream client disconnected");
}

fn event_type(event: &DashboardEvent) -> &'static str {
    match event {
        DashboardEvent::BatchStarted { .. } => "batch_started",
        DashboardEvent::ItemStarted { .. } => "item_started",
        DashboardEvent::ItemFailed { .. } => "item_failed",
        DashboardEvent::BatchFinished { .. } => "batch_finished",
        DashboardEvent::ClipProgress { .. } => "clip_progress",
        DashboardEvent::SceneFailed { .. } => "scene_failed",
        DashboardEvent::StageStarted { .. } => "stage_started",
        DashboardEvent::PipelineCompleted { .. } => "pipeline_completed",
        DashboardEvent::PipelineFailed { .. } => "pipeline_failed",
        DashboardEvent::DataRefreshed { .. } => "data_refreshed",
        DashboardEvent::OrderChanged { .. } => "order_changed",
        DashboardEvent::Sound { .. } => "sound",
        DashboardEvent::Error { .. } => "error",
    }
}
