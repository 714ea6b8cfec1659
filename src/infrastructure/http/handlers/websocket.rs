//! WebSocket Handler - 会话事件推送

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::application::NovelEvent;
use crate::domain::novel::SessionId;
use crate::infrastructure::http::state::AppState;

/// 会话 WebSocket（流式内容、通知、批量进度）
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session_socket(socket, session_id, state))
}

/// 全局 WebSocket（书库变化、生成开始/结束）
pub async fn global_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_global_socket(socket, state))
}

async fn handle_session_socket(socket: WebSocket, session_id: String, state: Arc<AppState>) {
    let (mut sender, receiver) = socket.split();

    if state.store.snapshot(&SessionId::from(session_id.as_str())).is_none() {
        tracing::warn!(session_id = %session_id, "WebSocket connection rejected: unknown session");
        let _ = sender.close().await;
        return;
    }

    let event_rx = state.event_publisher.register_session(&session_id);
    tracing::info!(session_id = %session_id, "WebSocket connected");

    pump(sender, receiver, event_rx, &session_id).await;

    state.event_publisher.unregister_session(&session_id);
    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}

async fn handle_global_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    let event_rx = state.event_publisher.subscribe_global();

    tracing::info!("Global WebSocket connected");
    pump(sender, receiver, event_rx, "global").await;
    tracing::info!("Global WebSocket disconnected");
}

/// 转发事件直到任一方向关闭
async fn pump(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut event_rx: broadcast::Receiver<NovelEvent>,
    channel: &str,
) {
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        // 界面会按 revision 重新查询，丢弃积压即可
                        tracing::warn!(channel = %channel, skipped = skipped, "WebSocket subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let msg = match serde_json::to_string(&event) {
                    Ok(json) => Message::Text(json),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize event");
                        continue;
                    }
                };
                if let Err(e) = sender.send(msg).await {
                    tracing::debug!(channel = %channel, error = %e, "Failed to send WebSocket message");
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(channel = %channel, "WebSocket closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(channel = %channel, error = %e, "WebSocket error");
                        break;
                    }
                    // Ping 由 axum 自动回复 Pong
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
