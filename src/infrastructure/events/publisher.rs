//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{EventSinkPort, NovelEvent};

const CHANNEL_CAPACITY: usize = 256;

/// 事件发布器
pub struct EventPublisher {
    /// session_id -> broadcast sender (for session-specific events)
    session_channels: DashMap<String, broadcast::Sender<NovelEvent>>,
    /// 书库级事件（会话变更、删除），供列表页订阅
    global_channel: broadcast::Sender<NovelEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            session_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<NovelEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅会话事件，通道不存在时创建
    pub fn register_session(&self, session_id: &str) -> broadcast::Receiver<NovelEvent> {
        self.session_channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 最后一个订阅者离开后移除通道
    pub fn unregister_session(&self, session_id: &str) {
        self.session_channels
            .remove_if(session_id, |_, sender| sender.receiver_count() == 0);
    }

    pub fn subscribe(&self, session_id: &str) -> Option<broadcast::Receiver<NovelEvent>> {
        self.session_channels.get(session_id).map(|s| s.subscribe())
    }

    fn publish_to_session(&self, event: &NovelEvent) {
        if let Some(sender) = self.session_channels.get(event.session_id()) {
            if let Err(e) = sender.send(event.clone()) {
                tracing::debug!(
                    session_id = %event.session_id(),
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }

    fn is_library_event(event: &NovelEvent) -> bool {
        matches!(
            event,
            NovelEvent::SessionChanged { .. }
                | NovelEvent::SessionDeleted { .. }
                | NovelEvent::GenerationStarted { .. }
                | NovelEvent::GenerationFinished { .. }
        )
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSinkPort for EventPublisher {
    fn publish(&self, event: NovelEvent) {
        self.publish_to_session(&event);

        if Self::is_library_event(&event) {
            // 没有订阅者时发送失败属正常情况
            let _ = self.global_channel.send(event.clone());
        }

        if let NovelEvent::SessionDeleted { session_id } = &event {
            self.session_channels.remove(session_id);
        }
    }
}
