//! In-Memory Generation Slots Implementation

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{GenerationSlotPort, SlotError};
use crate::domain::novel::SessionId;

/// 每个会话一个生成槽位
pub struct InMemoryGenerationSlots {
    /// session_id -> 当前生成的取消令牌
    slots: DashMap<String, CancellationToken>,
}

impl InMemoryGenerationSlots {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for InMemoryGenerationSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationSlotPort for InMemoryGenerationSlots {
    fn try_acquire(&self, session_id: &SessionId) -> Result<CancellationToken, SlotError> {
        match self.slots.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(SlotError::Busy(session_id.clone())),
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(token.clone());
                tracing::debug!(session_id = %session_id, "Generation slot acquired");
                Ok(token)
            }
        }
    }

    fn release(&self, session_id: &SessionId) {
        if self.slots.remove(session_id.as_str()).is_some() {
            tracing::debug!(session_id = %session_id, "Generation slot released");
        }
    }

    fn cancel(&self, session_id: &SessionId) -> bool {
        match self.slots.get(session_id.as_str()) {
            Some(token) => {
                token.cancel();
                tracing::info!(session_id = %session_id, "Generation cancelled");
                true
            }
            None => false,
        }
    }

    fn is_generating(&self, session_id: &SessionId) -> bool {
        self.slots.contains_key(session_id.as_str())
    }
}
