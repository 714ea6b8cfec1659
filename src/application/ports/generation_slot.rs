//! Generation Slot Port - 每个会话唯一的“生成中”标记
//!
//! 发送消息、批量生成、锚点、重写都必须先占用该槽位

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::novel::SessionId;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("Generation already in flight for session {0}")]
    Busy(SessionId),
}

pub trait GenerationSlotPort: Send + Sync {
    /// 占用槽位，返回本次生成的取消令牌
    fn try_acquire(&self, session_id: &SessionId) -> Result<CancellationToken, SlotError>;

    fn release(&self, session_id: &SessionId);

    /// 取消正在进行的生成，返回是否存在
    fn cancel(&self, session_id: &SessionId) -> bool;

    fn is_generating(&self, session_id: &SessionId) -> bool;
}

/// 槽位守卫，离开作用域时释放（含出错路径）
pub struct SlotGuard {
    slots: Arc<dyn GenerationSlotPort>,
    session_id: SessionId,
    token: CancellationToken,
}

impl SlotGuard {
    pub fn acquire(
        slots: Arc<dyn GenerationSlotPort>,
        session_id: &SessionId,
    ) -> Result<Self, SlotError> {
        let token = slots.try_acquire(session_id)?;
        Ok(Self {
            slots,
            session_id: session_id.clone(),
            token,
        })
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.release(&self.session_id);
    }
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("session_id", &self.session_id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
