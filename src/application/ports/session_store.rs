//! Session Store Port - 会话状态 reducer
//!
//! 所有修改通过 `dispatch(event) -> 新快照` 完成，读取方拿到的是不可变快照

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::RepositoryError;
use crate::domain::novel::{NovelError, NovelSession, SessionEvent, SessionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error(transparent)]
    Rejected(#[from] NovelError),

    #[error(transparent)]
    Persistence(#[from] RepositoryError),
}

#[async_trait]
pub trait SessionStorePort: Send + Sync {
    /// 写入整个会话（新建或导入覆盖）
    async fn insert(&self, session: NovelSession) -> Result<Arc<NovelSession>, StoreError>;

    /// 当前快照
    fn snapshot(&self, id: &SessionId) -> Option<Arc<NovelSession>>;

    /// 应用事件并返回新快照
    ///
    /// 瞬时事件（流式增量）只更新内存，其余事件立即持久化
    async fn dispatch(
        &self,
        id: &SessionId,
        event: SessionEvent,
    ) -> Result<Arc<NovelSession>, StoreError>;

    /// 按最后修改时间倒序
    fn list(&self) -> Vec<Arc<NovelSession>>;

    async fn remove(&self, id: &SessionId) -> Result<bool, StoreError>;
}
