//! Repository Ports - 出站端口
//!
//! 会话整体序列化持久化，具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::novel::{NovelSession, SessionId};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Session Repository Port
///
/// 不变量: 不会用旧 revision 覆盖新 revision
#[async_trait]
pub trait SessionRepositoryPort: Send + Sync {
    /// 保存会话快照，返回是否实际写入（旧 revision 被忽略）
    async fn save(&self, session: &NovelSession) -> Result<bool, RepositoryError>;

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<NovelSession>, RepositoryError>;

    /// 按最后修改时间倒序
    async fn find_all(&self) -> Result<Vec<NovelSession>, RepositoryError>;

    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError>;
}
