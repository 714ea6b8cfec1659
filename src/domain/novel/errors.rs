//! Novel Context - Errors

use thiserror::Error;

use super::MessageId;

#[derive(Debug, Error)]
pub enum NovelError {
    #[error("消息不存在: {0}")]
    MessageNotFound(MessageId),

    #[error("消息已存在: {0}")]
    DuplicateMessage(MessageId),

    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("无效的配置: {0}")]
    InvalidConfig(String),

    #[error("锚点摘要为空")]
    EmptyDigest,
}

/// 持久化数据迁移错误
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("不支持的配置版本: {0}")]
    UnsupportedVersion(u32),

    #[error("数据结构无效: {0}")]
    InvalidShape(String),

    #[error("第 {index} 条记录无效: {reason}")]
    InvalidRecord { index: usize, reason: String },
}
