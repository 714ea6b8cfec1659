//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Novel Context: 小说会话、生成配置、锚点策略
//! - Document Context: 从对话消息重建小说文档

pub mod document;
pub mod novel;
