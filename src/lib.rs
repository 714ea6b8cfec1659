//! Inkflow - AI 辅助长篇小说创作服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Novel Context: 会话聚合、消息、生成配置、锚点策略
//! - Document: 从对话消息重建设定 / 数据库 / 章节（纯函数）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（GenerationProvider, SessionStore, Repository, GenerationSlot, EventSink）
//! - Generation: 流式生成、提示词、编排参数
//! - Commands: CQRS 命令处理器（对话、锚点、批量生成、重写）
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: SessionStore, GenerationSlots 内存实现
//! - Persistence: SQLite 存储
//! - Adapters: OpenAI 兼容 / Gemini 流式客户端
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
