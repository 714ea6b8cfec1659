//! Novel Context - 小说会话限界上下文
//!
//! 职责:
//! - NovelSession 聚合（消息列表为唯一事实来源）
//! - 会话事件 reducer
//! - 生成配置与版本化迁移
//! - 自动锚点策略

mod aggregate;
mod entities;
mod errors;
mod events;
mod migration;
mod settings;
mod value_objects;

pub use aggregate::{NovelSession, WELCOME_MESSAGE};
pub use entities::{AnchorMode, AnchorPolicy, ChapterInterval, KnowledgeItem, Message};
pub use errors::{MigrationError, NovelError};
pub use events::SessionEvent;
pub use migration::{migrate_library, migrate_settings};
pub use settings::{
    ConfigPatch, GenerationConfig, ProviderKind, DEFAULT_SYSTEM_INSTRUCTION,
    SETTINGS_SCHEMA_VERSION,
};
pub use value_objects::{MessageId, Role, SessionId, Title, DEFAULT_TITLE};
