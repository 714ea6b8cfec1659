//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod chat_commands;
mod config_commands;
mod generation_commands;
mod novel_commands;

pub mod handlers;

pub use chat_commands::*;
pub use config_commands::*;
pub use generation_commands::*;
pub use novel_commands::*;
