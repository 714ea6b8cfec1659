//! 生成编排支撑
//!
//! - prompts: 固定提示词与系统指令组装
//! - runner: 流式生成与节流提交
//! - context: 命令处理器共享的会话/槽位/事件访问

mod context;
mod policy;
pub mod prompts;
mod runner;

pub use context::{now_millis, GenerationContext, GenerationOutcome};
pub use policy::OrchestrationPolicy;
pub use runner::{GenerationRunner, StreamOutcome, StreamTarget};
