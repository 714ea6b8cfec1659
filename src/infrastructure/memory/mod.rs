//! Memory Layer - In-Memory State Management
//!
//! 实现 SessionStore 和 GenerationSlot，管理会话快照与生成槽位的内存状态

mod generation_slots;
mod session_store;

pub use generation_slots::InMemoryGenerationSlots;
pub use session_store::InMemorySessionStore;
