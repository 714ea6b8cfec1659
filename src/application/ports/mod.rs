//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod event_sink;
mod generation_provider;
mod generation_slot;
mod repositories;
mod session_store;

pub use event_sink::{EventSinkPort, GenerationTask, NoticeLevel, NovelEvent};
pub use generation_provider::{GenerationError, GenerationProviderPort, GenerationRequest};
pub use generation_slot::{GenerationSlotPort, SlotError, SlotGuard};
pub use repositories::{RepositoryError, SessionRepositoryPort};
pub use session_store::{SessionStorePort, StoreError};
