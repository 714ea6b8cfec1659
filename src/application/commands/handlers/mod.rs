//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod anchor_handlers;
mod batch_handlers;
mod chat_handlers;
mod config_handlers;
mod novel_handlers;
mod rewrite_handlers;

pub use anchor_handlers::*;
pub use batch_handlers::*;
pub use chat_handlers::*;
pub use config_handlers::*;
pub use novel_handlers::*;
pub use rewrite_handlers::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::application::generation::{now_millis, GenerationContext, OrchestrationPolicy};
    use crate::domain::document::DocumentParser;
    use crate::domain::novel::{Message, NovelSession, SessionId};
    use crate::infrastructure::adapters::llm::{ScriptedProvider, ScriptedReply};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::memory::{InMemoryGenerationSlots, InMemorySessionStore};

    pub(crate) struct Harness {
        pub ctx: GenerationContext,
        pub provider: Arc<ScriptedProvider>,
        pub events: Arc<EventPublisher>,
    }

    pub(crate) async fn harness(replies: Vec<ScriptedReply>) -> Harness {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let events = Arc::new(EventPublisher::new());
        let store = InMemorySessionStore::new(events.clone()).arc();
        let slots = InMemoryGenerationSlots::new().arc();

        let ctx = GenerationContext::new(
            provider.clone(),
            store,
            slots,
            events.clone(),
            Arc::new(DocumentParser::default()),
            OrchestrationPolicy::immediate(),
        );

        Harness {
            ctx,
            provider,
            events,
        }
    }

    /// 新建会话并按顺序写入 (用户, 模型) 对话
    pub(crate) async fn seed_replies(h: &Harness, replies: &[&str]) -> SessionId {
        let session = h
            .ctx
            .store
            .insert(NovelSession::new(now_millis()))
            .await
            .expect("insert session");
        let id = session.id().clone();

        for reply in replies {
            h.ctx
                .append(&id, Message::user("继续", now_millis()))
                .await
                .expect("append user message");
            h.ctx
                .append(&id, Message::model(*reply, now_millis()))
                .await
                .expect("append model message");
        }
        id
    }
}
