//! Chat Command Handlers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::application::commands::chat_commands::*;
use crate::application::error::ApplicationError;
use crate::application::generation::prompts::{
    analyze_prompt, CONTINUE_NEXT_CHAPTER, LONG_CONVERSATION_HINT, REWRITE_THIS_CHAPTER,
    SUMMARIZE_PROMPT,
};
use crate::application::generation::{GenerationContext, GenerationOutcome};
use crate::application::ports::{GenerationTask, NoticeLevel, NovelEvent, SlotGuard};
use crate::domain::novel::{MessageId, NovelSession, SessionEvent, SessionId};

static LAST_CHAPTER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"##\s*(第[^\s]+章\s*[^\n]*)").expect("invalid last chapter header regex")
});

/// 快捷回复路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    /// 单章批量生成
    ContinueNextChapter,
    /// 重写最后一条模型消息中的章节
    RewriteLastChapter {
        message_id: MessageId,
        chapter_title: String,
        content: String,
    },
    Send,
}

/// 识别快捷回复
pub fn classify_user_input(text: &str, session: &NovelSession) -> UserIntent {
    let text = text.trim();
    if text == CONTINUE_NEXT_CHAPTER {
        return UserIntent::ContinueNextChapter;
    }
    if text == REWRITE_THIS_CHAPTER {
        let last = session
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_authored_model_text());
        if let Some(message) = last.filter(|m| m.content().contains("## 第")) {
            if let Some(caps) = LAST_CHAPTER_HEADER.captures(message.content()) {
                let title = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
                return UserIntent::RewriteLastChapter {
                    message_id: message.id().clone(),
                    chapter_title: title,
                    content: message.content().to_string(),
                };
            }
        }
    }
    UserIntent::Send
}

// ============================================================================
// SendMessage
// ============================================================================

/// SendMessage Handler - 普通对话生成
pub struct SendMessageHandler {
    ctx: GenerationContext,
}

impl SendMessageHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    /// 占用生成槽位（调用方随后在后台任务中执行 `run`）
    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.ctx.acquire(session_id)
    }

    pub async fn handle(&self, cmd: SendMessage) -> Result<GenerationOutcome, ApplicationError> {
        let slot = self.acquire(&cmd.session_id)?;
        self.run(cmd, slot).await
    }

    pub async fn run(
        &self,
        cmd: SendMessage,
        slot: SlotGuard,
    ) -> Result<GenerationOutcome, ApplicationError> {
        let content = cmd.content.trim().to_string();
        if content.is_empty() {
            return Err(ApplicationError::validation("消息内容不能为空"));
        }

        let session = self.ctx.session(&cmd.session_id)?;
        if session.context_summary().is_none()
            && session.messages().len() > self.ctx.policy.long_conversation_hint
        {
            self.ctx
                .notice(&cmd.session_id, NoticeLevel::Info, LONG_CONVERSATION_HINT);
        }

        self.ctx.events.publish(NovelEvent::GenerationStarted {
            session_id: cmd.session_id.to_string(),
            task: GenerationTask::Chat,
        });

        let outcome = self
            .ctx
            .exchange(&cmd.session_id, content, slot.token())
            .await?;

        tracing::info!(
            session_id = %cmd.session_id,
            outcome = outcome.as_str(),
            "Message exchange finished"
        );
        self.ctx.events.publish(NovelEvent::GenerationFinished {
            session_id: cmd.session_id.to_string(),
            task: GenerationTask::Chat,
            outcome: outcome.as_str().to_string(),
        });

        Ok(outcome)
    }
}

// ============================================================================
// StopGeneration / EditMessage
// ============================================================================

/// StopGeneration Handler - 协作式取消
pub struct StopGenerationHandler {
    ctx: GenerationContext,
}

impl StopGenerationHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, cmd: StopGeneration) -> bool {
        let stopped = self.ctx.slots.cancel(&cmd.session_id);
        tracing::info!(session_id = %cmd.session_id, stopped = stopped, "Stop requested");
        stopped
    }
}

/// EditMessage Handler
pub struct EditMessageHandler {
    ctx: GenerationContext,
}

impl EditMessageHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: EditMessage) -> Result<u64, ApplicationError> {
        self.ctx.session(&cmd.session_id)?;
        self.ctx.ensure_idle(&cmd.session_id)?;

        let session = self
            .ctx
            .dispatch(
                &cmd.session_id,
                SessionEvent::MessageEdited {
                    message_id: cmd.message_id.clone(),
                    content: cmd.content,
                },
            )
            .await?;

        tracing::info!(
            session_id = %cmd.session_id,
            message_id = %cmd.message_id,
            "Message edited"
        );
        Ok(session.revision())
    }
}

// ============================================================================
// Analyze / Summarize
// ============================================================================

/// AnalyzeChapter Handler - 以固定提示走普通对话
pub struct AnalyzeChapterHandler {
    send: SendMessageHandler,
}

impl AnalyzeChapterHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            send: SendMessageHandler::new(ctx),
        }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.send.acquire(session_id)
    }

    pub async fn run(
        &self,
        cmd: AnalyzeChapter,
        slot: SlotGuard,
    ) -> Result<GenerationOutcome, ApplicationError> {
        let message = SendMessage {
            session_id: cmd.session_id,
            content: analyze_prompt(&cmd.chapter_title, &cmd.content),
        };
        self.send.run(message, slot).await
    }
}

/// SummarizeConversation Handler
pub struct SummarizeConversationHandler {
    send: SendMessageHandler,
}

impl SummarizeConversationHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            send: SendMessageHandler::new(ctx),
        }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.send.acquire(session_id)
    }

    pub async fn run(
        &self,
        cmd: SummarizeConversation,
        slot: SlotGuard,
    ) -> Result<GenerationOutcome, ApplicationError> {
        let message = SendMessage {
            session_id: cmd.session_id,
            content: SUMMARIZE_PROMPT.to_string(),
        };
        self.send.run(message, slot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::{harness, seed_replies};
    use crate::infrastructure::adapters::llm::ScriptedReply;

    #[tokio::test]
    async fn test_send_message_streams_and_extracts_config() {
        let h = harness(vec![ScriptedReply::text(
            "好的！书名：《雾都》\n全书预计 60 章，每章 2500 字。\n\nOptions: [开始写作]",
        )])
        .await;
        let id = seed_replies(&h, &[]).await;

        let outcome = SendMessageHandler::new(h.ctx.clone())
            .handle(SendMessage {
                session_id: id.clone(),
                content: "我想写悬疑小说".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed);

        let session = h.ctx.session(&id).unwrap();
        assert_eq!(session.title(), "雾都");
        assert_eq!(session.settings().target_total_chapters, 60);
        assert_eq!(session.settings().target_words_per_chapter, 2500);
        let last = session.last_message().unwrap();
        assert!(last.content().contains("Options: [开始写作]"));
        assert!(!h.ctx.slots.is_generating(&id));
    }

    #[tokio::test]
    async fn test_provider_error_appends_notice() {
        let h = harness(vec![ScriptedReply::error("connection reset")]).await;
        let id = seed_replies(&h, &[]).await;
        let before = h.ctx.session(&id).unwrap().messages().len();

        let outcome = SendMessageHandler::new(h.ctx.clone())
            .handle(SendMessage {
                session_id: id.clone(),
                content: "继续".into(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Failed(_)));

        let session = h.ctx.session(&id).unwrap();
        // 用户消息 + 错误提示（空占位已移除）
        assert_eq!(session.messages().len(), before + 2);
        let last = session.last_message().unwrap();
        assert!(last.is_system_notice());
        assert!(last.content().starts_with("⚠️ Error:"));
        assert!(!h.ctx.slots.is_generating(&id));
    }

    #[tokio::test]
    async fn test_busy_slot_rejected() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &[]).await;
        let handler = SendMessageHandler::new(h.ctx.clone());

        let _slot = handler.acquire(&id).unwrap();
        let result = handler
            .handle(SendMessage {
                session_id: id.clone(),
                content: "hi".into(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::GenerationInFlight(_))));
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_text() {
        let h = harness(vec![ScriptedReply::cancel_after(vec!["第一段", "第二段", "第三段"], 2)]).await;
        let id = seed_replies(&h, &[]).await;

        let outcome = SendMessageHandler::new(h.ctx.clone())
            .handle(SendMessage {
                session_id: id.clone(),
                content: "写".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Cancelled);

        let session = h.ctx.session(&id).unwrap();
        assert_eq!(session.last_message().unwrap().content(), "第一段第二段");
    }

    #[tokio::test]
    async fn test_edit_rejected_while_generating() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &["## 第1章 始\n正文"]).await;
        let target = h.ctx.session(&id).unwrap().last_message().unwrap().id().clone();
        let handler = EditMessageHandler::new(h.ctx.clone());

        let slot = h.ctx.acquire(&id).unwrap();
        let busy = handler
            .handle(EditMessage {
                session_id: id.clone(),
                message_id: target.clone(),
                content: "改".into(),
            })
            .await;
        assert!(matches!(busy, Err(ApplicationError::GenerationInFlight(_))));
        drop(slot);

        handler
            .handle(EditMessage {
                session_id: id.clone(),
                message_id: target.clone(),
                content: "改".into(),
            })
            .await
            .unwrap();
        let session = h.ctx.session(&id).unwrap();
        assert_eq!(session.find_message(&target).unwrap().content(), "改");
    }

    #[tokio::test]
    async fn test_quick_reply_routing() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &["## 第3章 雨夜\n正文\n\nOptions: [继续写下一章] [重写本章]"]).await;
        let session = h.ctx.session(&id).unwrap();

        assert_eq!(
            classify_user_input("继续写下一章", &session),
            UserIntent::ContinueNextChapter
        );
        match classify_user_input(" 重写本章 ", &session) {
            UserIntent::RewriteLastChapter { chapter_title, .. } => {
                assert_eq!(chapter_title, "第3章 雨夜")
            }
            other => panic!("unexpected intent: {:?}", other),
        }
        assert_eq!(classify_user_input("你好", &session), UserIntent::Send);

        let plain = seed_replies(&h, &["没有章节"]).await;
        let plain = h.ctx.session(&plain).unwrap();
        assert_eq!(classify_user_input("重写本章", &plain), UserIntent::Send);
    }
}
