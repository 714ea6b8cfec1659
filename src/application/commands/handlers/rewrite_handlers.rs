//! Rewrite Handlers - 章节精修/重写与段落润色
//!
//! 草稿在临时历史上生成（工作历史 + 一条不入库的用户提示），
//! 结果只通过事件推送，用户确认后才以编辑方式写回消息

use serde::Serialize;
use uuid::Uuid;

use crate::application::commands::{
    ConfirmRewrite, RewriteChapter, RewriteMode, RewriteScope, RewriteSelection,
};
use crate::application::error::ApplicationError;
use crate::application::generation::prompts::{
    optimize_prompt, regenerate_prompt, selection_prompt,
};
use crate::application::generation::{now_millis, GenerationContext, StreamOutcome, StreamTarget};
use crate::application::ports::{GenerationTask, NoticeLevel, NovelEvent, SlotGuard};
use crate::domain::document::strip_options;
use crate::domain::novel::{Message, MessageId, SessionEvent, SessionId};

/// 重写草稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteDraft {
    pub draft_id: String,
    pub message_id: MessageId,
    /// 被替换的原文（章节正文或选中段落）
    pub original: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RewriteOutcome {
    Draft(RewriteDraft),
    Cancelled,
    Failed { error: String },
}

impl RewriteOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            RewriteOutcome::Draft(_) => "completed",
            RewriteOutcome::Cancelled => "cancelled",
            RewriteOutcome::Failed { .. } => "failed",
        }
    }
}

/// 草稿生成的公共流程
struct DraftWriter {
    ctx: GenerationContext,
}

impl DraftWriter {
    async fn write(
        &self,
        session_id: &SessionId,
        message_id: MessageId,
        original: String,
        prompt: String,
        slot: &SlotGuard,
    ) -> Result<RewriteOutcome, ApplicationError> {
        let session = self.ctx.session(session_id)?;
        if session.find_message(&message_id).is_none() {
            return Err(ApplicationError::not_found("Message", &message_id));
        }

        self.ctx.events.publish(NovelEvent::GenerationStarted {
            session_id: session_id.to_string(),
            task: GenerationTask::Rewrite,
        });

        let request = self
            .ctx
            .request_with(&session, Message::user(prompt, now_millis()));

        let draft_id = Uuid::new_v4().to_string();
        let result = self
            .ctx
            .runner
            .stream(
                session_id,
                request,
                StreamTarget::Draft(draft_id.clone()),
                slot.token(),
            )
            .await;

        let outcome = match result {
            Ok(StreamOutcome::Completed(text)) => {
                let content = strip_options(&text);
                self.ctx.events.publish(NovelEvent::DraftCompleted {
                    session_id: session_id.to_string(),
                    draft_id: draft_id.clone(),
                    content: content.clone(),
                });
                RewriteOutcome::Draft(RewriteDraft {
                    draft_id,
                    message_id,
                    original,
                    content,
                })
            }
            Ok(StreamOutcome::Cancelled(_)) => RewriteOutcome::Cancelled,
            Err(e) => {
                self.ctx
                    .notice(session_id, NoticeLevel::Error, format!("生成失败: {}", e));
                RewriteOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        tracing::info!(
            session_id = %session_id,
            outcome = outcome.as_str(),
            "Rewrite draft finished"
        );
        self.ctx.events.publish(NovelEvent::GenerationFinished {
            session_id: session_id.to_string(),
            task: GenerationTask::Rewrite,
            outcome: outcome.as_str().to_string(),
        });

        Ok(outcome)
    }
}

// ============================================================================
// RewriteChapter / RewriteSelection
// ============================================================================

/// RewriteChapter Handler - 精修或完全重写
pub struct RewriteChapterHandler {
    ctx: GenerationContext,
    writer: DraftWriter,
}

impl RewriteChapterHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            writer: DraftWriter { ctx: ctx.clone() },
            ctx,
        }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.ctx.acquire(session_id)
    }

    pub async fn handle(&self, cmd: RewriteChapter) -> Result<RewriteOutcome, ApplicationError> {
        let slot = self.acquire(&cmd.session_id)?;
        self.run(cmd, slot).await
    }

    pub async fn run(
        &self,
        cmd: RewriteChapter,
        slot: SlotGuard,
    ) -> Result<RewriteOutcome, ApplicationError> {
        let session = self.ctx.session(&cmd.session_id)?;
        let prompt = match cmd.mode {
            RewriteMode::Optimize => optimize_prompt(&cmd.chapter_title, &cmd.content),
            RewriteMode::Regenerate => regenerate_prompt(
                &cmd.chapter_title,
                session.settings().target_words_per_chapter,
            ),
        };

        tracing::info!(
            session_id = %cmd.session_id,
            message_id = %cmd.message_id,
            mode = ?cmd.mode,
            "Rewriting chapter"
        );

        self.writer
            .write(&cmd.session_id, cmd.message_id, cmd.content, prompt, &slot)
            .await
    }
}

/// RewriteSelection Handler - 选中段落润色
pub struct RewriteSelectionHandler {
    ctx: GenerationContext,
    writer: DraftWriter,
}

impl RewriteSelectionHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            writer: DraftWriter { ctx: ctx.clone() },
            ctx,
        }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.ctx.acquire(session_id)
    }

    pub async fn handle(&self, cmd: RewriteSelection) -> Result<RewriteOutcome, ApplicationError> {
        let slot = self.acquire(&cmd.session_id)?;
        self.run(cmd, slot).await
    }

    pub async fn run(
        &self,
        cmd: RewriteSelection,
        slot: SlotGuard,
    ) -> Result<RewriteOutcome, ApplicationError> {
        if cmd.text.trim().is_empty() {
            return Err(ApplicationError::validation("选中内容不能为空"));
        }
        let prompt = selection_prompt(&cmd.text);
        self.writer
            .write(&cmd.session_id, cmd.message_id, cmd.text, prompt, &slot)
            .await
    }
}

// ============================================================================
// ConfirmRewrite
// ============================================================================

/// ConfirmRewrite Handler - 把草稿写回消息
pub struct ConfirmRewriteHandler {
    ctx: GenerationContext,
}

impl ConfirmRewriteHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: ConfirmRewrite) -> Result<u64, ApplicationError> {
        let session = self.ctx.session(&cmd.session_id)?;
        self.ctx.ensure_idle(&cmd.session_id)?;

        let message = session
            .find_message(&cmd.message_id)
            .ok_or_else(|| ApplicationError::not_found("Message", &cmd.message_id))?;

        let content = if !cmd.original.is_empty() && message.content().contains(&cmd.original) {
            message.content().replacen(&cmd.original, &cmd.replacement, 1)
        } else {
            match cmd.scope {
                RewriteScope::Chapter => cmd.replacement.clone(),
                RewriteScope::Selection => {
                    return Err(ApplicationError::validation("原文已变化，无法定位选中段落"))
                }
            }
        };

        let session = self
            .ctx
            .dispatch(
                &cmd.session_id,
                SessionEvent::MessageEdited {
                    message_id: cmd.message_id.clone(),
                    content,
                },
            )
            .await?;

        tracing::info!(
            session_id = %cmd.session_id,
            message_id = %cmd.message_id,
            scope = ?cmd.scope,
            "Rewrite confirmed"
        );

        Ok(session.revision())
    }
}
