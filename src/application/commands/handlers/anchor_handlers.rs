//! Anchor Handlers - 剧情锚点（上下文压缩）
//!
//! 手动与自动两个入口共享 [`AnchorCompactor`]：
//! 追加锚定请求与占位回复 → 流式生成摘要 → 提交摘要并截断模型上下文

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::application::commands::ExecuteAnchor;
use crate::application::error::ApplicationError;
use crate::application::generation::prompts::{anchor_notice, anchor_preview, ANCHOR_PROMPT};
use crate::application::generation::{
    now_millis, GenerationContext, StreamOutcome, StreamTarget,
};
use crate::application::ports::{GenerationTask, NoticeLevel, NovelEvent, SlotGuard};
use crate::domain::document::strip_options;
use crate::domain::novel::{Message, MessageId, SessionEvent, SessionId};

const MANUAL_SUCCESS_NOTICE: &str = "剧情锚点构建成功！历史记录已保留。";

/// 一次锚定的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnchorOutcome {
    Committed { digest: String },
    Cancelled,
    Failed { error: String },
}

/// 锚定核心流程（不负责槽位，调用方必须已持有）
pub struct AnchorCompactor {
    ctx: GenerationContext,
}

impl AnchorCompactor {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    pub async fn compact(
        &self,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<AnchorOutcome, ApplicationError> {
        let request_message = Message::user(ANCHOR_PROMPT, now_millis());
        let request_id = request_message.id().clone();
        self.ctx.append(session_id, request_message).await?;

        let placeholder = Message::model("", now_millis());
        let response_id = placeholder.id().clone();
        let session = self.ctx.append(session_id, placeholder).await?;

        let request = self.ctx.request(&session);
        let result = self
            .ctx
            .runner
            .stream(
                session_id,
                request,
                StreamTarget::Message(response_id.clone()),
                cancel,
            )
            .await;

        let outcome = match result {
            Ok(StreamOutcome::Completed(text)) => {
                let digest = strip_options(&text);
                if digest.is_empty() {
                    AnchorOutcome::Failed {
                        error: "模型返回了空的锚点摘要".to_string(),
                    }
                } else {
                    self.commit(session_id, &response_id, digest).await?
                }
            }
            Ok(StreamOutcome::Cancelled(_)) => AnchorOutcome::Cancelled,
            Err(e) => AnchorOutcome::Failed {
                error: e.to_string(),
            },
        };

        if !matches!(outcome, AnchorOutcome::Committed { .. }) {
            self.rollback(session_id, &request_id, &response_id).await?;
        }
        if let AnchorOutcome::Failed { error } = &outcome {
            tracing::warn!(session_id = %session_id, error = %error, "Anchor failed");
            self.ctx
                .notice(session_id, NoticeLevel::Error, format!("锚点构建失败: {}", error));
        }

        Ok(outcome)
    }

    async fn commit(
        &self,
        session_id: &SessionId,
        response_id: &MessageId,
        digest: String,
    ) -> Result<AnchorOutcome, ApplicationError> {
        let notice = Message::notice(anchor_notice(&digest), now_millis());
        self.ctx
            .dispatch(
                session_id,
                SessionEvent::AnchorCommitted {
                    response_id: response_id.clone(),
                    digest: digest.clone(),
                    notice,
                },
            )
            .await?;

        tracing::info!(
            session_id = %session_id,
            digest_chars = digest.chars().count(),
            "Anchor committed"
        );
        self.ctx.events.publish(NovelEvent::AnchorCompleted {
            session_id: session_id.to_string(),
            preview: anchor_preview(&digest),
        });

        Ok(AnchorOutcome::Committed { digest })
    }

    /// 失败或取消时恢复到锚定前的消息列表
    async fn rollback(
        &self,
        session_id: &SessionId,
        request_id: &MessageId,
        response_id: &MessageId,
    ) -> Result<(), ApplicationError> {
        for message_id in [response_id, request_id] {
            self.ctx
                .dispatch(
                    session_id,
                    SessionEvent::MessageRemoved {
                        message_id: message_id.clone(),
                    },
                )
                .await?;
        }
        Ok(())
    }
}

/// ExecuteAnchor Handler - 手动锚定
pub struct ExecuteAnchorHandler {
    ctx: GenerationContext,
    compactor: AnchorCompactor,
}

impl ExecuteAnchorHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            compactor: AnchorCompactor::new(ctx.clone()),
            ctx,
        }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.ctx.acquire(session_id)
    }

    pub async fn handle(&self, cmd: ExecuteAnchor) -> Result<AnchorOutcome, ApplicationError> {
        let slot = self.acquire(&cmd.session_id)?;
        self.run(cmd, slot).await
    }

    pub async fn run(
        &self,
        cmd: ExecuteAnchor,
        slot: SlotGuard,
    ) -> Result<AnchorOutcome, ApplicationError> {
        self.ctx.events.publish(NovelEvent::GenerationStarted {
            session_id: cmd.session_id.to_string(),
            task: GenerationTask::Anchor,
        });

        let outcome = self.compactor.compact(&cmd.session_id, slot.token()).await?;
        if matches!(outcome, AnchorOutcome::Committed { .. }) {
            self.ctx
                .notice(&cmd.session_id, NoticeLevel::Success, MANUAL_SUCCESS_NOTICE);
        }

        let status = match &outcome {
            AnchorOutcome::Committed { .. } => "completed",
            AnchorOutcome::Cancelled => "cancelled",
            AnchorOutcome::Failed { .. } => "failed",
        };
        self.ctx.events.publish(NovelEvent::GenerationFinished {
            session_id: cmd.session_id.to_string(),
            task: GenerationTask::Anchor,
            outcome: status.to_string(),
        });

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::{harness, seed_replies};
    use crate::application::commands::handlers::{RewriteChapterHandler, SendMessageHandler};
    use crate::application::commands::{RewriteChapter, RewriteMode, SendMessage};
    use crate::infrastructure::adapters::llm::ScriptedReply;

    fn chapter_replies(count: usize) -> Vec<String> {
        (1..=count)
            .map(|n| format!("## 第{}章 第{}夜\n这是第{}章的正文。", n, n, n))
            .collect()
    }

    #[tokio::test]
    async fn test_anchor_truncates_model_context_but_keeps_chapters() {
        let h = harness(vec![
            ScriptedReply::text("## 剧情锚点\n主角抵达北境。\n\nOptions: [继续]"),
            ScriptedReply::text("## 第9章 新卷\n正文"),
        ])
        .await;
        let replies = chapter_replies(8);
        let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let id = seed_replies(&h, &refs).await;

        let outcome = ExecuteAnchorHandler::new(h.ctx.clone())
            .handle(ExecuteAnchor {
                session_id: id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AnchorOutcome::Committed {
                digest: "## 剧情锚点\n主角抵达北境。".into()
            }
        );

        let session = h.ctx.session(&id).unwrap();
        assert_eq!(session.context_summary(), Some("## 剧情锚点\n主角抵达北境。"));
        assert!(session.last_message().unwrap().is_system_notice());

        SendMessageHandler::new(h.ctx.clone())
            .handle(SendMessage {
                session_id: id.clone(),
                content: "继续".into(),
            })
            .await
            .unwrap();

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].history.len() <= 6);
        assert!(requests[1].system_instruction.contains("主角抵达北境"));

        let document = h.ctx.parser.parse(&h.ctx.session(&id).unwrap());
        assert_eq!(document.chapters.len(), 9);
    }

    #[tokio::test]
    async fn test_rewrite_after_anchor_keeps_recent_tail() {
        let h = harness(vec![
            ScriptedReply::text("## 剧情锚点\n主角抵达北境。"),
            ScriptedReply::text("## 第8章 第8夜\n重写后的正文。"),
        ])
        .await;
        let replies = chapter_replies(8);
        let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let id = seed_replies(&h, &refs).await;
        let last_chapter = h
            .ctx
            .session(&id)
            .unwrap()
            .last_message()
            .unwrap()
            .id()
            .clone();

        ExecuteAnchorHandler::new(h.ctx.clone())
            .handle(ExecuteAnchor {
                session_id: id.clone(),
            })
            .await
            .unwrap();

        RewriteChapterHandler::new(h.ctx.clone())
            .handle(RewriteChapter {
                session_id: id.clone(),
                message_id: last_chapter,
                chapter_title: "第8章 第8夜".into(),
                content: "这是第8章的正文。".into(),
                mode: RewriteMode::Regenerate,
            })
            .await
            .unwrap();

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        let history = &requests[1].history;
        assert!(history.len() <= 6);
        assert!(!history.last().unwrap().is_model());
        assert!(history.last().unwrap().content().contains("第8章 第8夜"));
    }

    #[tokio::test]
    async fn test_failed_anchor_leaves_session_untouched() {
        let h = harness(vec![ScriptedReply::error("upstream 502")]).await;
        let id = seed_replies(&h, &["## 第1章 起\n正文"]).await;
        let before = h.ctx.session(&id).unwrap();

        let outcome = ExecuteAnchorHandler::new(h.ctx.clone())
            .handle(ExecuteAnchor {
                session_id: id.clone(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, AnchorOutcome::Failed { .. }));

        let after = h.ctx.session(&id).unwrap();
        assert_eq!(after.messages(), before.messages());
        assert!(after.context_summary().is_none());
        assert!(!h.ctx.slots.is_generating(&id));
    }

    #[tokio::test]
    async fn test_empty_digest_is_failure() {
        let h = harness(vec![ScriptedReply::text("Options: [继续]")]).await;
        let id = seed_replies(&h, &[]).await;

        let outcome = ExecuteAnchorHandler::new(h.ctx.clone())
            .handle(ExecuteAnchor {
                session_id: id.clone(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, AnchorOutcome::Failed { .. }));
        assert!(h.ctx.session(&id).unwrap().context_summary().is_none());
    }

    #[tokio::test]
    async fn test_manual_anchor_refused_while_generating() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &[]).await;
        let _slot = h.ctx.acquire(&id).unwrap();

        let result = ExecuteAnchorHandler::new(h.ctx.clone())
            .handle(ExecuteAnchor { session_id: id })
            .await;
        assert!(matches!(result, Err(ApplicationError::GenerationInFlight(_))));
    }
}
