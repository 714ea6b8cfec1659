//! Batch Handlers - 批量目录与批量章节生成
//!
//! 章节批量生成是唯一会连续发起多次请求的流程，每一步都在上一步流结束后才开始

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::anchor_handlers::{AnchorCompactor, AnchorOutcome};
use crate::application::commands::{BatchGenerateChapters, BatchGenerateToc};
use crate::application::error::ApplicationError;
use crate::application::generation::prompts::{
    auto_anchor_notice, auto_task_message, batch_start_message, chapter_prompt, toc_prompt,
    CHAPTER_FOLLOW_UPS,
};
use crate::application::generation::{
    now_millis, GenerationContext, GenerationOutcome, StreamOutcome, StreamTarget,
};
use crate::application::ports::{GenerationTask, NoticeLevel, NovelEvent, SlotGuard};
use crate::domain::document::{append_options, has_table_of_contents, strip_options};
use crate::domain::novel::{Message, SessionEvent, SessionId};

const MAX_BATCH_SIZE: usize = 50;

// ============================================================================
// BatchGenerateToc
// ============================================================================

/// BatchGenerateToc Handler
pub struct BatchGenerateTocHandler {
    ctx: GenerationContext,
}

impl BatchGenerateTocHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.ctx.acquire(session_id)
    }

    /// 占用槽位之前的同步校验
    pub fn validate(&self, cmd: &BatchGenerateToc) -> Result<(), ApplicationError> {
        validate_count(cmd.count)?;
        self.ctx.session(&cmd.session_id)?;
        Ok(())
    }

    pub async fn handle(&self, cmd: BatchGenerateToc) -> Result<GenerationOutcome, ApplicationError> {
        self.validate(&cmd)?;
        let slot = self.acquire(&cmd.session_id)?;
        self.run(cmd, slot).await
    }

    pub async fn run(
        &self,
        cmd: BatchGenerateToc,
        slot: SlotGuard,
    ) -> Result<GenerationOutcome, ApplicationError> {
        self.validate(&cmd)?;

        self.ctx.events.publish(NovelEvent::GenerationStarted {
            session_id: cmd.session_id.to_string(),
            task: GenerationTask::BatchToc,
        });

        let outcome = self
            .ctx
            .exchange(&cmd.session_id, toc_prompt(cmd.count), slot.token())
            .await?;

        tracing::info!(
            session_id = %cmd.session_id,
            count = cmd.count,
            outcome = outcome.as_str(),
            "Table of contents generated"
        );
        self.ctx.events.publish(NovelEvent::GenerationFinished {
            session_id: cmd.session_id.to_string(),
            task: GenerationTask::BatchToc,
            outcome: outcome.as_str().to_string(),
        });

        Ok(outcome)
    }
}

// ============================================================================
// BatchGenerateChapters
// ============================================================================

/// 批量中止原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum BatchHalt {
    Cancelled,
    Failed(String),
}

/// 批量生成结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub requested: usize,
    pub completed: usize,
    /// 批量过程中自动触发的锚点次数
    pub anchors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<BatchHalt>,
}

impl BatchReport {
    fn outcome(&self) -> &'static str {
        match self.halted {
            None => "completed",
            Some(BatchHalt::Cancelled) => "cancelled",
            Some(BatchHalt::Failed(_)) => "failed",
        }
    }
}

/// 单章的执行结果
enum ChapterStep {
    Completed,
    Halted(BatchHalt),
}

/// BatchGenerateChapters Handler - 批量章节编排
///
/// 每章之前重新统计章节数判断锚点是否到期；取消只在两步之间生效，
/// 正在生成的章节保留已流出的内容
pub struct BatchGenerateChaptersHandler {
    ctx: GenerationContext,
    compactor: AnchorCompactor,
}

impl BatchGenerateChaptersHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            compactor: AnchorCompactor::new(ctx.clone()),
            ctx,
        }
    }

    pub fn acquire(&self, session_id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.ctx.acquire(session_id)
    }

    /// 占用槽位之前的同步校验：数量范围与目录是否存在
    pub fn validate(&self, cmd: &BatchGenerateChapters) -> Result<(), ApplicationError> {
        validate_count(cmd.count)?;
        let session = self.ctx.session(&cmd.session_id)?;
        if !has_table_of_contents(session.messages()) {
            return Err(ApplicationError::validation("请先生成目录，再批量撰写章节"));
        }
        Ok(())
    }

    pub async fn handle(
        &self,
        cmd: BatchGenerateChapters,
    ) -> Result<BatchReport, ApplicationError> {
        self.validate(&cmd)?;
        let slot = self.acquire(&cmd.session_id)?;
        self.run(cmd, slot).await
    }

    pub async fn run(
        &self,
        cmd: BatchGenerateChapters,
        slot: SlotGuard,
    ) -> Result<BatchReport, ApplicationError> {
        self.validate(&cmd)?;
        let session_id = &cmd.session_id;

        self.ctx.events.publish(NovelEvent::GenerationStarted {
            session_id: session_id.to_string(),
            task: GenerationTask::BatchChapters,
        });
        self.ctx
            .append(session_id, Message::user(batch_start_message(cmd.count), now_millis()))
            .await?;

        let report = self.run_loop(session_id, cmd.count, slot.token()).await?;

        tracing::info!(
            session_id = %session_id,
            requested = report.requested,
            completed = report.completed,
            anchors = report.anchors,
            outcome = report.outcome(),
            "Batch chapter generation finished"
        );
        self.ctx.events.publish(NovelEvent::GenerationFinished {
            session_id: session_id.to_string(),
            task: GenerationTask::BatchChapters,
            outcome: report.outcome().to_string(),
        });

        Ok(report)
    }

    async fn run_loop(
        &self,
        session_id: &SessionId,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, ApplicationError> {
        let mut report = BatchReport {
            requested: count,
            completed: 0,
            anchors: 0,
            halted: None,
        };

        for index in 1..=count {
            if cancel.is_cancelled() {
                report.halted = Some(BatchHalt::Cancelled);
                break;
            }

            if let Some(halt) = self.auto_anchor(session_id, cancel, &mut report).await? {
                report.halted = Some(halt);
                break;
            }

            match self.write_chapter(session_id, index, count, cancel).await? {
                ChapterStep::Completed => report.completed += 1,
                ChapterStep::Halted(halt) => {
                    report.halted = Some(halt);
                    break;
                }
            }

            if index < count {
                tokio::time::sleep(self.ctx.policy.batch_pause).await;
            }
        }

        Ok(report)
    }

    /// 锚点到期时静默锚定；无论成败触发点都向前推进
    async fn auto_anchor(
        &self,
        session_id: &SessionId,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) -> Result<Option<BatchHalt>, ApplicationError> {
        let session = self.ctx.session(session_id)?;
        let current_chapters = self.ctx.parser.count_chapters(session.messages());
        let policy = session.anchor_policy();
        if !policy.is_due(current_chapters) {
            return Ok(None);
        }

        tracing::info!(
            session_id = %session_id,
            chapters = current_chapters,
            next_trigger = policy.next_trigger,
            "Auto anchor triggered"
        );
        self.ctx.notice(
            session_id,
            NoticeLevel::Info,
            auto_anchor_notice(current_chapters),
        );

        let outcome = self.compactor.compact(session_id, cancel).await?;
        if outcome == AnchorOutcome::Cancelled {
            return Ok(Some(BatchHalt::Cancelled));
        }
        if matches!(outcome, AnchorOutcome::Committed { .. }) {
            report.anchors += 1;
        }

        self.ctx
            .dispatch(session_id, SessionEvent::AnchorTriggerAdvanced)
            .await?;
        tokio::time::sleep(self.ctx.policy.anchor_pause).await;
        Ok(None)
    }

    async fn write_chapter(
        &self,
        session_id: &SessionId,
        index: usize,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<ChapterStep, ApplicationError> {
        let session = self.ctx.session(session_id)?;
        let prompt = chapter_prompt(session.settings().target_words_per_chapter);
        self.ctx
            .append(
                session_id,
                Message::user(auto_task_message(index, count, &prompt), now_millis()),
            )
            .await?;

        let placeholder = Message::model("", now_millis());
        let placeholder_id = placeholder.id().clone();
        let session = self.ctx.append(session_id, placeholder).await?;

        self.ctx.events.publish(NovelEvent::BatchProgress {
            session_id: session_id.to_string(),
            index,
            total: count,
        });

        let request = self.ctx.request(&session);
        let result = self
            .ctx
            .runner
            .stream(
                session_id,
                request,
                StreamTarget::Message(placeholder_id.clone()),
                cancel,
            )
            .await;

        match result {
            Ok(StreamOutcome::Completed(text)) => {
                let content = append_options(&strip_options(&text), CHAPTER_FOLLOW_UPS);
                let session = self
                    .ctx
                    .dispatch(
                        session_id,
                        SessionEvent::MessageFinalized {
                            message_id: placeholder_id,
                            content: content.clone(),
                        },
                    )
                    .await?;
                self.ctx.apply_extraction(session_id, &session, &content).await;
                tracing::debug!(session_id = %session_id, index = index, "Chapter written");
                Ok(ChapterStep::Completed)
            }
            Ok(StreamOutcome::Cancelled(text)) => {
                self.ctx.keep_partial(session_id, &placeholder_id, text).await?;
                Ok(ChapterStep::Halted(BatchHalt::Cancelled))
            }
            Err(e) => {
                self.ctx.fail(session_id, &placeholder_id, &e).await?;
                Ok(ChapterStep::Halted(BatchHalt::Failed(e.to_string())))
            }
        }
    }
}

fn validate_count(count: usize) -> Result<(), ApplicationError> {
    if count == 0 || count > MAX_BATCH_SIZE {
        return Err(ApplicationError::validation(format!(
            "批量数量必须在 1 到 {} 之间",
            MAX_BATCH_SIZE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::{harness, seed_replies};
    use crate::application::generation::prompts::ANCHOR_PROMPT;
    use crate::domain::novel::AnchorPolicy;
    use crate::infrastructure::adapters::llm::ScriptedReply;

    const TOC: &str = "## 目录\n1. 第1章 起\n2. 第2章 承\n3. 第3章 转";

    fn chapter(n: usize) -> ScriptedReply {
        ScriptedReply::text(format!("## 第{}章 第{}幕\n第{}章正文。", n, n, n))
    }

    #[tokio::test]
    async fn test_auto_anchor_fires_mid_batch() {
        let h = harness(vec![
            chapter(1),
            chapter(2),
            ScriptedReply::text("## 剧情锚点\n第二章结束，主角离开村庄。"),
            chapter(3),
        ])
        .await;
        let id = seed_replies(&h, &[TOC]).await;
        h.ctx
            .dispatch(
                &id,
                SessionEvent::AnchorPolicyChanged {
                    policy: AnchorPolicy {
                        enabled: true,
                        next_trigger: 2,
                        ..AnchorPolicy::default()
                    },
                },
            )
            .await
            .unwrap();

        let report = BatchGenerateChaptersHandler::new(h.ctx.clone())
            .handle(BatchGenerateChapters {
                session_id: id.clone(),
                count: 3,
            })
            .await
            .unwrap();
        assert_eq!(report.completed, 3);
        assert_eq!(report.anchors, 1);
        assert!(report.halted.is_none());

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 4);
        let anchor_request = requests[2].history.last().unwrap();
        assert_eq!(anchor_request.content(), ANCHOR_PROMPT);
        // 锚定后的章节请求只携带截断历史和摘要
        assert!(requests[3].history.len() <= 6);
        assert!(requests[3].system_instruction.contains("主角离开村庄"));

        let session = h.ctx.session(&id).unwrap();
        assert_eq!(session.anchor_policy().next_trigger, 22);
        let chapters = h.ctx.parser.chapters(session.messages());
        assert_eq!(chapters.len(), 3);
        assert!(session
            .last_message()
            .unwrap()
            .content()
            .ends_with("Options: [继续写下一章] [重写本章] [精修本章] [生成本章细纲]"));
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_partial_chapter() {
        let h = harness(vec![
            chapter(1),
            ScriptedReply::cancel_after(vec!["## 第2章 第2幕\n", "半截正文", "再也不会到达"], 2),
            chapter(3),
        ])
        .await;
        let id = seed_replies(&h, &[TOC]).await;

        let report = BatchGenerateChaptersHandler::new(h.ctx.clone())
            .handle(BatchGenerateChapters {
                session_id: id.clone(),
                count: 3,
            })
            .await
            .unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(report.halted, Some(BatchHalt::Cancelled));
        assert_eq!(h.provider.requests().len(), 2);

        let session = h.ctx.session(&id).unwrap();
        assert_eq!(
            session.last_message().unwrap().content(),
            "## 第2章 第2幕\n半截正文"
        );
        let chapters = h.ctx.parser.chapters(session.messages());
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].content, "第1章正文。");
        assert_eq!(chapters[1].content, "半截正文");
        assert!(!h.ctx.slots.is_generating(&id));
    }

    #[tokio::test]
    async fn test_failure_keeps_completed_chapters() {
        let h = harness(vec![chapter(1), ScriptedReply::error("rate limited")]).await;
        let id = seed_replies(&h, &[TOC]).await;

        let report = BatchGenerateChaptersHandler::new(h.ctx.clone())
            .handle(BatchGenerateChapters {
                session_id: id.clone(),
                count: 3,
            })
            .await
            .unwrap();
        assert_eq!(report.completed, 1);
        assert!(matches!(report.halted, Some(BatchHalt::Failed(_))));

        let session = h.ctx.session(&id).unwrap();
        assert!(session.last_message().unwrap().is_system_notice());
        assert_eq!(h.ctx.parser.count_chapters(session.messages()), 1);
    }

    #[tokio::test]
    async fn test_batch_requires_toc() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &["## 基础设定\n赛博修仙"]).await;
        let handler = BatchGenerateChaptersHandler::new(h.ctx.clone());

        let missing = handler
            .handle(BatchGenerateChapters {
                session_id: id.clone(),
                count: 2,
            })
            .await;
        assert!(matches!(missing, Err(ApplicationError::ValidationError(_))));

        let zero = handler
            .handle(BatchGenerateChapters {
                session_id: id,
                count: 0,
            })
            .await;
        assert!(matches!(zero, Err(ApplicationError::ValidationError(_))));
        assert!(h.provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_batch_toc_sends_fixed_prompt() {
        let h = harness(vec![ScriptedReply::text(TOC)]).await;
        let id = seed_replies(&h, &[]).await;

        let outcome = BatchGenerateTocHandler::new(h.ctx.clone())
            .handle(BatchGenerateToc {
                session_id: id.clone(),
                count: 3,
            })
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed);

        let requests = h.provider.requests();
        assert!(requests[0].history.last().unwrap().content().contains("## 目录"));
        assert!(has_table_of_contents(h.ctx.session(&id).unwrap().messages()));
    }
}
