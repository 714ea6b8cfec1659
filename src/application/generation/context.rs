//! 生成用例共享的上下文
//!
//! 各命令处理器都经由这里读取快照、提交事件、占用生成槽位与发起流式请求

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::prompts::{build_system_instruction, error_message, working_history};
use super::{GenerationRunner, OrchestrationPolicy, StreamOutcome, StreamTarget};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    EventSinkPort, GenerationError, GenerationProviderPort, GenerationRequest,
    GenerationSlotPort, NoticeLevel, NovelEvent, SessionStorePort, SlotGuard,
};
use crate::domain::document::{extract_config, DocumentParser};
use crate::domain::novel::{Message, MessageId, NovelSession, SessionEvent, SessionId};

/// 一次对话生成的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl GenerationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationOutcome::Completed => "completed",
            GenerationOutcome::Cancelled => "cancelled",
            GenerationOutcome::Failed(_) => "failed",
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Clone)]
pub struct GenerationContext {
    pub store: Arc<dyn SessionStorePort>,
    pub slots: Arc<dyn GenerationSlotPort>,
    pub events: Arc<dyn EventSinkPort>,
    pub runner: Arc<GenerationRunner>,
    pub parser: Arc<DocumentParser>,
    pub policy: OrchestrationPolicy,
}

impl GenerationContext {
    pub fn new(
        provider: Arc<dyn GenerationProviderPort>,
        store: Arc<dyn SessionStorePort>,
        slots: Arc<dyn GenerationSlotPort>,
        events: Arc<dyn EventSinkPort>,
        parser: Arc<DocumentParser>,
        policy: OrchestrationPolicy,
    ) -> Self {
        let runner = Arc::new(GenerationRunner::new(
            provider,
            store.clone(),
            events.clone(),
            policy.commit_interval,
        ));
        Self {
            store,
            slots,
            events,
            runner,
            parser,
            policy,
        }
    }

    pub fn session(&self, id: &SessionId) -> Result<Arc<NovelSession>, ApplicationError> {
        self.store
            .snapshot(id)
            .ok_or_else(|| ApplicationError::not_found("Session", id))
    }

    /// 确认会话存在并占用生成槽位
    pub fn acquire(&self, id: &SessionId) -> Result<SlotGuard, ApplicationError> {
        self.session(id)?;
        Ok(SlotGuard::acquire(self.slots.clone(), id)?)
    }

    /// 非生成类修改（编辑、确认重写）不能与生成交错
    pub fn ensure_idle(&self, id: &SessionId) -> Result<(), ApplicationError> {
        if self.slots.is_generating(id) {
            return Err(ApplicationError::GenerationInFlight(id.to_string()));
        }
        Ok(())
    }

    pub async fn dispatch(
        &self,
        id: &SessionId,
        event: SessionEvent,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        Ok(self.store.dispatch(id, event).await?)
    }

    pub async fn append(
        &self,
        id: &SessionId,
        message: Message,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        self.dispatch(id, SessionEvent::MessageAppended { message })
            .await
    }

    pub fn notice(&self, id: &SessionId, level: NoticeLevel, message: impl Into<String>) {
        self.events.publish(NovelEvent::notice(id, level, message));
    }

    /// 基于当前快照构造请求（截断历史 + 注入锚点摘要）
    pub fn request(&self, session: &NovelSession) -> GenerationRequest {
        self.build_request(session, session.messages())
    }

    /// 在快照末尾附加一条临时消息（不入库）后再截断历史
    pub fn request_with(&self, session: &NovelSession, extra: Message) -> GenerationRequest {
        let mut messages = session.messages().to_vec();
        messages.push(Arc::new(extra));
        self.build_request(session, &messages)
    }

    fn build_request(&self, session: &NovelSession, messages: &[Arc<Message>]) -> GenerationRequest {
        let summary = session.context_summary();
        GenerationRequest {
            system_instruction: build_system_instruction(session.settings(), summary),
            history: working_history(messages, summary, self.policy.recent_history_len),
            config: session.settings().clone(),
        }
    }

    /// 追加用户消息和占位回复，并把回复流式写入占位消息
    pub async fn exchange(
        &self,
        id: &SessionId,
        prompt: String,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, ApplicationError> {
        self.append(id, Message::user(prompt, now_millis())).await?;
        let placeholder = Message::model("", now_millis());
        let placeholder_id = placeholder.id().clone();
        let session = self.append(id, placeholder).await?;

        let request = self.request(&session);
        let target = StreamTarget::Message(placeholder_id.clone());

        match self.runner.stream(id, request, target, cancel).await {
            Ok(StreamOutcome::Completed(text)) => {
                let session = self
                    .dispatch(
                        id,
                        SessionEvent::MessageFinalized {
                            message_id: placeholder_id,
                            content: text.clone(),
                        },
                    )
                    .await?;
                self.apply_extraction(id, &session, &text).await;
                Ok(GenerationOutcome::Completed)
            }
            Ok(StreamOutcome::Cancelled(text)) => {
                self.keep_partial(id, &placeholder_id, text).await?;
                Ok(GenerationOutcome::Cancelled)
            }
            Err(e) => {
                self.fail(id, &placeholder_id, &e).await?;
                Ok(GenerationOutcome::Failed(e.to_string()))
            }
        }
    }

    /// 取消时保留部分内容；占位消息仍为空则移除
    pub async fn keep_partial(
        &self,
        id: &SessionId,
        placeholder_id: &MessageId,
        text: String,
    ) -> Result<(), ApplicationError> {
        let event = if text.trim().is_empty() {
            SessionEvent::MessageRemoved {
                message_id: placeholder_id.clone(),
            }
        } else {
            SessionEvent::MessageFinalized {
                message_id: placeholder_id.clone(),
                content: text,
            }
        };
        self.dispatch(id, event).await?;
        Ok(())
    }

    /// 生成失败：移除空的占位消息，追加可见的错误消息
    pub async fn fail(
        &self,
        id: &SessionId,
        placeholder_id: &MessageId,
        error: &GenerationError,
    ) -> Result<(), ApplicationError> {
        let session = self.session(id)?;
        let empty = session
            .find_message(placeholder_id)
            .is_some_and(|m| m.content().trim().is_empty());
        if empty {
            self.dispatch(
                id,
                SessionEvent::MessageRemoved {
                    message_id: placeholder_id.clone(),
                },
            )
            .await?;
        } else {
            // 持久化已流出的部分
            let content = session
                .find_message(placeholder_id)
                .map(|m| m.content().to_string())
                .unwrap_or_default();
            self.dispatch(
                id,
                SessionEvent::MessageFinalized {
                    message_id: placeholder_id.clone(),
                    content,
                },
            )
            .await?;
        }

        let message = error_message(&error.to_string());
        self.append(id, Message::notice(message.clone(), now_millis()))
            .await?;
        self.notice(id, NoticeLevel::Error, message);
        Ok(())
    }

    /// 完成的模型消息上运行配置自动抽取
    pub async fn apply_extraction(&self, id: &SessionId, session: &NovelSession, text: &str) {
        let extraction = extract_config(text, session.title(), session.settings());

        if let Some(title) = extraction.title {
            match self.dispatch(id, SessionEvent::Renamed { title: title.clone() }).await {
                Ok(_) => tracing::info!(session_id = %id, title = %title, "Title extracted"),
                Err(e) => tracing::warn!(session_id = %id, error = %e, "Ignored extracted title"),
            }
        }

        if !extraction.patch.is_empty() {
            let patch = extraction.patch;
            tracing::info!(
                session_id = %id,
                total_chapters = ?patch.target_total_chapters,
                words_per_chapter = ?patch.target_words_per_chapter,
                "Config extracted"
            );
            if let Err(e) = self.dispatch(id, SessionEvent::ConfigPatched { patch }).await {
                tracing::warn!(session_id = %id, error = %e, "Ignored extracted config");
            }
        }
    }
}
