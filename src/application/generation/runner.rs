//! 流式生成执行器
//!
//! 生产者（模型）与消费者（提交快照）并发运行，增量按时间间隔合并后再提交

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    EventSinkPort, GenerationError, GenerationProviderPort, GenerationRequest, NovelEvent,
    SessionStorePort,
};
use crate::domain::novel::{MessageId, SessionEvent, SessionId};

const CHUNK_BUFFER: usize = 64;

/// 流式内容写入的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// 会话中的占位消息
    Message(MessageId),
    /// 不写入会话的草稿（润色/重写）
    Draft(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed(String),
    /// 用户取消，保留已生成的部分
    Cancelled(String),
}

impl StreamOutcome {
    pub fn text(&self) -> &str {
        match self {
            StreamOutcome::Completed(text) | StreamOutcome::Cancelled(text) => text,
        }
    }
}

pub struct GenerationRunner {
    provider: Arc<dyn GenerationProviderPort>,
    store: Arc<dyn SessionStorePort>,
    events: Arc<dyn EventSinkPort>,
    commit_interval: Duration,
}

impl GenerationRunner {
    pub fn new(
        provider: Arc<dyn GenerationProviderPort>,
        store: Arc<dyn SessionStorePort>,
        events: Arc<dyn EventSinkPort>,
        commit_interval: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            events,
            commit_interval,
        }
    }

    /// 执行一次流式生成
    ///
    /// 出错时已流出的部分内容保留在目标中；取消之后的错误视为取消
    pub async fn stream(
        &self,
        session_id: &SessionId,
        request: GenerationRequest,
        target: StreamTarget,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, GenerationError> {
        let (tx, mut rx) = mpsc::channel::<String>(CHUNK_BUFFER);

        let producer = self.provider.generate(request, tx, cancel.clone());
        let consumer = async {
            let mut accumulated = String::new();
            let mut last_commit = Instant::now();
            let mut dirty = false;

            while let Some(chunk) = rx.recv().await {
                accumulated.push_str(&chunk);
                dirty = true;
                if last_commit.elapsed() >= self.commit_interval {
                    self.commit(session_id, &target, &accumulated).await;
                    last_commit = Instant::now();
                    dirty = false;
                }
            }
            if dirty {
                self.commit(session_id, &target, &accumulated).await;
            }
            accumulated
        };

        let (result, streamed) = tokio::join!(producer, consumer);

        match result {
            Ok(full) => {
                let text = if full.is_empty() { streamed } else { full };
                if cancel.is_cancelled() {
                    tracing::info!(session_id = %session_id, chars = text.chars().count(), "Generation cancelled");
                    Ok(StreamOutcome::Cancelled(text))
                } else {
                    Ok(StreamOutcome::Completed(text))
                }
            }
            Err(e) if cancel.is_cancelled() => {
                tracing::debug!(session_id = %session_id, error = %e, "Provider error after cancellation");
                Ok(StreamOutcome::Cancelled(streamed))
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Generation failed");
                Err(e)
            }
        }
    }

    async fn commit(&self, session_id: &SessionId, target: &StreamTarget, content: &str) {
        match target {
            StreamTarget::Message(message_id) => {
                let event = SessionEvent::MessageStreamed {
                    message_id: message_id.clone(),
                    content: content.to_string(),
                };
                if let Err(e) = self.store.dispatch(session_id, event).await {
                    tracing::warn!(
                        session_id = %session_id,
                        message_id = %message_id,
                        error = %e,
                        "Failed to commit stream progress"
                    );
                }
            }
            StreamTarget::Draft(draft_id) => {
                self.events.publish(NovelEvent::DraftProgress {
                    session_id: session_id.to_string(),
                    draft_id: draft_id.clone(),
                    content: content.to_string(),
                });
            }
        }
    }
}
