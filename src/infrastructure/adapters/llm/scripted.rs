//! Scripted Provider - 按脚本回放的生成器
//!
//! 不访问网络，用于测试和离线演示

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{GenerationError, GenerationProviderPort, GenerationRequest};

/// 一次调用的回放内容
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Chunks(Vec<String>),
    Error(String),
    /// 发送前 n 个分块后触发取消
    CancelAfter { chunks: Vec<String>, after: usize },
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Chunks(vec![text.into()])
    }

    pub fn chunks(chunks: Vec<&str>) -> Self {
        ScriptedReply::Chunks(chunks.into_iter().map(str::to_string).collect())
    }

    pub fn error(message: &str) -> Self {
        ScriptedReply::Error(message.to_string())
    }

    pub fn cancel_after(chunks: Vec<&str>, after: usize) -> Self {
        ScriptedReply::CancelAfter {
            chunks: chunks.into_iter().map(str::to_string).collect(),
            after,
        }
    }
}

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 追加脚本
    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// 已收到的请求（按调用顺序）
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self, request: GenerationRequest) -> Option<ScriptedReply> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

async fn send_all(chunks: &[String], tx: &mpsc::Sender<String>) -> String {
    let mut full = String::new();
    for chunk in chunks {
        full.push_str(chunk);
        if tx.send(chunk.clone()).await.is_err() {
            break;
        }
    }
    full
}

#[async_trait]
impl GenerationProviderPort for ScriptedProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
        chunks: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String, GenerationError> {
        let reply = self.next_reply(request).ok_or_else(|| GenerationError::Provider {
            status: 500,
            message: "scripted provider exhausted".to_string(),
        })?;

        match reply {
            ScriptedReply::Chunks(parts) => Ok(send_all(&parts, &chunks).await),
            ScriptedReply::Error(message) => Err(GenerationError::Network(message)),
            ScriptedReply::CancelAfter { chunks: parts, after } => {
                let sent = &parts[..after.min(parts.len())];
                let partial = send_all(sent, &chunks).await;
                cancel.cancel();
                Ok(partial)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::GenerationConfig;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: String::new(),
            history: Vec::new(),
            config: GenerationConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_replays_in_order() {
        let provider = ScriptedProvider::new(vec![
            ScriptedReply::chunks(vec!["甲", "乙"]),
            ScriptedReply::error("boom"),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        let text = provider
            .generate(request(), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "甲乙");
        assert_eq!(rx.recv().await.as_deref(), Some("甲"));

        let (tx, _rx) = mpsc::channel(8);
        assert!(matches!(
            provider.generate(request(), tx, CancellationToken::new()).await,
            Err(GenerationError::Network(_))
        ));

        let (tx, _rx) = mpsc::channel(8);
        assert!(provider
            .generate(request(), tx, CancellationToken::new())
            .await
            .is_err());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_after_triggers_token() {
        let provider = ScriptedProvider::new(vec![ScriptedReply::cancel_after(vec!["a", "b", "c"], 1)]);
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let text = provider.generate(request(), tx, cancel.clone()).await.unwrap();
        assert_eq!(text, "a");
        assert!(cancel.is_cancelled());
    }
}
