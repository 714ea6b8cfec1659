//! Generation Provider Port - 模型流式生成抽象
//!
//! 具体实现在 infrastructure/adapters/llm 层

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::novel::{GenerationConfig, Message};

/// 生成错误（传输或服务方失败，均可在会话内恢复）
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed stream frame: {0}")]
    MalformedStream(String),

    #[error("{0}")]
    MissingCredentials(String),
}

/// 生成请求
///
/// history 的最后一条是本次提示（用户消息）
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub history: Vec<Arc<Message>>,
    pub config: GenerationConfig,
}

/// Generation Provider Port
#[async_trait]
pub trait GenerationProviderPort: Send + Sync {
    /// 流式生成
    ///
    /// 增量文本按顺序写入 `chunks`；返回完整拼接文本。
    /// `cancel` 触发后尽快返回已累积的部分文本（Ok）
    async fn generate(
        &self,
        request: GenerationRequest,
        chunks: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String, GenerationError>;
}
