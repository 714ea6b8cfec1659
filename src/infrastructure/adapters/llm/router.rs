//! Provider Router - 按会话配置选择模型服务

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{GeminiClient, OpenAiCompatibleClient};
use crate::application::ports::{GenerationError, GenerationProviderPort, GenerationRequest};
use crate::domain::novel::ProviderKind;

/// LLM 客户端配置
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// 单次请求超时（秒），包含整个流式响应
    pub timeout_secs: u64,
    pub google_api_key: String,
    pub google_base_url: String,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            google_api_key: String::new(),
            google_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

pub struct ProviderRouter {
    google: Arc<dyn GenerationProviderPort>,
    openai: Arc<dyn GenerationProviderPort>,
}

impl ProviderRouter {
    pub fn new(config: &LlmClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self::with_providers(
            Arc::new(GeminiClient::new(
                client.clone(),
                config.google_api_key.clone(),
                config.google_base_url.clone(),
            )),
            Arc::new(OpenAiCompatibleClient::new(client)),
        ))
    }

    pub fn with_providers(
        google: Arc<dyn GenerationProviderPort>,
        openai: Arc<dyn GenerationProviderPort>,
    ) -> Self {
        Self { google, openai }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn select(&self, provider: ProviderKind) -> &Arc<dyn GenerationProviderPort> {
        match provider {
            ProviderKind::Google => &self.google,
            ProviderKind::OpenAi => &self.openai,
        }
    }
}

#[async_trait]
impl GenerationProviderPort for ProviderRouter {
    async fn generate(
        &self,
        request: GenerationRequest,
        chunks: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String, GenerationError> {
        let provider = request.config.provider;
        tracing::debug!(provider = ?provider, "Routing generation request");
        self.select(provider).generate(request, chunks, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::GenerationConfig;
    use crate::infrastructure::adapters::llm::{ScriptedProvider, ScriptedReply};

    fn request(provider: ProviderKind) -> GenerationRequest {
        GenerationRequest {
            system_instruction: String::new(),
            history: Vec::new(),
            config: GenerationConfig {
                provider,
                ..GenerationConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_routes_by_provider() {
        let google = Arc::new(ScriptedProvider::new(vec![ScriptedReply::text("gemini")]));
        let openai = Arc::new(ScriptedProvider::new(vec![ScriptedReply::text("openai")]));
        let router = ProviderRouter::with_providers(google.clone(), openai.clone());

        let (tx, _rx) = mpsc::channel(8);
        let text = router
            .generate(request(ProviderKind::OpenAi), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "openai");
        assert_eq!(openai.requests().len(), 1);
        assert!(google.requests().is_empty());
    }

    #[tokio::test]
    async fn test_google_without_key_fails_fast() {
        let router = ProviderRouter::new(&LlmClientConfig::default()).unwrap();
        let (tx, _rx) = mpsc::channel(8);
        let result = router
            .generate(request(ProviderKind::Google), tx, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GenerationError::MissingCredentials(_))));
    }
}
