//! OpenAI 兼容 Chat Completions 客户端
//!
//! POST {base_url}/chat/completions (stream=true)
//! 增量位于 `choices[0].delta.content`，推理模型的思维链在 `reasoning_content`

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::stream::{check_status, map_request_error, read_sse};
use crate::application::ports::{GenerationError, GenerationProviderPort, GenerationRequest};
use crate::domain::novel::Role;

const MISSING_KEY: &str = "请在设置中配置 OpenAI API Key";

pub struct OpenAiCompatibleClient {
    client: Client,
}

impl OpenAiCompatibleClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn endpoint(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
    }

    fn request_body(request: &GenerationRequest) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": request.system_instruction,
        })];
        messages.extend(request.history.iter().map(|m| {
            let role = match m.role() {
                Role::User => "user",
                Role::Model => "assistant",
            };
            json!({ "role": role, "content": m.content() })
        }));

        let config = &request.config;
        json!({
            "model": config.openai_model,
            "messages": messages,
            "stream": true,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "max_tokens": config.max_output_tokens,
        })
    }
}

fn extract_delta(frame: &Value) -> Option<String> {
    let delta = frame.pointer("/choices/0/delta")?;
    let text = |key: &str| {
        delta
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    text("content")
        .or_else(|| text("reasoning_content"))
        .map(str::to_string)
}

#[async_trait]
impl GenerationProviderPort for OpenAiCompatibleClient {
    async fn generate(
        &self,
        request: GenerationRequest,
        chunks: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String, GenerationError> {
        let api_key = request.config.openai_api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::MissingCredentials(MISSING_KEY.to_string()));
        }

        let url = Self::endpoint(&request.config.openai_base_url);
        let body = Self::request_body(&request);

        tracing::debug!(
            url = %url,
            model = %request.config.openai_model,
            history = request.history.len(),
            "Sending chat completion request"
        );

        let send = self.client.post(&url).bearer_auth(api_key).json(&body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(String::new()),
            response = send => response.map_err(map_request_error)?,
        };
        let response = check_status(response).await?;

        let text = read_sse(response, &chunks, &cancel, extract_delta).await?;
        tracing::info!(
            model = %request.config.openai_model,
            chars = text.chars().count(),
            "Chat completion finished"
        );
        Ok(text)
    }
}
