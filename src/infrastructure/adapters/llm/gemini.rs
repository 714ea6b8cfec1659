//! Google Gemini 流式客户端
//!
//! POST {base_url}/models/{model}:streamGenerateContent?alt=sse

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::stream::{check_status, map_request_error, read_sse};
use crate::application::ports::{GenerationError, GenerationProviderPort, GenerationRequest};
use crate::domain::novel::{Message, Role};

const MISSING_KEY: &str = "未配置 Google API Key";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn request_body(request: &GenerationRequest) -> Value {
        let config = &request.config;
        let mut generation_config = json!({
            "temperature": config.temperature,
            "topK": config.top_k,
            "topP": config.top_p,
            "maxOutputTokens": config.max_output_tokens,
        });
        if config.thinking_budget > 0 {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": config.thinking_budget });
        }

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": to_contents(&request.history),
            "generationConfig": generation_config,
        })
    }
}

/// Gemini 要求 user/model 交替出现，相邻同角色消息合并
fn to_contents<M: AsRef<Message>>(history: &[M]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();
    let mut last_role: Option<&str> = None;

    for message in history.iter().map(AsRef::as_ref) {
        if message.content().is_empty() {
            continue;
        }
        let role = match message.role() {
            Role::User => "user",
            Role::Model => "model",
        };
        let part = json!({ "text": message.content() });

        match contents.last_mut() {
            Some(last) if last_role == Some(role) => {
                if let Some(parts) = last["parts"].as_array_mut() {
                    parts.push(part);
                }
            }
            _ => {
                contents.push(json!({ "role": role, "parts": [part] }));
                last_role = Some(role);
            }
        }
    }
    contents
}

/// 拼接候选内容中的文本片段（跳过思考过程）
fn extract_delta(frame: &Value) -> Option<String> {
    let parts = frame.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl GenerationProviderPort for GeminiClient {
    async fn generate(
        &self,
        request: GenerationRequest,
        chunks: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String, GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::MissingCredentials(MISSING_KEY.to_string()));
        }

        let model = request.config.google_model.clone();
        let url = self.endpoint(&model);
        let body = Self::request_body(&request);

        tracing::debug!(
            model = %model,
            history = request.history.len(),
            "Sending Gemini stream request"
        );

        let send = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.trim())
            .json(&body)
            .send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(String::new()),
            response = send => response.map_err(map_request_error)?,
        };
        let response = check_status(response).await?;

        let text = read_sse(response, &chunks, &cancel, extract_delta).await?;
        tracing::info!(model = %model, chars = text.chars().count(), "Gemini generation finished");
        Ok(text)
    }
}
