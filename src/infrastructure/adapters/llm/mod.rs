//! LLM Adapter - 流式文本生成客户端
//!
//! - openai_compatible: OpenAI Chat Completions 兼容接口
//! - gemini: Google Gemini streamGenerateContent
//! - router: 按 GenerationConfig.provider 分发
//! - scripted: 脚本回放（测试/离线）

mod gemini;
mod openai_compatible;
mod router;
mod scripted;
mod sse;
mod stream;

pub use gemini::GeminiClient;
pub use openai_compatible::OpenAiCompatibleClient;
pub use router::{LlmClientConfig, ProviderRouter};
pub use scripted::{ScriptedProvider, ScriptedReply};
pub use sse::{SseDecoder, SseFrame};
