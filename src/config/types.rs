//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::OrchestrationPolicy;
use crate::domain::document::ParseRules;
use crate::infrastructure::adapters::llm::LlmClientConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 模型服务配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 生成编排参数
    #[serde(default)]
    pub generation: GenerationSettings,

    /// 文档解析规则（标题词表、长度阈值）
    #[serde(default)]
    pub document: ParseRules,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/inkflow.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 模型服务配置
///
/// OpenAI 兼容接口的 Key / Base URL 随会话配置保存，这里只有 Gemini 的服务端凭据
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// 单次生成请求超时（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub google_api_key: String,

    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_llm_timeout(),
            google_api_key: String::new(),
            google_base_url: default_google_base_url(),
        }
    }
}

impl LlmConfig {
    pub fn client_config(&self) -> LlmClientConfig {
        LlmClientConfig {
            timeout_secs: self.timeout_secs,
            google_api_key: self.google_api_key.clone(),
            google_base_url: self.google_base_url.clone(),
        }
    }
}

/// 生成编排参数
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    /// 流式增量提交间隔（毫秒）
    #[serde(default = "default_commit_interval")]
    pub commit_interval_ms: u64,

    /// 批量章节之间的停顿（毫秒）
    #[serde(default = "default_pause")]
    pub batch_pause_ms: u64,

    /// 自动锚点之后的停顿（毫秒）
    #[serde(default = "default_pause")]
    pub anchor_pause_ms: u64,

    /// 锚定后发送的最近消息数
    #[serde(default = "default_recent_history_len")]
    pub recent_history_len: usize,

    /// 超过该消息数且未锚定时提示
    #[serde(default = "default_long_conversation_hint")]
    pub long_conversation_hint: usize,
}

fn default_commit_interval() -> u64 {
    150
}

fn default_pause() -> u64 {
    1000
}

fn default_recent_history_len() -> usize {
    6
}

fn default_long_conversation_hint() -> usize {
    50
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            commit_interval_ms: default_commit_interval(),
            batch_pause_ms: default_pause(),
            anchor_pause_ms: default_pause(),
            recent_history_len: default_recent_history_len(),
            long_conversation_hint: default_long_conversation_hint(),
        }
    }
}

impl GenerationSettings {
    pub fn policy(&self) -> OrchestrationPolicy {
        OrchestrationPolicy {
            commit_interval: Duration::from_millis(self.commit_interval_ms),
            batch_pause: Duration::from_millis(self.batch_pause_ms),
            anchor_pause: Duration::from_millis(self.anchor_pause_ms),
            recent_history_len: self.recent_history_len,
            long_conversation_hint: self.long_conversation_hint,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3100);
        assert_eq!(config.database.path, "data/inkflow.db");
        assert_eq!(config.document.label_max_chars, 16);
        assert_eq!(config.document.bold_header_max_chars, 40);
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/inkflow.db?mode=rwc");
    }

    #[test]
    fn test_policy_matches_defaults() {
        assert_eq!(GenerationSettings::default().policy(), OrchestrationPolicy::default());
    }
}
