//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `INKFLOW_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `INKFLOW_SERVER__PORT=8080`
/// - `INKFLOW_DATABASE__PATH=/data/inkflow.db`
/// - `INKFLOW_LLM__GOOGLE_API_KEY=...`
/// - `INKFLOW_GENERATION__BATCH_PAUSE_MS=0`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级），词表默认值由 ParseRules 提供
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3100)?
        .set_default("database.path", "data/inkflow.db")?
        .set_default("database.max_connections", 5)?
        .set_default("llm.timeout_secs", 300)?
        .set_default("llm.google_api_key", "")?
        .set_default(
            "llm.google_base_url",
            "https://generativelanguage.googleapis.com/v1beta",
        )?
        .set_default("generation.commit_interval_ms", 150)?
        .set_default("generation.batch_pause_ms", 1000)?
        .set_default("generation.anchor_pause_ms", 1000)?
        .set_default("generation.recent_history_len", 6)?
        .set_default("generation.long_conversation_hint", 50)?
        .set_default("document.bold_header_max_chars", 40)?
        .set_default("document.label_max_chars", 16)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: INKFLOW_LLM__TIMEOUT_SECS=600
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("INKFLOW")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.llm.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "LLM timeout cannot be 0".to_string(),
        ));
    }

    if config.llm.google_base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Google base URL cannot be empty".to_string(),
        ));
    }

    if config.generation.recent_history_len == 0 {
        return Err(ConfigError::ValidationError(
            "generation.recent_history_len must be at least 1".to_string(),
        ));
    }

    if config.document.label_max_chars == 0 || config.document.bold_header_max_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Header length limits must be positive".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("LLM Timeout: {}s", config.llm.timeout_secs);
    tracing::info!(
        "Google API Key: {}",
        if config.llm.google_api_key.is_empty() { "not set" } else { "set" }
    );
    tracing::info!(
        "Batch Pause: {}ms, Anchor Pause: {}ms",
        config.generation.batch_pause_ms,
        config.generation.anchor_pause_ms
    );
    tracing::info!("Recent History: {}", config.generation.recent_history_len);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_history() {
        let mut config = AppConfig::default();
        config.generation.recent_history_len = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8088

[generation]
batch_pause_ms = 0

[document.vocabulary]
toc = ["目录"]
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.generation.batch_pause_ms, 0);
        assert_eq!(config.generation.anchor_pause_ms, 1000);
        assert_eq!(config.document.vocabulary.toc, vec!["目录".to_string()]);
        assert!(!config.document.vocabulary.settings.is_empty());
    }
}
