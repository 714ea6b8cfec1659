//! Novel Context - 持久化数据迁移
//!
//! 所有历史配置形态只在加载时迁移一次：
//! - v1: 知识库字段名为 `mcpItems`，附带 `siteSettings`，数值字段可能以字符串保存
//! - v2: 当前版本（`knowledgeItems` + `skillItems` + `schemaVersion`）
//!
//! 书库格式：NovelSession 数组；更早的单会话格式 `{messages, settings}` 会被包装为一条会话

use serde_json::{json, Map, Value};

use super::{
    GenerationConfig, MigrationError, NovelSession, DEFAULT_TITLE, SETTINGS_SCHEMA_VERSION,
};
use crate::domain::document::extract_announced_title;

const INTEGER_FIELDS: &[&str] = &[
    "topK",
    "thinkingBudget",
    "maxOutputTokens",
    "targetTotalChapters",
    "targetWordsPerChapter",
];

const FLOAT_FIELDS: &[&str] = &["temperature", "topP"];

/// 将任意历史版本的配置迁移为当前 GenerationConfig
///
/// 缺失字段取默认值；`null` 视为缺失
pub fn migrate_settings(raw: Value) -> Result<GenerationConfig, MigrationError> {
    let mut object = match raw {
        Value::Null => return Ok(GenerationConfig::default()),
        Value::Object(map) => map,
        other => {
            return Err(MigrationError::InvalidShape(format!(
                "settings 必须是对象: {}",
                other
            )))
        }
    };

    let version = object
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(1);

    if version > SETTINGS_SCHEMA_VERSION {
        return Err(MigrationError::UnsupportedVersion(version));
    }

    object.retain(|_, value| !value.is_null());

    if version < 2 {
        upgrade_v1(&mut object);
    }

    object.insert("schemaVersion".to_string(), json!(SETTINGS_SCHEMA_VERSION));

    serde_json::from_value(Value::Object(object))
        .map_err(|e| MigrationError::InvalidShape(e.to_string()))
}

fn upgrade_v1(object: &mut Map<String, Value>) {
    if let Some(items) = object.remove("mcpItems") {
        object.entry("knowledgeItems").or_insert(items);
    }
    object.remove("siteSettings");

    for key in INTEGER_FIELDS {
        coerce_numeric(object, key, |s| s.parse::<u64>().ok().map(Value::from));
    }
    for key in FLOAT_FIELDS {
        coerce_numeric(object, key, |s| s.parse::<f64>().ok().map(Value::from));
    }

    let known_provider = matches!(
        object.get("provider").and_then(Value::as_str),
        None | Some("google") | Some("openai")
    );
    if !known_provider {
        object.remove("provider");
    }
}

/// 字符串数值转换为数字，无法解析时移除字段回落默认值
fn coerce_numeric(
    object: &mut Map<String, Value>,
    key: &str,
    parse: impl Fn(&str) -> Option<Value>,
) {
    let Some(Value::String(raw)) = object.get(key) else {
        return;
    };
    match parse(raw.trim()) {
        Some(value) => {
            object.insert(key.to_string(), value);
        }
        None => {
            object.remove(key);
        }
    }
}

/// 解析导入的书库数据
pub fn migrate_library(raw: Value, now: i64) -> Result<Vec<NovelSession>, MigrationError> {
    match raw {
        Value::Array(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                serde_json::from_value::<NovelSession>(record).map_err(|e| {
                    MigrationError::InvalidRecord {
                        index,
                        reason: e.to_string(),
                    }
                })
            })
            .collect(),
        Value::Object(map) if map.get("messages").is_some_and(Value::is_array) => {
            legacy_conversation(map, now).map(|session| vec![session])
        }
        other => Err(MigrationError::InvalidShape(format!(
            "书库必须是会话数组: {}",
            other
        ))),
    }
}

/// 早期单会话格式：只有消息列表与配置
fn legacy_conversation(
    mut map: Map<String, Value>,
    now: i64,
) -> Result<NovelSession, MigrationError> {
    let messages = map.remove("messages").unwrap_or(Value::Array(Vec::new()));

    let title = messages
        .as_array()
        .into_iter()
        .flatten()
        .filter(|m| m.get("role").and_then(Value::as_str) == Some("model"))
        .filter_map(|m| m.get("content").and_then(Value::as_str))
        .find_map(extract_announced_title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let record = json!({
        "id": format!("default-{}", now),
        "title": title,
        "createdAt": now,
        "lastModified": now,
        "messages": messages,
        "settings": map.remove("settings").unwrap_or(Value::Null),
    });

    serde_json::from_value(record).map_err(|e| MigrationError::InvalidRecord {
        index: 0,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::ProviderKind;

    #[test]
    fn test_missing_settings_default() {
        let config = migrate_settings(Value::Null).unwrap();
        assert_eq!(config, GenerationConfig::default());
    }

    #[test]
    fn test_v1_settings_upgrade() {
        let raw = json!({
            "provider": "openai",
            "targetTotalChapters": "80",
            "temperature": "0.5",
            "maxOutputTokens": "lots",
            "mcpItems": [{"id": "default-1", "name": "世界观", "content": "赛博修仙", "isActive": true}],
            "siteSettings": {"siteName": "InkFlow"},
            "openaiApiKey": null
        });
        let config = migrate_settings(raw).unwrap();
        assert_eq!(config.schema_version, SETTINGS_SCHEMA_VERSION);
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.target_total_chapters, 80);
        assert!((config.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.max_output_tokens, 8192);
        assert_eq!(config.knowledge_items.len(), 1);
        assert_eq!(config.openai_api_key, "");
    }

    #[test]
    fn test_unknown_provider_falls_back() {
        let config = migrate_settings(json!({"provider": "anthropic"})).unwrap();
        assert_eq!(config.provider, ProviderKind::Google);
    }

    #[test]
    fn test_future_version_rejected() {
        let result = migrate_settings(json!({"schemaVersion": 99}));
        assert!(matches!(result, Err(MigrationError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_library_array_defaults_optional_fields() {
        let raw = json!([{
            "id": "1700000000000",
            "title": "星海",
            "createdAt": 1,
            "lastModified": 2,
            "messages": [{"id": "init-1", "role": "model", "content": "你好", "timestamp": 1}],
            "settings": {"targetTotalChapters": 40}
        }]);
        let sessions = migrate_library(raw, 10).unwrap();
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.title(), "星海");
        assert!(session.context_summary().is_none());
        assert!(session.anchor_config().is_none());
        assert_eq!(session.settings().target_total_chapters, 40);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_legacy_conversation_import() {
        let raw = json!({
            "messages": [
                {"id": "1", "role": "user", "content": "开始", "timestamp": 1},
                {"id": "2", "role": "model", "content": "小说名：《雾都》\n好的", "timestamp": 2}
            ],
            "settings": {"mcpItems": []}
        });
        let sessions = migrate_library(raw, 42).unwrap();
        assert_eq!(sessions[0].title(), "雾都");
        assert_eq!(sessions[0].id().as_str(), "default-42");
        assert_eq!(sessions[0].messages().len(), 2);
    }

    #[test]
    fn test_invalid_record_reports_index() {
        let raw = json!([
            {"id": "a", "title": "A", "createdAt": 1, "lastModified": 1},
            {"id": 5}
        ]);
        let err = migrate_library(raw, 0).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidRecord { index: 1, .. }));
    }
}
