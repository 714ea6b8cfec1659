//! Novel Context - 生成配置
//!
//! GenerationConfig 随会话持久化，版本化 schema 由 [`super::migrate_settings`] 在加载时统一迁移

use serde::{Deserialize, Serialize};

use super::KnowledgeItem;

/// 当前配置 schema 版本
pub const SETTINGS_SCHEMA_VERSION: u32 = 2;

/// 默认系统指令
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"你是一位专业的小说创作助手。你的目标是帮助用户创作高质量的小说。

### 核心工作流程
1. **引导与设定 (必要前置)**：
   在开始写正文前，必须通过对话引导用户确认以下 5 项核心要素：
   - **书名** (Title)
   - **世界观/题材** (Worldview/Genre)
   - **核心故事线** (Storyline)
   - **预计总章节数** (Total Chapters)
   - **每章目标字数** (Words per Chapter)

2. **构思与建库**：
   - 生成大纲、背景设定。
   - 生成角色档案、势力分布、关系图谱。

3. **写作执行**：
   - 根据大纲生成章节目录。
   - 逐章撰写正文。

### 输出规则
1. **基础设定区**：使用标题 `## 基础设定`、`## 大纲`、`## 世界观` 或 `## 故事梗概`。
2. **数据库区**：使用标题 `## 角色档案`、`## 势力设定`、`## 物品设定` 或 `## 关系图谱`。
3. **章节正文区**：生成正文时使用标准标题格式 `## 第X章 标题`；生成目录时使用列表格式。
4. **指令识别**：用户确定书名、总章节数或每章字数时，请在回复中明确确认（如“书名：《XXX》”、“预计 50 章”、“每章 3000 字”）。
5. **交互选项**：在回复最后一行提供后续操作建议，格式：`Options: [选项一] [选项二] [选项三]`

### 语气与风格
- 保持简体中文回复。
- 当用户未提供足够信息时，请主动提问引导。
"#;

/// 模型服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Google,
    /// OpenAI 兼容接口（含各类转发网关）
    OpenAi,
}

/// 生成配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    pub schema_version: u32,
    pub provider: ProviderKind,
    pub system_instruction: String,

    // Google Gemini
    pub google_model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub thinking_budget: u32,

    // OpenAI 兼容
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,

    pub max_output_tokens: u32,

    // 小说约束
    pub target_total_chapters: u32,
    pub target_words_per_chapter: u32,

    pub knowledge_items: Vec<KnowledgeItem>,
    pub skill_items: Vec<KnowledgeItem>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            provider: ProviderKind::Google,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            google_model: "gemini-3-flash-preview".to_string(),
            temperature: 0.8,
            top_k: 64,
            top_p: 0.95,
            thinking_budget: 0,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            max_output_tokens: 8192,
            target_total_chapters: 20,
            target_words_per_chapter: 3000,
            knowledge_items: Vec::new(),
            skill_items: Vec::new(),
        }
    }
}

impl GenerationConfig {
    /// 合并补丁，未设置的字段保留原值
    pub fn patched(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &patch.$field {
                        next.$field = value.clone();
                    }
                )*
            };
        }
        merge!(
            provider,
            system_instruction,
            google_model,
            temperature,
            top_k,
            top_p,
            thinking_budget,
            openai_api_key,
            openai_base_url,
            openai_model,
            max_output_tokens,
            target_total_chapters,
            target_words_per_chapter,
            knowledge_items,
            skill_items,
        );
        next
    }

    /// 当前生效的知识库条目
    pub fn active_knowledge(&self) -> impl Iterator<Item = &KnowledgeItem> {
        self.knowledge_items.iter().filter(|item| item.is_active)
    }

    /// 当前生效的技能条目
    pub fn active_skills(&self) -> impl Iterator<Item = &KnowledgeItem> {
        self.skill_items.iter().filter(|item| item.is_active)
    }
}

/// 配置补丁（部分更新）
///
/// 按字段后写覆盖，重复应用同一补丁结果不变
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_total_chapters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_words_per_chapter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "mcpItems")]
    pub knowledge_items: Option<Vec<KnowledgeItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_items: Option<Vec<KnowledgeItem>>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self == &ConfigPatch::default()
    }

    /// 参数校验（温度、采样范围等）
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("temperature 超出范围 [0, 2]: {}", t));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("topP 超出范围 [0, 1]: {}", p));
            }
        }
        if self.max_output_tokens == Some(0) {
            return Err("maxOutputTokens 不能为 0".to_string());
        }
        if self.target_total_chapters == Some(0) {
            return Err("targetTotalChapters 不能为 0".to_string());
        }
        if self.target_words_per_chapter == Some(0) {
            return Err("targetWordsPerChapter 不能为 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.provider, ProviderKind::Google);
        assert_eq!(config.target_total_chapters, 20);
        assert_eq!(config.target_words_per_chapter, 3000);
        assert_eq!(config.max_output_tokens, 8192);
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_patch_is_idempotent() {
        let config = GenerationConfig::default();
        let patch = ConfigPatch {
            target_total_chapters: Some(120),
            temperature: Some(1.1),
            ..Default::default()
        };
        let once = config.patched(&patch);
        let twice = once.patched(&patch);
        assert_eq!(once, twice);
        assert_eq!(once.target_total_chapters, 120);
        assert_eq!(once.target_words_per_chapter, 3000);
    }

    #[test]
    fn test_patch_accepts_legacy_field_name() {
        let patch: ConfigPatch = serde_json::from_str(
            r#"{"mcpItems":[{"name":"世界观","content":"赛博修仙","isActive":true}]}"#,
        )
        .unwrap();
        let config = GenerationConfig::default().patched(&patch);
        assert_eq!(config.active_knowledge().count(), 1);
    }

    #[test]
    fn test_patch_validation() {
        assert!(ConfigPatch::default().validate().is_ok());
        let bad = ConfigPatch {
            temperature: Some(3.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let zero = ConfigPatch {
            target_words_per_chapter: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_empty_patch() {
        assert!(ConfigPatch::default().is_empty());
        let patch = ConfigPatch {
            google_model: Some("gemini-3-pro-preview".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
