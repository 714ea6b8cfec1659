//! Novel Context - Entities

use serde::{Deserialize, Serialize};

use super::{MessageId, Role};

fn is_false(value: &bool) -> bool {
    !*value
}

/// 对话消息
///
/// 不变量:
/// - 流式生成结束后 content 只允许通过显式编辑或润色/重写替换
/// - 系统提示消息（is_system_notice）只用于展示，不参与文档解析和模型上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    is_system_notice: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp,
            is_system_notice: false,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    pub fn model(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::Model, content, timestamp)
    }

    /// 系统提示（锚点完成、错误信息等）
    pub fn notice(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            is_system_notice: true,
            ..Self::new(Role::Model, content, timestamp)
        }
    }

    /// 生成内容替换后的新快照（ID 与时间戳不变）
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    // Getters
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_system_notice(&self) -> bool {
        self.is_system_notice
    }

    pub fn is_model(&self) -> bool {
        self.role == Role::Model
    }

    /// 是否为可解析的模型正文（排除系统提示）
    pub fn is_authored_model_text(&self) -> bool {
        self.is_model() && !self.is_system_notice
    }
}

/// 知识库 / 技能条目
///
/// 只有 is_active 的条目会注入系统指令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_active: bool,
}

// ============================================================================
// Anchor Policy
// ============================================================================

/// 锚点模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    #[default]
    Chapter,
    /// 按卷锚定（实验性，当前同样按章节数判定）
    Volume,
}

/// 自动锚定间隔（章）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ChapterInterval {
    #[default]
    Twenty,
    Fifty,
}

impl ChapterInterval {
    pub fn get(&self) -> u32 {
        match self {
            ChapterInterval::Twenty => 20,
            ChapterInterval::Fifty => 50,
        }
    }
}

impl TryFrom<u32> for ChapterInterval {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            20 => Ok(ChapterInterval::Twenty),
            50 => Ok(ChapterInterval::Fifty),
            other => Err(format!("无效的锚定间隔: {} (仅支持 20 或 50)", other)),
        }
    }
}

impl From<ChapterInterval> for u32 {
    fn from(interval: ChapterInterval) -> Self {
        interval.get()
    }
}

/// 自动锚定策略
///
/// 不变量: next_trigger 只会向前移动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPolicy {
    pub enabled: bool,
    #[serde(default)]
    pub mode: AnchorMode,
    #[serde(default)]
    pub chapter_interval: ChapterInterval,
    pub next_trigger: u32,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: AnchorMode::Chapter,
            chapter_interval: ChapterInterval::Twenty,
            next_trigger: 20,
        }
    }
}

impl AnchorPolicy {
    /// 当前章节数是否已越过触发点
    pub fn is_due(&self, current_chapters: usize) -> bool {
        self.enabled && current_chapters as u64 >= self.next_trigger as u64
    }

    /// 越过触发点后推进一个间隔
    pub fn advanced(&self) -> Self {
        Self {
            next_trigger: self.next_trigger.saturating_add(self.chapter_interval.get()),
            ..*self
        }
    }

    /// 保存新配置，触发点总是落在当前章节数之后
    pub fn reconfigure(
        &self,
        enabled: bool,
        mode: AnchorMode,
        chapter_interval: ChapterInterval,
        current_chapters: usize,
    ) -> Self {
        let interval = chapter_interval.get() as u64;
        let upcoming = (current_chapters as u64 + 1).div_ceil(interval) * interval;
        let upcoming = u32::try_from(upcoming).unwrap_or(u32::MAX);
        Self {
            enabled,
            mode,
            chapter_interval,
            next_trigger: self.next_trigger.max(upcoming),
        }
    }
}
