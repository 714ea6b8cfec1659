//! Novel Context - Aggregate Root

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{
    migrate_settings, AnchorPolicy, GenerationConfig, Message, MessageId, NovelError, SessionEvent,
    SessionId, Title,
};
use crate::domain::document::sanitize_title;

/// 新建小说时的欢迎消息
pub const WELCOME_MESSAGE: &str = "你好！我是你的 AI 小说创作助手。\n\n我们将分三步完成创作：\n1. **确认基础设定**（书名、题材、故事线）。\n2. **生成数据库**（大纲、角色）。\n3. **生成正文**。\n\n请告诉我你想写什么类型的故事？\n\nOptions: [玄幻修仙] [赛博朋克] [都市异能]";

fn deserialize_settings<'de, D>(deserializer: D) -> Result<GenerationConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    migrate_settings(raw).map_err(serde::de::Error::custom)
}

/// NovelSession 聚合根
///
/// 不变量:
/// - messages 是唯一事实来源，设定/数据库/章节/统计都是对它的纯计算
/// - 每次修改产生新的快照（消息以 Arc 共享），revision 单调递增
/// - 无变化的事件不推进 revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelSession {
    id: SessionId,
    #[serde(default)]
    title: Title,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    last_modified: i64,
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    messages: Vec<Arc<Message>>,
    #[serde(default, deserialize_with = "deserialize_settings")]
    settings: GenerationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor_config: Option<AnchorPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snowflake_mode: Option<bool>,
}

impl NovelSession {
    /// 创建新小说（带欢迎消息与默认锚点策略）
    pub fn new(now: i64) -> Self {
        Self {
            id: SessionId::new(),
            title: Title::default(),
            created_at: now,
            last_modified: now,
            revision: 0,
            messages: vec![Arc::new(Message::model(WELCOME_MESSAGE, now))],
            settings: GenerationConfig::default(),
            context_summary: None,
            anchor_config: Some(AnchorPolicy::default()),
            snowflake_mode: None,
        }
    }

    /// 以指定修订号替换（导入覆盖已有会话时使用）
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Reducer：应用事件，返回新快照
    pub fn apply(&self, event: &SessionEvent, now: i64) -> Result<NovelSession, NovelError> {
        let mut next = self.clone();

        let changed = match event {
            SessionEvent::MessageAppended { message } => {
                if self.position(message.id()).is_some() {
                    return Err(NovelError::DuplicateMessage(message.id().clone()));
                }
                next.messages.push(Arc::new(message.clone()));
                true
            }
            SessionEvent::MessageStreamed { message_id, content }
            | SessionEvent::MessageFinalized { message_id, content }
            | SessionEvent::MessageEdited { message_id, content } => {
                next.replace_content(message_id, content)?
            }
            SessionEvent::MessageRemoved { message_id } => {
                let index = self.require_position(message_id)?;
                next.messages.remove(index);
                true
            }
            SessionEvent::AnchorCommitted {
                response_id,
                digest,
                notice,
            } => {
                if digest.trim().is_empty() {
                    return Err(NovelError::EmptyDigest);
                }
                let index = self.require_position(response_id)?;
                next.messages.truncate(index + 1);
                next.messages[index] = Arc::new(self.messages[index].with_content(digest.clone()));
                next.messages.push(Arc::new(notice.clone()));
                next.context_summary = Some(digest.clone());
                true
            }
            SessionEvent::Renamed { title } => {
                let title = Title::new(sanitize_title(title))
                    .map_err(|e| NovelError::InvalidTitle(e.to_string()))?;
                if title == self.title {
                    false
                } else {
                    next.title = title;
                    true
                }
            }
            SessionEvent::ConfigPatched { patch } => {
                patch.validate().map_err(NovelError::InvalidConfig)?;
                let settings = self.settings.patched(patch);
                if settings == self.settings {
                    false
                } else {
                    next.settings = settings;
                    true
                }
            }
            SessionEvent::AnchorPolicyChanged { policy } => {
                if self.anchor_config.as_ref() == Some(policy) {
                    false
                } else {
                    next.anchor_config = Some(*policy);
                    true
                }
            }
            SessionEvent::AnchorTriggerAdvanced => {
                next.anchor_config = Some(self.anchor_policy().advanced());
                true
            }
            SessionEvent::SnowflakeModeToggled { enabled } => {
                if self.snowflake_mode() == *enabled {
                    false
                } else {
                    next.snowflake_mode = Some(*enabled);
                    true
                }
            }
        };

        if changed {
            next.revision += 1;
            next.last_modified = now;
        }
        Ok(next)
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    fn require_position(&self, id: &MessageId) -> Result<usize, NovelError> {
        self.position(id)
            .ok_or_else(|| NovelError::MessageNotFound(id.clone()))
    }

    /// 结构化替换单条消息，其余消息共享原 Arc
    fn replace_content(&mut self, id: &MessageId, content: &str) -> Result<bool, NovelError> {
        let index = self.require_position(id)?;
        if self.messages[index].content() == content {
            return Ok(false);
        }
        self.messages[index] = Arc::new(self.messages[index].with_content(content));
        Ok(true)
    }

    // Getters
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn find_message(&self, id: &MessageId) -> Option<&Arc<Message>> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn last_message(&self) -> Option<&Arc<Message>> {
        self.messages.last()
    }

    pub fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    pub fn context_summary(&self) -> Option<&str> {
        self.context_summary.as_deref()
    }

    pub fn anchor_config(&self) -> Option<&AnchorPolicy> {
        self.anchor_config.as_ref()
    }

    /// 生效的锚点策略（缺省时为默认关闭策略）
    pub fn anchor_policy(&self) -> AnchorPolicy {
        self.anchor_config.unwrap_or_default()
    }

    pub fn snowflake_mode(&self) -> bool {
        self.snowflake_mode.unwrap_or(false)
    }
}
