//! Novel Context - 会话事件
//!
//! 所有对 NovelSession 的修改都以事件形式提交给 reducer（[`super::NovelSession::apply`]）

use serde::{Deserialize, Serialize};

use super::{AnchorPolicy, ConfigPatch, Message, MessageId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// 追加消息（用户输入、占位回复、系统提示）
    MessageAppended { message: Message },

    /// 流式增量提交（只更新内存快照，不落盘）
    MessageStreamed { message_id: MessageId, content: String },

    /// 流式结束后的最终内容
    MessageFinalized { message_id: MessageId, content: String },

    /// 用户编辑或润色确认
    MessageEdited { message_id: MessageId, content: String },

    MessageRemoved { message_id: MessageId },

    /// 锚点提交：截断到响应消息、写入摘要、追加系统提示
    AnchorCommitted {
        response_id: MessageId,
        digest: String,
        notice: Message,
    },

    Renamed { title: String },

    ConfigPatched { patch: ConfigPatch },

    AnchorPolicyChanged { policy: AnchorPolicy },

    /// 自动锚点触发点推进一个间隔
    AnchorTriggerAdvanced,

    SnowflakeModeToggled { enabled: bool },
}

impl SessionEvent {
    /// 瞬时事件只影响内存快照
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionEvent::MessageStreamed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message_appended",
            SessionEvent::MessageStreamed { .. } => "message_streamed",
            SessionEvent::MessageFinalized { .. } => "message_finalized",
            SessionEvent::MessageEdited { .. } => "message_edited",
            SessionEvent::MessageRemoved { .. } => "message_removed",
            SessionEvent::AnchorCommitted { .. } => "anchor_committed",
            SessionEvent::Renamed { .. } => "renamed",
            SessionEvent::ConfigPatched { .. } => "config_patched",
            SessionEvent::AnchorPolicyChanged { .. } => "anchor_policy_changed",
            SessionEvent::AnchorTriggerAdvanced => "anchor_trigger_advanced",
            SessionEvent::SnowflakeModeToggled { .. } => "snowflake_mode_toggled",
        }
    }
}
