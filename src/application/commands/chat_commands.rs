//! Chat Commands - 对话

use crate::domain::novel::{MessageId, SessionId};

/// 发送消息命令
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub session_id: SessionId,
    pub content: String,
}

/// 停止生成命令
#[derive(Debug, Clone)]
pub struct StopGeneration {
    pub session_id: SessionId,
}

/// 编辑消息命令
#[derive(Debug, Clone)]
pub struct EditMessage {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub content: String,
}

/// 分析章节命令
#[derive(Debug, Clone)]
pub struct AnalyzeChapter {
    pub session_id: SessionId,
    pub chapter_title: String,
    pub content: String,
}

/// 总结对话命令
#[derive(Debug, Clone)]
pub struct SummarizeConversation {
    pub session_id: SessionId,
}
