//! Generation Commands - 锚点、批量生成与重写

use serde::Deserialize;

use crate::domain::novel::{MessageId, SessionId};

/// 手动执行剧情锚点命令
#[derive(Debug, Clone)]
pub struct ExecuteAnchor {
    pub session_id: SessionId,
}

/// 批量生成目录命令
#[derive(Debug, Clone)]
pub struct BatchGenerateToc {
    pub session_id: SessionId,
    pub count: usize,
}

/// 批量生成章节正文命令
#[derive(Debug, Clone)]
pub struct BatchGenerateChapters {
    pub session_id: SessionId,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// 精修润色
    Optimize,
    /// 完全重写
    Regenerate,
}

/// 章节重写草稿命令
#[derive(Debug, Clone)]
pub struct RewriteChapter {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub chapter_title: String,
    pub content: String,
    pub mode: RewriteMode,
}

/// 选中段落润色草稿命令
#[derive(Debug, Clone)]
pub struct RewriteSelection {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteScope {
    #[default]
    Chapter,
    Selection,
}

/// 确认采用重写结果命令
#[derive(Debug, Clone)]
pub struct ConfirmRewrite {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub original: String,
    pub replacement: String,
    pub scope: RewriteScope,
}
