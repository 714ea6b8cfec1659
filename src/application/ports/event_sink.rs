//! Event Sink Port - 推送给界面的通知与进度

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 生成任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTask {
    Chat,
    Anchor,
    BatchToc,
    BatchChapters,
    Rewrite,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum NovelEvent {
    /// 会话产生新快照，界面据此重新查询文档
    SessionChanged { session_id: String, revision: u64 },
    GenerationStarted {
        session_id: String,
        task: GenerationTask,
    },
    GenerationFinished {
        session_id: String,
        task: GenerationTask,
        outcome: String,
    },
    /// 重写草稿的流式内容（不写入会话）
    DraftProgress {
        session_id: String,
        draft_id: String,
        content: String,
    },
    DraftCompleted {
        session_id: String,
        draft_id: String,
        content: String,
    },
    Notice {
        session_id: String,
        level: NoticeLevel,
        message: String,
    },
    BatchProgress {
        session_id: String,
        index: usize,
        total: usize,
    },
    AnchorCompleted {
        session_id: String,
        preview: String,
    },
    SessionDeleted { session_id: String },
}

impl NovelEvent {
    pub fn session_id(&self) -> &str {
        match self {
            NovelEvent::SessionChanged { session_id, .. }
            | NovelEvent::GenerationStarted { session_id, .. }
            | NovelEvent::GenerationFinished { session_id, .. }
            | NovelEvent::DraftProgress { session_id, .. }
            | NovelEvent::DraftCompleted { session_id, .. }
            | NovelEvent::Notice { session_id, .. }
            | NovelEvent::BatchProgress { session_id, .. }
            | NovelEvent::AnchorCompleted { session_id, .. }
            | NovelEvent::SessionDeleted { session_id } => session_id,
        }
    }

    pub fn notice(session_id: impl ToString, level: NoticeLevel, message: impl Into<String>) -> Self {
        NovelEvent::Notice {
            session_id: session_id.to_string(),
            level,
            message: message.into(),
        }
    }
}

pub trait EventSinkPort: Send + Sync {
    fn publish(&self, event: NovelEvent);
}
