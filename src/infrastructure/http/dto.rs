//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::{GenerationTask, RewriteMode, RewriteScope};
use crate::domain::novel::{AnchorMode, ConfigPatch, MessageId, SessionId};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// Session DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// 拆解目标：书名或链接
#[derive(Debug, Deserialize)]
pub struct DeconstructRequest {
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    pub session_id: SessionId,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

// ============================================================================
// Chat DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub session_id: SessionId,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeChapterRequest {
    pub session_id: SessionId,
    pub chapter_title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
pub struct RevisionResponse {
    pub revision: u64,
}

/// 后台生成任务已启动，结果经 WebSocket 推送
#[derive(Debug, Serialize)]
pub struct TaskAcceptedResponse {
    pub session_id: SessionId,
    pub task: GenerationTask,
    pub status: &'static str,
}

impl TaskAcceptedResponse {
    pub fn started(session_id: SessionId, task: GenerationTask) -> Self {
        Self {
            session_id,
            task,
            status: "started",
        }
    }
}

// ============================================================================
// Config / Anchor DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConfigPatchRequest {
    pub session_id: SessionId,
    pub patch: ConfigPatch,
}

#[derive(Debug, Deserialize)]
pub struct ConfigureAnchorRequest {
    pub session_id: SessionId,
    pub enabled: bool,
    #[serde(default)]
    pub mode: AnchorMode,
    pub chapter_interval: u32,
}

#[derive(Debug, Deserialize)]
pub struct SnowflakeModeRequest {
    pub session_id: SessionId,
    pub enabled: bool,
}

// ============================================================================
// Batch / Rewrite DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub session_id: SessionId,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RewriteChapterRequest {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub chapter_title: String,
    pub content: String,
    pub mode: RewriteMode,
}

#[derive(Debug, Deserialize)]
pub struct RewriteSelectionRequest {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRewriteRequest {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub original: String,
    pub replacement: String,
    #[serde(default)]
    pub scope: RewriteScope,
}
