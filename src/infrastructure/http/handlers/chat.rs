//! Chat HTTP Handlers
//!
//! 发送、分析、总结在后台执行；流式内容经 `/ws/session/:id` 推送

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{require_session, spawn_generation};
use crate::application::{
    classify_user_input, AnalyzeChapter, BatchGenerateChapters, EditMessage, GenerationTask,
    RewriteChapter, RewriteMode, SendMessage, StopGeneration, SummarizeConversation, UserIntent,
};
use crate::infrastructure::http::dto::{
    AnalyzeChapterRequest, ApiResponse, EditMessageRequest, RevisionResponse, SendMessageRequest,
    SessionRequest, StopResponse, TaskAcceptedResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 发送消息
///
/// 快捷回复“继续写下一章”转为单章批量生成，“重写本章”转为重写草稿
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("消息内容不能为空".to_string()));
    }
    let session = require_session(&state, &req.session_id)?;
    let session_id = req.session_id.clone();

    let task = match classify_user_input(&req.content, &session) {
        UserIntent::ContinueNextChapter => {
            let cmd = BatchGenerateChapters {
                session_id: session_id.clone(),
                count: 1,
            };
            state.batch_chapters_handler.validate(&cmd)?;
            let slot = state.batch_chapters_handler.acquire(&session_id)?;
            let worker = state.clone();
            spawn_generation(state.clone(), session_id.clone(), async move {
                worker.batch_chapters_handler.run(cmd, slot).await
            });
            GenerationTask::BatchChapters
        }
        UserIntent::RewriteLastChapter {
            message_id,
            chapter_title,
            content,
        } => {
            let slot = state.rewrite_chapter_handler.acquire(&session_id)?;
            let cmd = RewriteChapter {
                session_id: session_id.clone(),
                message_id,
                chapter_title,
                content,
                mode: RewriteMode::Regenerate,
            };
            let worker = state.clone();
            spawn_generation(state.clone(), session_id.clone(), async move {
                worker.rewrite_chapter_handler.run(cmd, slot).await
            });
            GenerationTask::Rewrite
        }
        UserIntent::Send => {
            let slot = state.send_message_handler.acquire(&session_id)?;
            let cmd = SendMessage {
                session_id: session_id.clone(),
                content: req.content,
            };
            let worker = state.clone();
            spawn_generation(state.clone(), session_id.clone(), async move {
                worker.send_message_handler.run(cmd, slot).await
            });
            GenerationTask::Chat
        }
    };

    tracing::info!(session_id = %session_id, task = ?task, "Generation accepted");
    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(session_id, task))))
}

/// 停止生成
pub async fn stop_generation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<StopResponse>>, ApiError> {
    let stopped = state.stop_generation_handler.handle(StopGeneration {
        session_id: req.session_id,
    });
    Ok(Json(ApiResponse::success(StopResponse { stopped })))
}

/// 编辑消息
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<ApiResponse<RevisionResponse>>, ApiError> {
    let revision = state
        .edit_message_handler
        .handle(EditMessage {
            session_id: req.session_id,
            message_id: req.message_id,
            content: req.content,
        })
        .await?;
    Ok(Json(ApiResponse::success(RevisionResponse { revision })))
}

/// 分析章节
pub async fn analyze_chapter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeChapterRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    require_session(&state, &req.session_id)?;
    let session_id = req.session_id.clone();
    let slot = state.analyze_chapter_handler.acquire(&session_id)?;
    let cmd = AnalyzeChapter {
        session_id: req.session_id,
        chapter_title: req.chapter_title,
        content: req.content,
    };

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.analyze_chapter_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::Chat,
    ))))
}

/// 总结对话
pub async fn summarize_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    require_session(&state, &req.session_id)?;
    let session_id = req.session_id;
    let slot = state.summarize_handler.acquire(&session_id)?;
    let cmd = SummarizeConversation {
        session_id: session_id.clone(),
    };

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.summarize_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::Chat,
    ))))
}
