//! Chapter HTTP Handlers - 重写草稿与确认

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{require_session, spawn_generation};
use crate::application::{ConfirmRewrite, GenerationTask, RewriteChapter, RewriteSelection};
use crate::infrastructure::http::dto::{
    ApiResponse, ConfirmRewriteRequest, RevisionResponse, RewriteChapterRequest,
    RewriteSelectionRequest, TaskAcceptedResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 章节润色/重写，草稿经 DraftProgress / DraftCompleted 推送
pub async fn rewrite_chapter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RewriteChapterRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    require_session(&state, &req.session_id)?;
    let session_id = req.session_id.clone();
    let slot = state.rewrite_chapter_handler.acquire(&session_id)?;
    let cmd = RewriteChapter {
        session_id: req.session_id,
        message_id: req.message_id,
        chapter_title: req.chapter_title,
        content: req.content,
        mode: req.mode,
    };

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.rewrite_chapter_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::Rewrite,
    ))))
}

/// 选中段落润色
pub async fn rewrite_selection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RewriteSelectionRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("请先选择需要润色的文本".to_string()));
    }
    require_session(&state, &req.session_id)?;
    let session_id = req.session_id.clone();
    let slot = state.rewrite_selection_handler.acquire(&session_id)?;
    let cmd = RewriteSelection {
        session_id: req.session_id,
        message_id: req.message_id,
        text: req.text,
    };

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.rewrite_selection_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::Rewrite,
    ))))
}

/// 采用草稿
pub async fn confirm_rewrite(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRewriteRequest>,
) -> Result<Json<ApiResponse<RevisionResponse>>, ApiError> {
    let revision = state
        .confirm_rewrite_handler
        .handle(ConfirmRewrite {
            session_id: req.session_id,
            message_id: req.message_id,
            original: req.original,
            replacement: req.replacement,
            scope: req.scope,
        })
        .await?;
    Ok(Json(ApiResponse::success(RevisionResponse { revision })))
}
