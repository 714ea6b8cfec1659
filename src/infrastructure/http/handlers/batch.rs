//! Batch HTTP Handlers - 批量目录与批量章节

use axum::{extract::State, Json};
use std::sync::Arc;

use super::spawn_generation;
use crate::application::{BatchGenerateChapters, BatchGenerateToc, GenerationTask};
use crate::infrastructure::http::dto::{ApiResponse, BatchRequest, TaskAcceptedResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn batch_toc(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    let session_id = req.session_id;
    let cmd = BatchGenerateToc {
        session_id: session_id.clone(),
        count: req.count,
    };
    state.batch_toc_handler.validate(&cmd)?;
    let slot = state.batch_toc_handler.acquire(&session_id)?;

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.batch_toc_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::BatchToc,
    ))))
}

/// 批量撰写章节（进度经 WebSocket 推送 BatchProgress）
pub async fn batch_chapters(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    let session_id = req.session_id;
    let cmd = BatchGenerateChapters {
        session_id: session_id.clone(),
        count: req.count,
    };
    // 目录缺失、数量越界直接返回给调用方
    state.batch_chapters_handler.validate(&cmd)?;
    let slot = state.batch_chapters_handler.acquire(&session_id)?;

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.batch_chapters_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::BatchChapters,
    ))))
}
