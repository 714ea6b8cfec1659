//! Config / Anchor HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{require_session, spawn_generation};
use crate::application::{
    ApplyConfigPatch, ConfigureAnchor, ExecuteAnchor, GenerationTask, SetSnowflakeMode,
};
use crate::domain::novel::NovelSession;
use crate::infrastructure::http::dto::{
    ApiResponse, ConfigPatchRequest, ConfigureAnchorRequest, SessionRequest,
    SnowflakeModeRequest, TaskAcceptedResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 应用生成配置补丁
pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigPatchRequest>,
) -> Result<Json<ApiResponse<Arc<NovelSession>>>, ApiError> {
    let session = state
        .apply_config_handler
        .handle(ApplyConfigPatch {
            session_id: req.session_id,
            patch: req.patch,
        })
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

pub async fn set_snowflake_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SnowflakeModeRequest>,
) -> Result<Json<ApiResponse<Arc<NovelSession>>>, ApiError> {
    let session = state
        .snowflake_mode_handler
        .handle(SetSnowflakeMode {
            session_id: req.session_id,
            enabled: req.enabled,
        })
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// 保存锚点策略
pub async fn configure_anchor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigureAnchorRequest>,
) -> Result<Json<ApiResponse<Arc<NovelSession>>>, ApiError> {
    let session = state
        .configure_anchor_handler
        .handle(ConfigureAnchor {
            session_id: req.session_id,
            enabled: req.enabled,
            mode: req.mode,
            chapter_interval: req.chapter_interval,
        })
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// 手动执行剧情锚点
pub async fn execute_anchor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    require_session(&state, &req.session_id)?;
    let session_id = req.session_id;
    let slot = state.execute_anchor_handler.acquire(&session_id)?;
    let cmd = ExecuteAnchor {
        session_id: session_id.clone(),
    };

    let worker = state.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.execute_anchor_handler.run(cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::Anchor,
    ))))
}
