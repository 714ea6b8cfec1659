//! Novel Session HTTP Handlers - 书库管理与文档视图

use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use super::spawn_generation;
use crate::application::{
    CreateNovelSession, DeconstructNovel, DeleteNovelSession, ExportLibrary, GenerationTask,
    GetNovelDocument, GetNovelSession, ImportLibrary, ListNovelSessions, NovelDocumentResponse,
    NovelSessionSummary, RenameNovelSession,
};
use crate::domain::novel::NovelSession;
use crate::infrastructure::http::dto::{
    ApiResponse, CreateSessionRequest, DeconstructRequest, Empty, ImportResponse,
    RenameSessionRequest, SessionRequest, TaskAcceptedResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 列出所有会话
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<NovelSessionSummary>>>, ApiError> {
    let sessions = state.list_sessions_handler.handle(ListNovelSessions).await?;
    Ok(Json(ApiResponse::success(sessions)))
}

/// 新建小说
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<ApiResponse<Arc<NovelSession>>>, ApiError> {
    let session = state
        .create_session_handler
        .handle(CreateNovelSession { title: req.title })
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// 获取完整会话
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<Arc<NovelSession>>>, ApiError> {
    let session = state
        .get_session_handler
        .handle(GetNovelSession {
            session_id: req.session_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// 删除会话（生成中拒绝）
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_session_handler
        .handle(DeleteNovelSession {
            session_id: req.session_id,
        })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn rename_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameSessionRequest>,
) -> Result<Json<ApiResponse<Arc<NovelSession>>>, ApiError> {
    let session = state
        .rename_session_handler
        .handle(RenameNovelSession {
            session_id: req.session_id,
            title: req.title,
        })
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// 重建后的文档视图（设定 / 数据库 / 章节 / 统计）
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ApiResponse<NovelDocumentResponse>>, ApiError> {
    let document = state
        .get_document_handler
        .handle(GetNovelDocument {
            session_id: req.session_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(document)))
}

/// 导入书库
pub async fn import_library(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<ImportResponse>>, ApiError> {
    let imported = state
        .import_library_handler
        .handle(ImportLibrary { payload })
        .await?;
    tracing::info!(imported = imported, "Library imported");
    Ok(Json(ApiResponse::success(ImportResponse { imported })))
}

/// 导出书库
pub async fn export_library(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let library = state.export_library_handler.handle(ExportLibrary).await?;
    Ok(Json(ApiResponse::success(library)))
}

/// 小说拆解/仿写：立即返回新会话 ID，分析经 WebSocket 推送
pub async fn deconstruct_novel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeconstructRequest>,
) -> Result<Json<ApiResponse<TaskAcceptedResponse>>, ApiError> {
    let cmd = DeconstructNovel { source: req.source };
    let (session, slot) = state.deconstruct_handler.prepare(&cmd).await?;
    let session_id = session.id().clone();

    let worker = state.clone();
    let run_id = session_id.clone();
    spawn_generation(state, session_id.clone(), async move {
        worker.deconstruct_handler.run(&run_id, cmd, slot).await
    });

    Ok(Json(ApiResponse::success(TaskAcceptedResponse::started(
        session_id,
        GenerationTask::Chat,
    ))))
}
