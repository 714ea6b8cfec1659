//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                       GET   健康检查
//! - /api/novel/list                 GET   列出会话
//! - /api/novel/create|get|delete|rename|document   POST
//! - /api/novel/import               POST  导入书库（JSON 数组）
//! - /api/novel/export               GET   导出书库
//! - /api/novel/deconstruct          POST  小说拆解/仿写（新建会话并后台分析）
//! - /api/chat/send|stop|edit|analyze|summarize     POST
//! - /api/config/patch|snowflake     POST
//! - /api/anchor/configure|execute   POST
//! - /api/batch/toc|chapters         POST
//! - /api/chapter/rewrite|rewrite_selection|confirm POST
//! - /ws/session/:session_id         WS    会话事件
//! - /ws/events                      WS    书库事件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/session/:session_id", get(handlers::websocket_handler))
        .route("/ws/events", get(handlers::global_websocket_handler))
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/novel", novel_routes())
        .nest("/chat", chat_routes())
        .nest("/config", config_routes())
        .nest("/anchor", anchor_routes())
        .nest("/batch", batch_routes())
        .nest("/chapter", chapter_routes())
}

fn novel_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", get(handlers::list_sessions))
        .route("/create", post(handlers::create_session))
        .route("/get", post(handlers::get_session))
        .route("/delete", post(handlers::delete_session))
        .route("/rename", post(handlers::rename_session))
        .route("/document", post(handlers::get_document))
        .route("/import", post(handlers::import_library))
        .route("/export", get(handlers::export_library))
        .route("/deconstruct", post(handlers::deconstruct_novel))
}

fn chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send", post(handlers::send_message))
        .route("/stop", post(handlers::stop_generation))
        .route("/edit", post(handlers::edit_message))
        .route("/analyze", post(handlers::analyze_chapter))
        .route("/summarize", post(handlers::summarize_conversation))
}

fn config_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/patch", post(handlers::patch_config))
        .route("/snowflake", post(handlers::set_snowflake_mode))
}

fn anchor_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/configure", post(handlers::configure_anchor))
        .route("/execute", post(handlers::execute_anchor))
}

fn batch_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/toc", post(handlers::batch_toc))
        .route("/chapters", post(handlers::batch_chapters))
}

fn chapter_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rewrite", post(handlers::rewrite_chapter))
        .route("/rewrite_selection", post(handlers::rewrite_selection))
        .route("/confirm", post(handlers::confirm_rewrite))
}
