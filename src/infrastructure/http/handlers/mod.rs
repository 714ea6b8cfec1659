//! HTTP Handlers

mod batch;
mod chapter;
mod chat;
mod config;
mod novel;
mod ping;
mod websocket;

pub use batch::*;
pub use chapter::*;
pub use chat::*;
pub use config::*;
pub use novel::*;
pub use ping::*;
pub use websocket::*;

use std::future::Future;
use std::sync::Arc;

use crate::application::ApplicationError;
use crate::domain::novel::{NovelSession, SessionId};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 会话必须存在（生成任务在后台执行，提前拒绝无效 ID）
fn require_session(state: &AppState, session_id: &SessionId) -> Result<Arc<NovelSession>, ApiError> {
    state
        .store
        .snapshot(session_id)
        .ok_or_else(|| ApplicationError::not_found("Session", session_id).into())
}

/// 在后台执行已占用槽位的生成任务，失败时推送错误通知
fn spawn_generation<F, T>(state: Arc<AppState>, session_id: SessionId, work: F)
where
    F: Future<Output = Result<T, ApplicationError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = work.await {
            state.report_background_error(session_id.as_str(), e);
        }
    });
}
