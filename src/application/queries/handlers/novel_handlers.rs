//! Novel Query Handlers

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationSlotPort, SessionStorePort};
use crate::application::queries::{
    ExportLibrary, GetNovelDocument, GetNovelSession, ListNovelSessions,
};
use crate::domain::document::{DocumentParser, NovelDocument};
use crate::domain::novel::{NovelSession, SessionId};

// ============================================================================
// Response DTOs
// ============================================================================

/// 书库列表条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelSessionSummary {
    pub id: SessionId,
    pub title: String,
    pub created_at: i64,
    pub last_modified: i64,
    pub message_count: usize,
    pub is_generating: bool,
}

/// 文档视图响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelDocumentResponse {
    pub session_id: SessionId,
    pub revision: u64,
    pub is_generating: bool,
    #[serde(flatten)]
    pub document: NovelDocument,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetNovelDocument Handler - 每次查询都从快照完整重算
pub struct GetNovelDocumentHandler {
    store: Arc<dyn SessionStorePort>,
    slots: Arc<dyn GenerationSlotPort>,
    parser: Arc<DocumentParser>,
}

impl GetNovelDocumentHandler {
    pub fn new(
        store: Arc<dyn SessionStorePort>,
        slots: Arc<dyn GenerationSlotPort>,
        parser: Arc<DocumentParser>,
    ) -> Self {
        Self {
            store,
            slots,
            parser,
        }
    }

    pub async fn handle(
        &self,
        query: GetNovelDocument,
    ) -> Result<NovelDocumentResponse, ApplicationError> {
        let session = self
            .store
            .snapshot(&query.session_id)
            .ok_or_else(|| ApplicationError::not_found("Session", &query.session_id))?;

        let document = self.parser.parse(&session);
        tracing::debug!(
            session_id = %query.session_id,
            revision = session.revision(),
            chapters = document.chapters.len(),
            "Document rebuilt"
        );

        Ok(NovelDocumentResponse {
            session_id: query.session_id.clone(),
            revision: session.revision(),
            is_generating: self.slots.is_generating(&query.session_id),
            document,
        })
    }
}

/// GetNovelSession Handler
pub struct GetNovelSessionHandler {
    store: Arc<dyn SessionStorePort>,
}

impl GetNovelSessionHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetNovelSession,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        self.store
            .snapshot(&query.session_id)
            .ok_or_else(|| ApplicationError::not_found("Session", &query.session_id))
    }
}

/// ListNovelSessions Handler
pub struct ListNovelSessionsHandler {
    store: Arc<dyn SessionStorePort>,
    slots: Arc<dyn GenerationSlotPort>,
}

impl ListNovelSessionsHandler {
    pub fn new(store: Arc<dyn SessionStorePort>, slots: Arc<dyn GenerationSlotPort>) -> Self {
        Self { store, slots }
    }

    pub async fn handle(
        &self,
        _query: ListNovelSessions,
    ) -> Result<Vec<NovelSessionSummary>, ApplicationError> {
        Ok(self
            .store
            .list()
            .into_iter()
            .map(|session| NovelSessionSummary {
                id: session.id().clone(),
                title: session.title().to_string(),
                created_at: session.created_at(),
                last_modified: session.last_modified(),
                message_count: session.messages().len(),
                is_generating: self.slots.is_generating(session.id()),
            })
            .collect())
    }
}

/// ExportLibrary Handler - 输出 NovelSession 数组
pub struct ExportLibraryHandler {
    store: Arc<dyn SessionStorePort>,
}

impl ExportLibraryHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, _query: ExportLibrary) -> Result<Value, ApplicationError> {
        let sessions = self.store.list();
        let records: Vec<&NovelSession> = sessions.iter().map(Arc::as_ref).collect();
        let payload = serde_json::to_value(records)
            .map_err(|e| ApplicationError::internal(format!("导出失败: {}", e)))?;

        tracing::info!(count = sessions.len(), "Library exported");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::{harness, seed_replies};
    use crate::application::commands::handlers::ImportLibraryHandler;
    use crate::application::commands::ImportLibrary;

    #[tokio::test]
    async fn test_document_view() {
        let h = harness(vec![]).await;
        let id = seed_replies(
            &h,
            &[
                "## 基础设定\n赛博修仙\n\n## 角色档案\n林风：主角",
                "## 第2章 归来\n第二章正文",
                "## 第1章 出发\n第一章正文\n\nOptions: [继续写下一章] [重写本章]",
            ],
        )
        .await;

        let handler = GetNovelDocumentHandler::new(
            h.ctx.store.clone(),
            h.ctx.slots.clone(),
            h.ctx.parser.clone(),
        );
        let response = handler
            .handle(GetNovelDocument {
                session_id: id.clone(),
            })
            .await
            .unwrap();

        let titles: Vec<&str> = response
            .document
            .chapters
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["第1章 出发", "第2章 归来"]);
        assert_eq!(response.document.stats.current_chapters, 2);
        assert_eq!(response.document.quick_replies, vec!["继续写下一章", "重写本章"]);
        assert!(!response.is_generating);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("chapters").is_some());
        assert!(json.get("revision").is_some());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let h = harness(vec![]).await;
        let result = GetNovelSessionHandler::new(h.ctx.store.clone())
            .handle(GetNovelSession {
                session_id: SessionId::from("missing"),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_export_round_trips_through_import() {
        let source = harness(vec![]).await;
        seed_replies(&source, &["## 第1章 起\n正文"]).await;
        seed_replies(&source, &["## 基础设定\n设定"]).await;

        let payload = ExportLibraryHandler::new(source.ctx.store.clone())
            .handle(ExportLibrary)
            .await
            .unwrap();
        assert_eq!(payload.as_array().map(Vec::len), Some(2));

        let target = harness(vec![]).await;
        let count = ImportLibraryHandler::new(target.ctx.store.clone())
            .handle(ImportLibrary { payload })
            .await
            .unwrap();
        assert_eq!(count, 2);

        let listed = ListNovelSessionsHandler::new(target.ctx.store.clone(), target.ctx.slots.clone())
            .handle(ListNovelSessions)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.message_count == 3));
    }
}
