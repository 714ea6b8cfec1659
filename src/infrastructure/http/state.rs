//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    AnalyzeChapterHandler, ApplyConfigPatchHandler, BatchGenerateChaptersHandler,
    BatchGenerateTocHandler, ConfigureAnchorHandler, ConfirmRewriteHandler,
    CreateNovelSessionHandler, DeconstructNovelHandler, DeleteNovelSessionHandler, EditMessageHandler,
    ExecuteAnchorHandler, ImportLibraryHandler, RenameNovelSessionHandler, RewriteChapterHandler,
    RewriteSelectionHandler, SendMessageHandler, SetSnowflakeModeHandler, StopGenerationHandler,
    SummarizeConversationHandler,
    // Query handlers
    ExportLibraryHandler, GetNovelDocumentHandler, GetNovelSessionHandler,
    ListNovelSessionsHandler,
    // Shared
    GenerationContext, NoticeLevel, NovelEvent,
};
use crate::application::ports::{EventSinkPort, SessionStorePort};
use crate::infrastructure::events::EventPublisher;

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub store: Arc<dyn SessionStorePort>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub create_session_handler: CreateNovelSessionHandler,
    pub delete_session_handler: DeleteNovelSessionHandler,
    pub rename_session_handler: RenameNovelSessionHandler,
    pub import_library_handler: ImportLibraryHandler,
    pub deconstruct_handler: DeconstructNovelHandler,
    pub send_message_handler: SendMessageHandler,
    pub stop_generation_handler: StopGenerationHandler,
    pub edit_message_handler: EditMessageHandler,
    pub analyze_chapter_handler: AnalyzeChapterHandler,
    pub summarize_handler: SummarizeConversationHandler,
    pub apply_config_handler: ApplyConfigPatchHandler,
    pub configure_anchor_handler: ConfigureAnchorHandler,
    pub snowflake_mode_handler: SetSnowflakeModeHandler,
    pub execute_anchor_handler: ExecuteAnchorHandler,
    pub batch_toc_handler: BatchGenerateTocHandler,
    pub batch_chapters_handler: BatchGenerateChaptersHandler,
    pub rewrite_chapter_handler: RewriteChapterHandler,
    pub rewrite_selection_handler: RewriteSelectionHandler,
    pub confirm_rewrite_handler: ConfirmRewriteHandler,

    // ========== Query Handlers ==========
    pub get_document_handler: GetNovelDocumentHandler,
    pub get_session_handler: GetNovelSessionHandler,
    pub list_sessions_handler: ListNovelSessionsHandler,
    pub export_library_handler: ExportLibraryHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `ctx` 的事件出口应为 `event_publisher`
    pub fn new(ctx: GenerationContext, event_publisher: Arc<EventPublisher>) -> Self {
        let store = ctx.store.clone();
        let slots = ctx.slots.clone();
        let parser = ctx.parser.clone();
        let events: Arc<dyn EventSinkPort> = event_publisher.clone();

        Self {
            // Ports
            store: store.clone(),
            event_publisher,

            // Command handlers
            create_session_handler: CreateNovelSessionHandler::new(store.clone()),
            delete_session_handler: DeleteNovelSessionHandler::new(
                store.clone(),
                slots.clone(),
                events,
            ),
            rename_session_handler: RenameNovelSessionHandler::new(store.clone()),
            import_library_handler: ImportLibraryHandler::new(store.clone()),
            deconstruct_handler: DeconstructNovelHandler::new(ctx.clone()),
            send_message_handler: SendMessageHandler::new(ctx.clone()),
            stop_generation_handler: StopGenerationHandler::new(ctx.clone()),
            edit_message_handler: EditMessageHandler::new(ctx.clone()),
            analyze_chapter_handler: AnalyzeChapterHandler::new(ctx.clone()),
            summarize_handler: SummarizeConversationHandler::new(ctx.clone()),
            apply_config_handler: ApplyConfigPatchHandler::new(store.clone()),
            configure_anchor_handler: ConfigureAnchorHandler::new(store.clone(), parser.clone()),
            snowflake_mode_handler: SetSnowflakeModeHandler::new(store.clone()),
            execute_anchor_handler: ExecuteAnchorHandler::new(ctx.clone()),
            batch_toc_handler: BatchGenerateTocHandler::new(ctx.clone()),
            batch_chapters_handler: BatchGenerateChaptersHandler::new(ctx.clone()),
            rewrite_chapter_handler: RewriteChapterHandler::new(ctx.clone()),
            rewrite_selection_handler: RewriteSelectionHandler::new(ctx.clone()),
            confirm_rewrite_handler: ConfirmRewriteHandler::new(ctx),

            // Query handlers
            get_document_handler: GetNovelDocumentHandler::new(
                store.clone(),
                slots.clone(),
                parser,
            ),
            get_session_handler: GetNovelSessionHandler::new(store.clone()),
            list_sessions_handler: ListNovelSessionsHandler::new(store.clone(), slots),
            export_library_handler: ExportLibraryHandler::new(store),
        }
    }

    /// 后台任务失败时推送错误通知
    pub fn report_background_error(&self, session_id: &str, error: impl std::fmt::Display) {
        tracing::error!(session_id = %session_id, error = %error, "Background generation failed");
        self.event_publisher
            .publish(NovelEvent::notice(session_id, NoticeLevel::Error, error.to_string()));
    }
}
