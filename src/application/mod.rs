//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（GenerationProvider、SessionStore、Repository、GenerationSlot、EventSink）
//! - generation: 流式生成、提示词与编排策略
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod generation;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Novel commands
    CreateNovelSession,
    DeconstructNovel,
    DeleteNovelSession,
    ImportLibrary,
    RenameNovelSession,
    // Chat commands
    AnalyzeChapter,
    EditMessage,
    SendMessage,
    StopGeneration,
    SummarizeConversation,
    // Config commands
    ApplyConfigPatch,
    ConfigureAnchor,
    SetSnowflakeMode,
    // Generation commands
    BatchGenerateChapters,
    BatchGenerateToc,
    ConfirmRewrite,
    ExecuteAnchor,
    RewriteChapter,
    RewriteMode,
    RewriteScope,
    RewriteSelection,
    // Handlers
    handlers::{
        classify_user_input, AnalyzeChapterHandler, AnchorCompactor, AnchorOutcome,
        ApplyConfigPatchHandler, BatchGenerateChaptersHandler, BatchGenerateTocHandler,
        BatchHalt, BatchReport, ConfigureAnchorHandler, ConfirmRewriteHandler,
        CreateNovelSessionHandler, DeconstructNovelHandler, DeleteNovelSessionHandler, EditMessageHandler,
        ExecuteAnchorHandler, ImportLibraryHandler, RenameNovelSessionHandler,
        RewriteChapterHandler, RewriteDraft, RewriteOutcome, RewriteSelectionHandler,
        SendMessageHandler, SetSnowflakeModeHandler, StopGenerationHandler,
        SummarizeConversationHandler, UserIntent,
    },
};

pub use error::ApplicationError;

pub use generation::{GenerationContext, GenerationOutcome, OrchestrationPolicy};

pub use ports::{
    // Events
    EventSinkPort,
    GenerationTask,
    NoticeLevel,
    NovelEvent,
    // Generation provider
    GenerationError,
    GenerationProviderPort,
    GenerationRequest,
    // Generation slot
    GenerationSlotPort,
    SlotError,
    SlotGuard,
    // Repositories
    RepositoryError,
    SessionRepositoryPort,
    // Session store
    SessionStorePort,
    StoreError,
};

pub use queries::{
    ExportLibrary,
    GetNovelDocument,
    GetNovelSession,
    ListNovelSessions,
    // Handlers
    handlers::{
        ExportLibraryHandler, GetNovelDocumentHandler, GetNovelSessionHandler,
        ListNovelSessionsHandler, NovelDocumentResponse, NovelSessionSummary,
    },
};
