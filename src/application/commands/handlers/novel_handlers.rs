//! Novel Session Command Handlers - 新建、删除、重命名、导入、拆解

use std::sync::Arc;

use crate::application::commands::{
    CreateNovelSession, DeconstructNovel, DeleteNovelSession, ImportLibrary, RenameNovelSession,
};
use crate::application::error::ApplicationError;
use crate::application::generation::prompts::{deconstruct_prompt, deconstruct_title};
use crate::application::generation::{now_millis, GenerationContext, GenerationOutcome};
use crate::application::ports::{
    EventSinkPort, GenerationSlotPort, GenerationTask, NovelEvent, SessionStorePort, SlotGuard,
};
use crate::domain::novel::{migrate_library, MessageId, NovelSession, SessionEvent, SessionId};

// ============================================================================
// CreateNovelSession
// ============================================================================

/// CreateNovelSession Handler
pub struct CreateNovelSessionHandler {
    store: Arc<dyn SessionStorePort>,
}

impl CreateNovelSessionHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: CreateNovelSession,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        let now = now_millis();
        let mut session = NovelSession::new(now);

        if let Some(title) = command.title.filter(|t| !t.trim().is_empty()) {
            session = session.apply(&SessionEvent::Renamed { title }, now)?;
        }

        let session = self.store.insert(session).await?;

        tracing::info!(
            session_id = %session.id(),
            title = %session.title(),
            "Novel session created"
        );

        Ok(session)
    }
}

// ============================================================================
// DeleteNovelSession
// ============================================================================

/// DeleteNovelSession Handler - 生成中的会话不能删除
pub struct DeleteNovelSessionHandler {
    store: Arc<dyn SessionStorePort>,
    slots: Arc<dyn GenerationSlotPort>,
    events: Arc<dyn EventSinkPort>,
}

impl DeleteNovelSessionHandler {
    pub fn new(
        store: Arc<dyn SessionStorePort>,
        slots: Arc<dyn GenerationSlotPort>,
        events: Arc<dyn EventSinkPort>,
    ) -> Self {
        Self {
            store,
            slots,
            events,
        }
    }

    pub async fn handle(&self, command: DeleteNovelSession) -> Result<(), ApplicationError> {
        if self.slots.is_generating(&command.session_id) {
            return Err(ApplicationError::GenerationInFlight(
                command.session_id.to_string(),
            ));
        }

        let removed = self.store.remove(&command.session_id).await?;
        if !removed {
            return Err(ApplicationError::not_found("Session", &command.session_id));
        }

        self.events.publish(NovelEvent::SessionDeleted {
            session_id: command.session_id.to_string(),
        });

        tracing::info!(session_id = %command.session_id, "Novel session deleted");

        Ok(())
    }
}

// ============================================================================
// RenameNovelSession
// ============================================================================

/// RenameNovelSession Handler - 标题经清洗后写入
pub struct RenameNovelSessionHandler {
    store: Arc<dyn SessionStorePort>,
}

impl RenameNovelSessionHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: RenameNovelSession,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        let session = self
            .store
            .dispatch(
                &command.session_id,
                SessionEvent::Renamed {
                    title: command.title,
                },
            )
            .await?;

        tracing::info!(
            session_id = %command.session_id,
            title = %session.title(),
            "Novel session renamed"
        );

        Ok(session)
    }
}

// ============================================================================
// ImportLibrary
// ============================================================================

/// ImportLibrary Handler - 迁移后逐个写入，返回导入数量
pub struct ImportLibraryHandler {
    store: Arc<dyn SessionStorePort>,
}

impl ImportLibraryHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, command: ImportLibrary) -> Result<usize, ApplicationError> {
        let sessions = migrate_library(command.payload, now_millis())?;
        let count = sessions.len();

        for session in sessions {
            self.store.insert(session).await?;
        }

        tracing::info!(count = count, "Library imported");

        Ok(count)
    }
}

// ============================================================================
// DeconstructNovel
// ============================================================================

/// DeconstructNovel Handler - 新建空白会话，以默认设置流式生成拆解分析
pub struct DeconstructNovelHandler {
    ctx: GenerationContext,
}

impl DeconstructNovelHandler {
    pub fn new(ctx: GenerationContext) -> Self {
        Self { ctx }
    }

    /// 建立会话并占用槽位（调用方随后在后台任务中执行 `run`）
    ///
    /// 欢迎语被移除，分析提示成为第一条消息
    pub async fn prepare(
        &self,
        cmd: &DeconstructNovel,
    ) -> Result<(Arc<NovelSession>, SlotGuard), ApplicationError> {
        let source = cmd.source.trim();
        if source.is_empty() {
            return Err(ApplicationError::validation("请输入小说名称或链接"));
        }

        let now = now_millis();
        let blank = NovelSession::new(now);
        let greeting: Vec<MessageId> = blank.messages().iter().map(|m| m.id().clone()).collect();
        let mut session = blank.apply(
            &SessionEvent::Renamed {
                title: deconstruct_title(source),
            },
            now,
        )?;
        for message_id in greeting {
            session = session.apply(&SessionEvent::MessageRemoved { message_id }, now)?;
        }

        let session = self.ctx.store.insert(session).await?;
        let slot = self.ctx.acquire(session.id())?;

        tracing::info!(
            session_id = %session.id(),
            title = %session.title(),
            "Deconstruction session created"
        );

        Ok((session, slot))
    }

    pub async fn handle(
        &self,
        cmd: DeconstructNovel,
    ) -> Result<(SessionId, GenerationOutcome), ApplicationError> {
        let (session, slot) = self.prepare(&cmd).await?;
        let session_id = session.id().clone();
        let outcome = self.run(&session_id, cmd, slot).await?;
        Ok((session_id, outcome))
    }

    pub async fn run(
        &self,
        session_id: &SessionId,
        cmd: DeconstructNovel,
        slot: SlotGuard,
    ) -> Result<GenerationOutcome, ApplicationError> {
        self.ctx.events.publish(NovelEvent::GenerationStarted {
            session_id: session_id.to_string(),
            task: GenerationTask::Chat,
        });

        let outcome = self
            .ctx
            .exchange(session_id, deconstruct_prompt(cmd.source.trim()), slot.token())
            .await?;

        tracing::info!(
            session_id = %session_id,
            outcome = outcome.as_str(),
            "Novel deconstruction finished"
        );
        self.ctx.events.publish(NovelEvent::GenerationFinished {
            session_id: session_id.to_string(),
            task: GenerationTask::Chat,
            outcome: outcome.as_str().to_string(),
        });

        Ok(outcome)
    }
}
