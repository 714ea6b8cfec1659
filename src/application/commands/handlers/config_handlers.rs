//! Config Command Handlers - 生成配置、锚点策略、雪花模式

use std::sync::Arc;

use crate::application::commands::{ApplyConfigPatch, ConfigureAnchor, SetSnowflakeMode};
use crate::application::error::ApplicationError;
use crate::application::ports::SessionStorePort;
use crate::domain::document::DocumentParser;
use crate::domain::novel::{ChapterInterval, NovelSession, SessionEvent};

/// ApplyConfigPatch Handler
pub struct ApplyConfigPatchHandler {
    store: Arc<dyn SessionStorePort>,
}

impl ApplyConfigPatchHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: ApplyConfigPatch,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        command.patch.validate().map_err(ApplicationError::validation)?;

        let session = self
            .store
            .dispatch(
                &command.session_id,
                SessionEvent::ConfigPatched {
                    patch: command.patch,
                },
            )
            .await?;

        tracing::info!(
            session_id = %command.session_id,
            revision = session.revision(),
            "Generation config updated"
        );

        Ok(session)
    }
}

/// ConfigureAnchor Handler - 新触发点按当前章节数推算
pub struct ConfigureAnchorHandler {
    store: Arc<dyn SessionStorePort>,
    parser: Arc<DocumentParser>,
}

impl ConfigureAnchorHandler {
    pub fn new(store: Arc<dyn SessionStorePort>, parser: Arc<DocumentParser>) -> Self {
        Self { store, parser }
    }

    pub async fn handle(
        &self,
        command: ConfigureAnchor,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        let interval = ChapterInterval::try_from(command.chapter_interval)
            .map_err(ApplicationError::validation)?;

        let session = self
            .store
            .snapshot(&command.session_id)
            .ok_or_else(|| ApplicationError::not_found("Session", &command.session_id))?;

        let current_chapters = self.parser.count_chapters(session.messages());
        let policy = session.anchor_policy().reconfigure(
            command.enabled,
            command.mode,
            interval,
            current_chapters,
        );

        let session = self
            .store
            .dispatch(
                &command.session_id,
                SessionEvent::AnchorPolicyChanged { policy },
            )
            .await?;

        tracing::info!(
            session_id = %command.session_id,
            enabled = policy.enabled,
            next_trigger = policy.next_trigger,
            "Anchor policy saved"
        );

        Ok(session)
    }
}

/// SetSnowflakeMode Handler
pub struct SetSnowflakeModeHandler {
    store: Arc<dyn SessionStorePort>,
}

impl SetSnowflakeModeHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: SetSnowflakeMode,
    ) -> Result<Arc<NovelSession>, ApplicationError> {
        Ok(self
            .store
            .dispatch(
                &command.session_id,
                SessionEvent::SnowflakeModeToggled {
                    enabled: command.enabled,
                },
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::{harness, seed_replies};
    use crate::domain::novel::{AnchorMode, ConfigPatch};

    #[tokio::test]
    async fn test_config_patch_validated() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &[]).await;
        let handler = ApplyConfigPatchHandler::new(h.ctx.store.clone());

        let session = handler
            .handle(ApplyConfigPatch {
                session_id: id.clone(),
                patch: ConfigPatch {
                    target_total_chapters: Some(120),
                    ..ConfigPatch::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(session.settings().target_total_chapters, 120);

        let invalid = handler
            .handle(ApplyConfigPatch {
                session_id: id,
                patch: ConfigPatch {
                    temperature: Some(5.0),
                    ..ConfigPatch::default()
                },
            })
            .await;
        assert!(matches!(invalid, Err(ApplicationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_configure_anchor_from_chapter_count() {
        let h = harness(vec![]).await;
        let chapters: Vec<String> = (1..=25).map(|n| format!("## 第{}章 章\n正文{}", n, n)).collect();
        let refs: Vec<&str> = chapters.iter().map(String::as_str).collect();
        let id = seed_replies(&h, &refs).await;
        let handler = ConfigureAnchorHandler::new(h.ctx.store.clone(), h.ctx.parser.clone());

        let session = handler
            .handle(ConfigureAnchor {
                session_id: id.clone(),
                enabled: true,
                mode: AnchorMode::Chapter,
                chapter_interval: 20,
            })
            .await
            .unwrap();
        let policy = session.anchor_policy();
        assert!(policy.enabled);
        assert_eq!(policy.next_trigger, 40);

        let invalid = handler
            .handle(ConfigureAnchor {
                session_id: id,
                enabled: true,
                mode: AnchorMode::Chapter,
                chapter_interval: 30,
            })
            .await;
        assert!(matches!(invalid, Err(ApplicationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_snowflake_toggle() {
        let h = harness(vec![]).await;
        let id = seed_replies(&h, &[]).await;
        let handler = SetSnowflakeModeHandler::new(h.ctx.store.clone());

        let session = handler
            .handle(SetSnowflakeMode {
                session_id: id,
                enabled: true,
            })
            .await
            .unwrap();
        assert!(session.snowflake_mode());
    }
}
