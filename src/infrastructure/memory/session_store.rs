//! In-Memory Session Store Implementation
//!
//! 快照保存在 DashMap 中，非瞬时事件写穿到 SessionRepository

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::generation::now_millis;
use crate::application::ports::{
    EventSinkPort, NovelEvent, SessionRepositoryPort, SessionStorePort, StoreError,
};
use crate::domain::novel::{NovelSession, SessionEvent, SessionId};

/// 内存会话存储
pub struct InMemorySessionStore {
    sessions: DashMap<String, Arc<NovelSession>>,
    repository: Option<Arc<dyn SessionRepositoryPort>>,
    events: Arc<dyn EventSinkPort>,
}

impl InMemorySessionStore {
    pub fn new(events: Arc<dyn EventSinkPort>) -> Self {
        Self {
            sessions: DashMap::new(),
            repository: None,
            events,
        }
    }

    /// 启用写穿持久化
    pub fn with_repository(mut self, repository: Arc<dyn SessionRepositoryPort>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 启动时从仓储加载全部会话
    pub async fn load(&self) -> Result<usize, StoreError> {
        let Some(repository) = &self.repository else {
            return Ok(0);
        };
        let sessions = repository.find_all().await?;
        let count = sessions.len();
        for session in sessions {
            self.sessions
                .insert(session.id().to_string(), Arc::new(session));
        }
        tracing::info!(count = count, "Sessions loaded");
        Ok(count)
    }

    async fn persist(&self, session: &NovelSession) -> Result<(), StoreError> {
        let Some(repository) = &self.repository else {
            return Ok(());
        };
        let written = repository.save(session).await.map_err(|e| {
            tracing::error!(session_id = %session.id(), error = %e, "Failed to persist session");
            e
        })?;
        if !written {
            tracing::debug!(
                session_id = %session.id(),
                revision = session.revision(),
                "Skipped stale snapshot"
            );
        }
        Ok(())
    }

    fn announce(&self, session: &NovelSession) {
        self.events.publish(NovelEvent::SessionChanged {
            session_id: session.id().to_string(),
            revision: session.revision(),
        });
    }
}

#[async_trait]
impl SessionStorePort for InMemorySessionStore {
    async fn insert(&self, session: NovelSession) -> Result<Arc<NovelSession>, StoreError> {
        // 覆盖已有会话时修订号必须继续增长
        let existing = self
            .sessions
            .get(session.id().as_str())
            .map(|s| s.revision());
        let session = match existing {
            Some(revision) if session.revision() <= revision => session.with_revision(revision + 1),
            _ => session,
        };

        self.persist(&session).await?;

        let session = Arc::new(session);
        self.sessions
            .insert(session.id().to_string(), session.clone());
        tracing::debug!(
            session_id = %session.id(),
            revision = session.revision(),
            "Session stored"
        );
        self.announce(&session);

        Ok(session)
    }

    fn snapshot(&self, id: &SessionId) -> Option<Arc<NovelSession>> {
        self.sessions.get(id.as_str()).map(|s| s.clone())
    }

    async fn dispatch(
        &self,
        id: &SessionId,
        event: SessionEvent,
    ) -> Result<Arc<NovelSession>, StoreError> {
        let (snapshot, changed) = {
            let mut entry = self
                .sessions
                .get_mut(id.as_str())
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let next = entry.apply(&event, now_millis())?;
            if next.revision() == entry.revision() {
                (entry.clone(), false)
            } else {
                let next = Arc::new(next);
                *entry = next.clone();
                (next, true)
            }
        };

        if !changed {
            return Ok(snapshot);
        }

        tracing::trace!(
            session_id = %id,
            event = event.name(),
            revision = snapshot.revision(),
            "Session event applied"
        );

        if !event.is_transient() {
            self.persist(&snapshot).await?;
        }
        self.announce(&snapshot);

        Ok(snapshot)
    }

    fn list(&self) -> Vec<Arc<NovelSession>> {
        let mut sessions: Vec<Arc<NovelSession>> =
            self.sessions.iter().map(|s| s.value().clone()).collect();
        sessions.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
        sessions
    }

    async fn remove(&self, id: &SessionId) -> Result<bool, StoreError> {
        let in_memory = self.sessions.remove(id.as_str()).is_some();
        let persisted = match &self.repository {
            Some(repository) => repository.delete(id).await?,
            None => false,
        };
        if in_memory {
            tracing::info!(session_id = %id, "Session removed");
        }
        Ok(in_memory || persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::{Message, NovelError};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteSessionRepository,
    };

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Arc::new(EventPublisher::new()))
    }

    #[tokio::test]
    async fn test_dispatch_returns_new_snapshot() {
        let store = store();
        let session = store.insert(NovelSession::new(1)).await.unwrap();
        let id = session.id().clone();

        let next = store
            .dispatch(
                &id,
                SessionEvent::MessageAppended {
                    message: Message::user("你好", 2),
                },
            )
            .await
            .unwrap();
        assert_eq!(next.messages().len(), 2);
        assert_eq!(next.revision(), session.revision() + 1);
        // 旧快照不受影响
        assert_eq!(session.messages().len(), 1);
        assert!(Arc::ptr_eq(&store.snapshot(&id).unwrap(), &next));
    }

    #[tokio::test]
    async fn test_noop_event_keeps_snapshot() {
        let store = store();
        let session = store.insert(NovelSession::new(1)).await.unwrap();
        let same = store
            .dispatch(
                session.id(),
                SessionEvent::SnowflakeModeToggled { enabled: false },
            )
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&session, &same));
    }

    #[tokio::test]
    async fn test_rejected_event_leaves_state() {
        let store = store();
        let session = store.insert(NovelSession::new(1)).await.unwrap();
        let result = store
            .dispatch(
                session.id(),
                SessionEvent::MessageRemoved {
                    message_id: "missing".into(),
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Rejected(NovelError::MessageNotFound(_)))
        ));
        assert!(Arc::ptr_eq(&store.snapshot(session.id()).unwrap(), &session));

        let unknown = store
            .dispatch(&SessionId::from("nope"), SessionEvent::AnchorTriggerAdvanced)
            .await;
        assert!(matches!(unknown, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_over_existing_bumps_revision() {
        let store = store();
        let first = store.insert(NovelSession::new(1)).await.unwrap();
        let replacement = NovelSession::clone(&first);
        let second = store.insert(replacement).await.unwrap();
        assert!(second.revision() > first.revision());
    }

    #[tokio::test]
    async fn test_write_through_and_reload() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repository = Arc::new(SqliteSessionRepository::new(pool));

        let store = store().with_repository(repository.clone());
        let session = store.insert(NovelSession::new(1)).await.unwrap();
        let id = session.id().clone();
        let placeholder = Message::model("", 2);
        let placeholder_id = placeholder.id().clone();
        store
            .dispatch(&id, SessionEvent::MessageAppended { message: placeholder })
            .await
            .unwrap();

        // 流式增量只在内存
        store
            .dispatch(
                &id,
                SessionEvent::MessageStreamed {
                    message_id: placeholder_id.clone(),
                    content: "半".into(),
                },
            )
            .await
            .unwrap();
        let persisted = repository.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(persisted.messages().last().unwrap().content(), "");

        store
            .dispatch(
                &id,
                SessionEvent::MessageFinalized {
                    message_id: placeholder_id,
                    content: "完整".into(),
                },
            )
            .await
            .unwrap();

        let reloaded = InMemorySessionStore::new(Arc::new(EventPublisher::new()))
            .with_repository(repository);
        assert_eq!(reloaded.load().await.unwrap(), 1);
        let snapshot = reloaded.snapshot(&id).unwrap();
        assert_eq!(snapshot.messages().last().unwrap().content(), "完整");
        assert_eq!(snapshot.revision(), store.snapshot(&id).unwrap().revision());
    }

    #[tokio::test]
    async fn test_list_orders_by_last_modified() {
        let store = store();
        let older = store.insert(NovelSession::new(1)).await.unwrap();
        let newer = store.insert(NovelSession::new(5)).await.unwrap();
        let listed = store.list();
        assert_eq!(listed[0].id(), newer.id());
        assert_eq!(listed[1].id(), older.id());

        assert!(store.remove(older.id()).await.unwrap());
        assert!(!store.remove(older.id()).await.unwrap());
        assert_eq!(store.list().len(), 1);
    }
}
