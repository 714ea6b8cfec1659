//! SQLite Novel Session Repository

use async_trait::async_trait;
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, SessionRepositoryPort};
use crate::domain::novel::{NovelSession, SessionId};

/// SQLite Session Repository
pub struct SqliteSessionRepository {
    pool: DbPool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    revision: i64,
    payload: String,
}

impl TryFrom<SessionRow> for NovelSession {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let session: NovelSession = serde_json::from_str(&row.payload).map_err(|e| {
            RepositoryError::SerializationError(format!("session {}: {}", row.id, e))
        })?;
        let revision = u64::try_from(row.revision)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        Ok(session.with_revision(revision))
    }
}

#[async_trait]
impl SessionRepositoryPort for SqliteSessionRepository {
    async fn save(&self, session: &NovelSession) -> Result<bool, RepositoryError> {
        let payload = serde_json::to_string(session)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let revision = i64::try_from(session.revision())
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        // 只接受更新的 revision
        let result = sqlx::query(
            r#"
            INSERT INTO novel_sessions (id, title, created_at, last_modified, revision, payload)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                last_modified = excluded.last_modified,
                revision = excluded.revision,
                payload = excluded.payload
            WHERE excluded.revision > novel_sessions.revision
            "#,
        )
        .bind(session.id().as_str())
        .bind(session.title())
        .bind(session.created_at())
        .bind(session.last_modified())
        .bind(revision)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<NovelSession>, RepositoryError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT id, revision, payload FROM novel_sessions WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(NovelSession::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<NovelSession>, RepositoryError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, revision, payload FROM novel_sessions ORDER BY last_modified DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(NovelSession::try_from).collect()
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM novel_sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
