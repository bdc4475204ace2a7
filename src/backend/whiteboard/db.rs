/**
 * Database Operations for Whiteboard Sessions and History
 *
 * # Concurrency
 *
 * `lock_session` takes the session row lock (`FOR UPDATE`) that
 * serializes the read-snapshot-write sequence per room. On top of the
 * lock, `apply_state` carries an optimistic `WHERE version = $expected`
 * guard: zero rows affected means another writer got there first, which
 * the caller maps to a retryable conflict.
 *
 * History rows are insert-only; nothing in this module updates or
 * deletes them.
 */
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::backend::whiteboard::session::{HistoryDraft, SessionRow};

/// A history row as read from storage
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub version: i32,
    pub state_json: Option<String>,
    pub modified_by: Uuid,
    pub change_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str =
    "id, room_id, state_json, last_modified_by, version, is_active, created_at, updated_at";

/// Fetch the room's active session without locking
pub async fn find_session(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<Option<SessionRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM whiteboard_sessions WHERE room_id = $1 AND is_active"
    );
    sqlx::query_as::<_, SessionRow>(&sql)
        .bind(room_id)
        .fetch_optional(executor)
        .await
}

/// Fetch the room's active session, holding its row lock
pub async fn lock_session(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<Option<SessionRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM whiteboard_sessions WHERE room_id = $1 AND is_active FOR UPDATE"
    );
    sqlx::query_as::<_, SessionRow>(&sql)
        .bind(room_id)
        .fetch_optional(executor)
        .await
}

/// Create the room's session lazily at version 1 with no state
///
/// Concurrent creators race on the partial unique index; the loser's
/// insert is a no-op and the existing row is returned by the caller's
/// re-read.
pub async fn create_session(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO whiteboard_sessions
            (id, room_id, state_json, last_modified_by, version, is_active, created_at, updated_at)
        VALUES ($1, $2, NULL, NULL, 1, TRUE, $3, $3)
        ON CONFLICT (room_id) WHERE is_active DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert a drafted history snapshot
pub async fn insert_history(
    executor: impl PgExecutor<'_>,
    session_id: Uuid,
    draft: &HistoryDraft,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO whiteboard_history
            (id, session_id, version, state_json, modified_by, change_description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(draft.version)
    .bind(&draft.state_json)
    .bind(draft.modified_by)
    .bind(&draft.change_description)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Apply the new state, advancing the version by exactly one
///
/// Returns `true` when the guarded update took effect; `false` means
/// the expected version no longer matched.
pub async fn apply_state(
    executor: impl PgExecutor<'_>,
    session_id: Uuid,
    expected_version: i32,
    new_state_json: &str,
    actor: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE whiteboard_sessions
        SET state_json = $3,
            version = version + 1,
            last_modified_by = $4,
            updated_at = $5
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(session_id)
    .bind(expected_version)
    .bind(new_state_json)
    .bind(actor)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Most recent history rows for a session, newest first
pub async fn list_history(
    executor: impl PgExecutor<'_>,
    session_id: Uuid,
    limit: i64,
) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT id, session_id, version, state_json, modified_by, change_description, created_at
        FROM whiteboard_history
        WHERE session_id = $1
        ORDER BY version DESC
        LIMIT $2
        "#,
    )
    .bind(session_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
