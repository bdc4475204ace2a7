/**
 * Database Operations for Collaboration Events
 *
 * The event log is write-only: rows are inserted and read, never
 * updated or deleted. Payloads are stored as TEXT JSON.
 */
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::shared::types::CollabEventType;

/// An event row joined with the acting user's identity
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub event_type: String,
    pub event_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Append an event to a room's audit log
///
/// Callers gate on their own authorization rules before appending; this
/// is a pure insert. Pass the caller's transaction as the executor so
/// the event commits atomically with the mutation it records.
pub async fn record_event(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    user_id: Uuid,
    event_type: CollabEventType,
    event_data: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO collaboration_events (id, room_id, user_id, event_type, event_data, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(user_id)
    .bind(event_type.as_str())
    .bind(event_data.to_string())
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Most recent events for a room, newest first, joined with user
/// identity
pub async fn list_events(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    limit: i64,
) -> Result<Vec<EventRow>, sqlx::Error> {
    sqlx::query_as::<_, EventRow>(
        r#"
        SELECT e.id, e.room_id, e.user_id, e.event_type, e.event_data, e.created_at,
               u.username, u.first_name, u.last_name
        FROM collaboration_events e
        JOIN users u ON u.id = e.user_id
        WHERE e.room_id = $1
        ORDER BY e.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(room_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
