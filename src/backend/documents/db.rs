/**
 * Database Operations for Room Document Shares
 *
 * At most one active share exists per (room, document) pair, enforced
 * by a partial unique index. Unsharing deactivates the row; share rows
 * are never deleted.
 */
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

/// A share row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShareRow {
    pub id: Uuid,
    pub room_id: Uuid,
    pub document_id: Uuid,
    pub shared_by: Uuid,
    pub permissions: String,
    pub is_active: bool,
    pub shared_at: DateTime<Utc>,
}

/// A share joined with document metadata and sharer identity
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SharedDocumentRow {
    pub id: Uuid,
    pub room_id: Uuid,
    pub document_id: Uuid,
    pub permissions: String,
    pub shared_at: DateTime<Utc>,
    pub original_filename: String,
    pub is_public: bool,
    pub sharer_id: Uuid,
    pub sharer_username: String,
    pub sharer_first_name: String,
    pub sharer_last_name: String,
}

/// Find the active share for a (room, document) pair
pub async fn find_active_share(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    document_id: Uuid,
) -> Result<Option<ShareRow>, sqlx::Error> {
    sqlx::query_as::<_, ShareRow>(
        r#"
        SELECT id, room_id, document_id, shared_by, permissions, is_active, shared_at
        FROM room_documents
        WHERE room_id = $1 AND document_id = $2 AND is_active
        "#,
    )
    .bind(room_id)
    .bind(document_id)
    .fetch_optional(executor)
    .await
}

/// Find an active share by its id within a room
pub async fn find_share(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    share_id: Uuid,
) -> Result<Option<ShareRow>, sqlx::Error> {
    sqlx::query_as::<_, ShareRow>(
        r#"
        SELECT id, room_id, document_id, shared_by, permissions, is_active, shared_at
        FROM room_documents
        WHERE id = $1 AND room_id = $2 AND is_active
        "#,
    )
    .bind(share_id)
    .bind(room_id)
    .fetch_optional(executor)
    .await
}

/// Insert a share row
pub async fn insert_share(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    document_id: Uuid,
    shared_by: Uuid,
    permissions: &str,
) -> Result<ShareRow, sqlx::Error> {
    sqlx::query_as::<_, ShareRow>(
        r#"
        INSERT INTO room_documents (id, room_id, document_id, shared_by, permissions, is_active, shared_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        RETURNING id, room_id, document_id, shared_by, permissions, is_active, shared_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(room_id)
    .bind(document_id)
    .bind(shared_by)
    .bind(permissions)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

/// Deactivate a share; the row is preserved for audit history
pub async fn deactivate_share(
    executor: impl PgExecutor<'_>,
    share_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE room_documents SET is_active = FALSE WHERE id = $1")
        .bind(share_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Active shares in a room with document and sharer detail, most recent
/// first
pub async fn list_shared_documents(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<Vec<SharedDocumentRow>, sqlx::Error> {
    sqlx::query_as::<_, SharedDocumentRow>(
        r#"
        SELECT s.id, s.room_id, s.document_id, s.permissions, s.shared_at,
               d.original_filename, d.is_public,
               u.id AS sharer_id, u.username AS sharer_username,
               u.first_name AS sharer_first_name, u.last_name AS sharer_last_name
        FROM room_documents s
        JOIN documents d ON d.id = s.document_id
        JOIN users u ON u.id = s.shared_by
        WHERE s.room_id = $1 AND s.is_active
        ORDER BY s.shared_at DESC
        "#,
    )
    .bind(room_id)
    .fetch_all(executor)
    .await
}
