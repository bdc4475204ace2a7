/**
 * Room Document Share Handlers
 *
 * - `GET /api/rooms/{room_id}/documents` - active shares with derived
 *   permission flags
 * - `POST /api/rooms/{room_id}/documents/share` - share a document into
 *   the room
 * - `DELETE /api/rooms/{room_id}/documents/{share_id}/unshare` - revoke
 *   a share
 *
 * Sharing requires the caller to own the document or the document to be
 * public, resolved through the `DocumentDirectory` collaborator.
 * Unsharing is allowed for the original sharer and for room
 * owners/moderators.
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::documents::db;
use crate::backend::error::ApiError;
use crate::backend::events::db as events_db;
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::rooms::capabilities::{can_perform, RoomAction};
use crate::backend::rooms::db as rooms_db;
use crate::backend::rooms::handlers::{membership_role, require_active_membership};
use crate::backend::server::state::AppState;
use crate::shared::types::{CollabEventType, SharePermission};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ShareDocumentRequest {
    pub document_id: Uuid,
    pub permissions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub document_id: Uuid,
    pub shared_by: Uuid,
    pub permissions: String,
    pub is_active: bool,
    pub shared_at: DateTime<Utc>,
    pub can_read: bool,
    pub can_write: bool,
    pub can_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct ShareDocumentResponse {
    pub message: String,
    pub room_document: ShareResponse,
}

#[derive(Debug, Serialize)]
pub struct SharerResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct SharedDocumentResponse {
    pub room_document_id: Uuid,
    pub document_id: Uuid,
    pub original_filename: String,
    pub is_public: bool,
    pub shared_by: SharerResponse,
    pub permissions: String,
    pub shared_at: DateTime<Utc>,
    pub can_read: bool,
    pub can_write: bool,
    pub can_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct SharedDocumentListResponse {
    pub documents: Vec<SharedDocumentResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Postgres unique-constraint violation (SQLSTATE 23505)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map_or(false, |code| code == "23505")
}

/// GET /api/rooms/{room_id}/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<SharedDocumentListResponse>, ApiError> {
    require_active_membership(&state.db, room_id, user.user_id).await?;

    let documents = db::list_shared_documents(&state.db, room_id)
        .await?
        .into_iter()
        .map(|row| {
            let tier = SharePermission::parse(&row.permissions);
            SharedDocumentResponse {
                room_document_id: row.id,
                document_id: row.document_id,
                original_filename: row.original_filename,
                is_public: row.is_public,
                shared_by: SharerResponse {
                    id: row.sharer_id,
                    username: row.sharer_username,
                    first_name: row.sharer_first_name,
                    last_name: row.sharer_last_name,
                },
                permissions: row.permissions,
                shared_at: row.shared_at,
                can_read: tier.map(|t| t.can_read()).unwrap_or(false),
                can_write: tier.map(|t| t.can_write()).unwrap_or(false),
                can_admin: tier.map(|t| t.can_admin()).unwrap_or(false),
            }
        })
        .collect();

    Ok(Json(SharedDocumentListResponse { documents }))
}

/// POST /api/rooms/{room_id}/documents/share
///
/// Inserts the share and its `document_share` event in one transaction.
/// Fails `Conflict` if the document is already actively shared in the
/// room.
pub async fn share_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
    Json(request): Json<ShareDocumentRequest>,
) -> Result<(StatusCode, Json<ShareDocumentResponse>), ApiError> {
    let permission = match request.permissions.as_deref() {
        None => SharePermission::Read,
        Some(raw) => SharePermission::parse(raw)
            .ok_or_else(|| ApiError::validation("Invalid permissions"))?,
    };

    require_active_membership(&state.db, room_id, user.user_id).await?;

    // Ownership check through the document collaborator
    let document = state.documents.lookup(request.document_id).await?;
    if document.owner_id != user.user_id && !document.is_public {
        return Err(ApiError::forbidden(
            "You do not have permission to share this document",
        ));
    }

    let mut tx = state.db.begin().await?;

    if db::find_active_share(&mut *tx, room_id, request.document_id)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "Document is already shared in this room",
        ));
    }

    // A concurrent sharer can slip past the check above; the partial
    // unique index catches the loser, which is the same conflict.
    let share = match db::insert_share(
        &mut *tx,
        room_id,
        request.document_id,
        user.user_id,
        permission.as_str(),
    )
    .await
    {
        Ok(share) => share,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict(
                "Document is already shared in this room",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    events_db::record_event(
        &mut *tx,
        room_id,
        user.user_id,
        CollabEventType::DocumentShare,
        &serde_json::json!({
            "document_id": request.document_id,
            "document_name": document.filename,
            "permissions": permission.as_str(),
            "shared_at": share.shared_at,
        }),
    )
    .await?;

    tx.commit().await?;
    tracing::info!(
        "User {} shared document {} in room {}",
        user.user_id,
        request.document_id,
        room_id
    );

    let response = ShareResponse {
        id: share.id,
        room_id: share.room_id,
        document_id: share.document_id,
        shared_by: share.shared_by,
        permissions: share.permissions.clone(),
        is_active: share.is_active,
        shared_at: share.shared_at,
        can_read: permission.can_read(),
        can_write: permission.can_write(),
        can_admin: permission.can_admin(),
    };

    Ok((
        StatusCode::CREATED,
        Json(ShareDocumentResponse {
            message: "Document shared successfully".to_string(),
            room_document: response,
        }),
    ))
}

/// DELETE /api/rooms/{room_id}/documents/{share_id}/unshare
///
/// Deactivates the share and records a `document_unshare` event.
/// Allowed for the original sharer or an owner/moderator.
pub async fn unshare_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((room_id, share_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tx = state.db.begin().await?;

    let share = db::find_share(&mut *tx, room_id, share_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Shared document not found"))?;

    let membership = rooms_db::find_active_membership(&mut *tx, room_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You are not a member of this room"))?;
    let role = membership_role(&membership)?;

    let can_unshare =
        share.shared_by == user.user_id || can_perform(role, RoomAction::UnshareAnyDocument);
    if !can_unshare {
        return Err(ApiError::forbidden(
            "You do not have permission to unshare this document",
        ));
    }

    db::deactivate_share(&mut *tx, share.id).await?;
    events_db::record_event(
        &mut *tx,
        room_id,
        user.user_id,
        CollabEventType::DocumentUnshare,
        &serde_json::json!({
            "document_id": share.document_id,
            "room_document_id": share.id,
            "unshared_at": Utc::now(),
        }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(MessageResponse {
        message: "Document unshared successfully".to_string(),
    }))
}
