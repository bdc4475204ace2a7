/**
 * Whiteboard Handlers
 *
 * - `GET /api/rooms/{room_id}/whiteboard` - fetch (lazily creating) the
 *   room's session
 * - `PUT /api/rooms/{room_id}/whiteboard` - replace the canvas state
 * - `POST /api/rooms/{room_id}/whiteboard/clear` - reset to the empty
 *   canvas (owner/moderator only)
 * - `GET /api/rooms/{room_id}/whiteboard/history` - recent snapshots
 *
 * # Transaction Shape
 *
 * Both mutations run as one transaction: lock the session row, draft
 * and insert the history snapshot of the *current* state, apply the new
 * state with a version guard, then append the collaboration event.
 * History, state, and event commit together or not at all.
 */
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::events::db as events_db;
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::rooms::capabilities::{can_perform, RoomAction};
use crate::backend::rooms::handlers::{membership_role, require_active_membership};
use crate::backend::server::state::AppState;
use crate::backend::whiteboard::db;
use crate::backend::whiteboard::session::{
    clear_description, next_version, snapshot_before_mutation, update_description, SessionRow,
};
use crate::shared::canvas::CanvasState;
use crate::shared::types::CollabEventType;

/// Default number of history rows returned
const DEFAULT_HISTORY_LIMIT: i64 = 10;
/// Hard cap on the history page size
const MAX_HISTORY_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateWhiteboardRequest {
    /// Full replacement canvas state, validated strictly at this
    /// boundary
    pub session_data: CanvasState,
    pub update_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub session_data: CanvasState,
    pub last_modified_by: Option<Uuid>,
    pub version: i32,
    pub is_active: bool,
    pub element_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionResponse {
    fn from(row: SessionRow) -> Self {
        let session_data = row.canvas();
        Self {
            id: row.id,
            room_id: row.room_id,
            element_count: session_data.element_count(),
            session_data,
            last_modified_by: row.last_modified_by,
            version: row.version,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserPermissions {
    pub can_draw: bool,
    pub can_clear: bool,
    pub can_save: bool,
}

#[derive(Debug, Serialize)]
pub struct GetWhiteboardResponse {
    pub whiteboard_session: SessionResponse,
    pub room_id: Uuid,
    pub user_permissions: UserPermissions,
}

#[derive(Debug, Serialize)]
pub struct UpdateWhiteboardResponse {
    pub message: String,
    pub whiteboard_session: SessionResponse,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub version: i32,
    pub session_data: CanvasState,
    pub modified_by: Uuid,
    pub change_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntryResponse>,
    pub current_version: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Fetch the room's session inside the given transaction, creating it
/// at version 1 if the room has none yet
async fn get_or_create_locked(
    tx: &mut sqlx::PgConnection,
    room_id: Uuid,
) -> Result<SessionRow, ApiError> {
    if let Some(session) = db::lock_session(&mut *tx, room_id).await? {
        return Ok(session);
    }
    db::create_session(&mut *tx, room_id).await?;
    db::lock_session(&mut *tx, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Whiteboard session not found"))
}

/// GET /api/rooms/{room_id}/whiteboard
///
/// Returns the session (creating an empty one on first access) plus the
/// caller's derived permissions.
pub async fn get_whiteboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<GetWhiteboardResponse>, ApiError> {
    let membership = require_active_membership(&state.db, room_id, user.user_id).await?;
    let role = membership_role(&membership)?;

    let session = match db::find_session(&state.db, room_id).await? {
        Some(session) => session,
        None => {
            let mut tx = state.db.begin().await?;
            let session = get_or_create_locked(&mut tx, room_id).await?;
            tx.commit().await?;
            session
        }
    };

    Ok(Json(GetWhiteboardResponse {
        whiteboard_session: session.into(),
        room_id,
        user_permissions: UserPermissions {
            can_draw: can_perform(role, RoomAction::DrawWhiteboard),
            can_clear: can_perform(role, RoomAction::ClearWhiteboard),
            can_save: true,
        },
    }))
}

/// Core of both mutations: snapshot history, apply the new state, log
/// the event - one transaction, in that order.
async fn mutate_whiteboard(
    state: &AppState,
    room_id: Uuid,
    actor: Uuid,
    new_state: &CanvasState,
    update_type: Option<&str>,
    event_type: CollabEventType,
    describe: fn(i32) -> String,
) -> Result<SessionRow, ApiError> {
    let new_state_json = serde_json::to_string(new_state)
        .map_err(|e| ApiError::validation(format!("Invalid canvas state: {e}")))?;

    let mut tx = state.db.begin().await?;

    let session = get_or_create_locked(&mut tx, room_id).await?;

    if let Some(draft) = snapshot_before_mutation(&session, actor, describe(session.version)) {
        db::insert_history(&mut *tx, session.id, &draft).await?;
    }

    let applied =
        db::apply_state(&mut *tx, session.id, session.version, &new_state_json, actor).await?;
    if !applied {
        // Lost the version race to a writer outside this lock; the
        // whole transaction rolls back, so retrying is side-effect free
        return Err(ApiError::conflict(
            "Whiteboard was modified concurrently, please retry",
        ));
    }

    let new_version = next_version(&session);
    let event_data = match event_type {
        CollabEventType::WhiteboardClear => serde_json::json!({
            "cleared_at": Utc::now(),
            "previous_version": session.version,
        }),
        _ => serde_json::json!({
            "version": new_version,
            "element_count": new_state.element_count(),
            "update_type": update_type.unwrap_or("full_update"),
        }),
    };
    events_db::record_event(&mut *tx, room_id, actor, event_type, &event_data).await?;

    tx.commit().await?;

    let updated = db::find_session(&state.db, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Whiteboard session not found"))?;

    tracing::debug!(
        "Whiteboard in room {} advanced to version {}",
        room_id,
        updated.version
    );
    Ok(updated)
}

/// PUT /api/rooms/{room_id}/whiteboard
///
/// Replaces the canvas. Any active member may draw.
pub async fn update_whiteboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
    Json(request): Json<UpdateWhiteboardRequest>,
) -> Result<Json<UpdateWhiteboardResponse>, ApiError> {
    require_active_membership(&state.db, room_id, user.user_id).await?;

    let session = mutate_whiteboard(
        &state,
        room_id,
        user.user_id,
        &request.session_data,
        request.update_type.as_deref(),
        CollabEventType::WhiteboardUpdate,
        update_description,
    )
    .await?;

    Ok(Json(UpdateWhiteboardResponse {
        message: "Whiteboard updated successfully".to_string(),
        whiteboard_session: session.into(),
    }))
}

/// POST /api/rooms/{room_id}/whiteboard/clear
///
/// Resets the canvas to empty. Owner or moderator only.
pub async fn clear_whiteboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let membership = require_active_membership(&state.db, room_id, user.user_id).await?;
    let role = membership_role(&membership)?;
    if !can_perform(role, RoomAction::ClearWhiteboard) {
        return Err(ApiError::forbidden(
            "Only room owners and moderators can clear the whiteboard",
        ));
    }

    mutate_whiteboard(
        &state,
        room_id,
        user.user_id,
        &CanvasState::empty(),
        None,
        CollabEventType::WhiteboardClear,
        clear_description,
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "Whiteboard cleared successfully".to_string(),
    }))
}

/// GET /api/rooms/{room_id}/whiteboard/history
///
/// Up to `limit` most recent snapshots, newest first, plus the live
/// version. A room with no session yet has empty history.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    require_active_membership(&state.db, room_id, user.user_id).await?;

    let session = match db::find_session(&state.db, room_id).await? {
        Some(session) => session,
        None => {
            return Ok(Json(HistoryResponse {
                history: Vec::new(),
                current_version: None,
            }))
        }
    };

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let history = db::list_history(&state.db, session.id, limit)
        .await?
        .into_iter()
        .map(|row| HistoryEntryResponse {
            id: row.id,
            session_id: row.session_id,
            version: row.version,
            session_data: row
                .state_json
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_else(CanvasState::empty),
            modified_by: row.modified_by,
            change_description: row.change_description,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(HistoryResponse {
        history,
        current_version: Some(session.version),
    }))
}
