/**
 * Collaboration Event Handlers
 *
 * Read side of the audit log: GET /api/rooms/{room_id}/events.
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
use crate::backend::events::db;
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::rooms::handlers::require_active_membership;
use crate::backend::server::state::AppState;

/// Default number of events returned
const DEFAULT_LIMIT: i64 = 20;
/// Hard cap on the events page size
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EventUser {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub user: EventUser,
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
}

/// GET /api/rooms/{room_id}/events
///
/// Recent collaboration events, newest first. Requires an active
/// membership in the room.
pub async fn get_events(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventListResponse>, ApiError> {
    require_active_membership(&state.db, room_id, user.user_id).await?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let rows = db::list_events(&state.db, room_id, limit).await?;

    let events = rows
        .into_iter()
        .map(|row| EventResponse {
            id: row.id,
            room_id: row.room_id,
            event_type: row.event_type,
            event_data: row
                .event_data
                .as_deref()
                .and_then(|d| serde_json::from_str(d).ok())
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: row.created_at,
            user: EventUser {
                id: row.user_id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
            },
        })
        .collect();

    Ok(Json(EventListResponse { events }))
}
