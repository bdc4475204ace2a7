/**
 * Room and Membership Handlers
 *
 * HTTP handlers for the room-membership store and presence tracker:
 *
 * - `POST /api/rooms` - create a room (creator becomes owner)
 * - `GET /api/rooms` - list visible rooms
 * - `GET /api/rooms/my-rooms` - rooms the caller belongs to
 * - `GET /api/rooms/{room_id}` - room detail with members
 * - `POST /api/rooms/{room_id}/join` - join a room
 * - `POST /api/rooms/join-by-code` - join by shareable code
 * - `POST /api/rooms/{room_id}/leave` - leave a room
 * - `POST /api/rooms/{room_id}/kick/{user_id}` - kick a member
 * - `POST /api/rooms/{room_id}/promote/{user_id}` - promote to moderator
 * - `GET /api/rooms/{room_id}/members` - member list with presence
 * - `POST /api/rooms/{room_id}/presence` - update own last_seen
 *
 * # Authorization
 *
 * Every operation authorizes against the caller's active membership
 * before mutating, and membership mutations that touch capacity run
 * inside one transaction holding the room row lock.
 *
 * One deliberate asymmetry is preserved from the product's rules:
 * `promote` authorizes against `study_rooms.owner_id`, while `kick`
 * authorizes against the actor's membership role.
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::events::db as events_db;
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::rooms::capabilities::{can_kick, is_online};
use crate::backend::rooms::db::{self, MembershipRow, RoomRow};
use crate::backend::server::state::AppState;
use crate::shared::types::{CollabEventType, RoomRole};

/// Default room capacity when the creator does not specify one
const DEFAULT_MAX_PARTICIPANTS: i32 = 10;
/// Largest allowed room capacity
const MAX_ROOM_CAPACITY: i32 = 100;
/// Length of a shareable room code
const ROOM_CODE_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub max_participants: Option<i32>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct JoinByCodeRequest {
    pub room_code: String,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub room: RoomRow,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomRow>,
}

#[derive(Debug, Serialize)]
pub struct MyRoomResponse {
    #[serde(flatten)]
    pub room: RoomRow,
    pub my_role: String,
    pub joined_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct MyRoomListResponse {
    pub rooms: Vec<MyRoomResponse>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_online: bool,
}

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub room_id: Uuid,
    pub members: Vec<MemberResponse>,
    pub member_count: usize,
    pub max_participants: i32,
}

#[derive(Debug, Serialize)]
pub struct RoomDetailResponse {
    pub room: RoomRow,
    pub members: Vec<MemberResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Shared authorization helpers
// ---------------------------------------------------------------------------

/// Require an active membership in a room, or fail `Forbidden`
///
/// This is the membership gate used by the whiteboard, document, and
/// event handlers as well.
pub async fn require_active_membership(
    pool: &PgPool,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<MembershipRow, ApiError> {
    db::find_active_membership(pool, room_id, user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You are not a member of this room"))
}

/// Parse the stored role string of a membership row
///
/// An unparseable role is stored-data corruption and surfaces as a
/// storage error, not a client fault.
pub fn membership_role(membership: &MembershipRow) -> Result<RoomRole, ApiError> {
    RoomRole::parse(&membership.role).ok_or_else(|| {
        ApiError::Storage(sqlx::Error::Decode(
            format!("invalid stored role: {}", membership.role).into(),
        ))
    })
}

fn member_response(row: db::MemberRow, now: DateTime<Utc>) -> MemberResponse {
    MemberResponse {
        id: row.user_id,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        avatar_url: row.avatar_url,
        is_online: is_online(row.last_seen, now),
        role: row.role,
        joined_at: row.joined_at,
        last_seen: row.last_seen,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/rooms
///
/// Creates a room and its owner membership in one transaction. Fails
/// `Validation` on an empty name or an out-of-range capacity.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Room name is required"));
    }

    let max_participants = request.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
    if !(1..=MAX_ROOM_CAPACITY).contains(&max_participants) {
        return Err(ApiError::validation(format!(
            "max_participants must be between 1 and {MAX_ROOM_CAPACITY}"
        )));
    }

    let mut tx = state.db.begin().await?;

    let room_id = db::insert_room(
        &mut *tx,
        user.user_id,
        name,
        request.description.as_deref(),
        request.subject.as_deref(),
        max_participants,
        request.is_private.unwrap_or(false),
    )
    .await?;

    db::insert_membership(&mut *tx, room_id, user.user_id, RoomRole::Owner.as_str()).await?;

    tx.commit().await?;

    tracing::info!("Room {} created by {}", room_id, user.user_id);

    let room = db::find_room(&state.db, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    Ok((StatusCode::CREATED, Json(RoomResponse { room })))
}

/// GET /api/rooms
///
/// Public active rooms plus rooms the caller owns or belongs to.
pub async fn list_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<RoomListResponse>, ApiError> {
    let rooms = db::list_visible_rooms(&state.db, user.user_id).await?;
    Ok(Json(RoomListResponse { rooms }))
}

/// GET /api/rooms/my-rooms
///
/// Rooms where the caller holds an active membership, annotated with
/// their role.
pub async fn my_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<MyRoomListResponse>, ApiError> {
    let rows = db::list_member_rooms(&state.db, user.user_id).await?;
    let rooms = rows
        .into_iter()
        .map(|row| MyRoomResponse {
            is_owner: row.room.owner_id == user.user_id,
            room: row.room,
            my_role: row.my_role,
            joined_at: row.my_joined_at,
            last_seen: row.my_last_seen,
        })
        .collect();
    Ok(Json(MyRoomListResponse { rooms }))
}

/// GET /api/rooms/{room_id}
///
/// Room detail with its member list. Private rooms are only visible to
/// the owner and active members.
pub async fn get_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomDetailResponse>, ApiError> {
    let room = db::find_room(&state.db, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    if room.is_private && room.owner_id != user.user_id {
        require_active_membership(&state.db, room_id, user.user_id).await?;
    }

    let now = Utc::now();
    let members = db::list_active_members(&state.db, room_id)
        .await?
        .into_iter()
        .map(|row| member_response(row, now))
        .collect();

    Ok(Json(RoomDetailResponse { room, members }))
}

/// Join a room inside a single transaction holding the room row lock
///
/// The capacity check re-reads the active member count under the lock,
/// so two concurrent joins at capacity-1 admit exactly one.
async fn join_room_locked(
    state: &AppState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let mut tx = state.db.begin().await?;

    let room = db::lock_room(&mut *tx, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let member_count = db::active_member_count(&mut *tx, room_id).await?;
    if !room.is_active || member_count >= i64::from(room.max_participants) {
        return Err(ApiError::conflict("Room is full or inactive"));
    }

    match db::find_membership(&mut *tx, room_id, user_id).await? {
        Some(existing) if existing.is_active => {
            return Err(ApiError::conflict("Already a member of this room"));
        }
        Some(existing) => {
            // Re-joining reactivates the old row rather than duplicating it
            db::reactivate_membership(&mut *tx, existing.id).await?;
        }
        None => {
            db::insert_membership(&mut *tx, room_id, user_id, RoomRole::Member.as_str()).await?;
        }
    }

    tx.commit().await?;
    tracing::info!("User {} joined room {}", user_id, room_id);
    Ok(())
}

/// POST /api/rooms/{room_id}/join
pub async fn join_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomResponse>, ApiError> {
    join_room_locked(&state, room_id, user.user_id).await?;

    let room = db::find_room(&state.db, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;
    Ok(Json(RoomResponse { room }))
}

/// POST /api/rooms/join-by-code
///
/// Resolves the room by its code (case-sensitive exact match), then
/// joins it.
pub async fn join_by_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<JoinByCodeRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let code = request.room_code.trim();
    if code.len() != ROOM_CODE_LEN {
        return Err(ApiError::validation("Invalid room code format"));
    }

    let room = db::find_room_by_code(&state.db, code)
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid room code"))?;

    join_room_locked(&state, room.id, user.user_id).await?;

    let room = db::find_room(&state.db, room.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;
    Ok(Json(RoomResponse { room }))
}

/// POST /api/rooms/{room_id}/leave
///
/// Deactivates the caller's membership. The owner cannot leave; they
/// must transfer the room or delete it.
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let membership = db::find_active_membership(&state.db, room_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not a member of this room"))?;

    if membership_role(&membership)? == RoomRole::Owner {
        return Err(ApiError::validation(
            "Room owner cannot leave. Transfer ownership first.",
        ));
    }

    db::deactivate_membership(&state.db, membership.id).await?;
    tracing::info!("User {} left room {}", user.user_id, room_id);

    Ok(Json(MessageResponse {
        message: "Successfully left room".to_string(),
    }))
}

/// POST /api/rooms/{room_id}/kick/{user_id}
///
/// Deactivates the target's membership and records a `member_kick`
/// event, atomically. Authorization follows the capability matrix: the
/// actor needs an owner or moderator membership, the owner can never be
/// kicked, and moderators cannot kick other moderators.
pub async fn kick_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((room_id, target_user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tx = state.db.begin().await?;

    let actor = db::find_active_membership(&mut *tx, room_id, user.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::forbidden("Only room owners and moderators can kick members")
        })?;
    let actor_role = membership_role(&actor)?;

    let target = db::find_active_membership(&mut *tx, room_id, target_user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not a member of this room"))?;
    let target_role = membership_role(&target)?;

    if !can_kick(actor_role, target_role) {
        return Err(ApiError::forbidden(
            "You do not have permission to kick this member",
        ));
    }

    let kicked_at = Utc::now();
    db::deactivate_membership(&mut *tx, target.id).await?;
    events_db::record_event(
        &mut *tx,
        room_id,
        user.user_id,
        CollabEventType::MemberKick,
        &serde_json::json!({
            "kicked_user_id": target_user_id,
            "kicked_at": kicked_at,
            "reason": "Kicked by moderator/owner",
        }),
    )
    .await?;

    tx.commit().await?;
    tracing::info!(
        "User {} kicked {} from room {}",
        user.user_id,
        target_user_id,
        room_id
    );

    Ok(Json(MessageResponse {
        message: "Member kicked successfully".to_string(),
    }))
}

/// POST /api/rooms/{room_id}/promote/{user_id}
///
/// Escalates a member to moderator and records a `member_promotion`
/// event. Only the room owner may promote, checked against the room's
/// `owner_id` field rather than the actor's membership role.
pub async fn promote_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((room_id, target_user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tx = state.db.begin().await?;

    let room = db::lock_room(&mut *tx, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    if room.owner_id != user.user_id {
        return Err(ApiError::forbidden("Only room owners can promote members"));
    }

    let target = db::find_active_membership(&mut *tx, room_id, target_user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not a member of this room"))?;

    if membership_role(&target)? != RoomRole::Member {
        return Err(ApiError::conflict("User is already a moderator or owner"));
    }

    db::set_membership_role(&mut *tx, target.id, RoomRole::Moderator.as_str()).await?;
    events_db::record_event(
        &mut *tx,
        room_id,
        user.user_id,
        CollabEventType::MemberPromotion,
        &serde_json::json!({
            "promoted_user_id": target_user_id,
            "promoted_at": Utc::now(),
            "new_role": RoomRole::Moderator.as_str(),
        }),
    )
    .await?;

    tx.commit().await?;
    tracing::info!(
        "User {} promoted {} in room {}",
        user.user_id,
        target_user_id,
        room_id
    );

    Ok(Json(MessageResponse {
        message: "Member promoted to moderator successfully".to_string(),
    }))
}

/// GET /api/rooms/{room_id}/members
///
/// Active members with derived presence. Private rooms require an
/// active membership.
pub async fn get_members(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MemberListResponse>, ApiError> {
    let room = db::find_room(&state.db, room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    if room.is_private {
        require_active_membership(&state.db, room_id, user.user_id)
            .await
            .map_err(|_| {
                ApiError::forbidden("Access denied. You are not a member of this private room.")
            })?;
    }

    let now = Utc::now();
    let members: Vec<MemberResponse> = db::list_active_members(&state.db, room_id)
        .await?
        .into_iter()
        .map(|row| member_response(row, now))
        .collect();

    Ok(Json(MemberListResponse {
        room_id,
        member_count: members.len(),
        max_participants: room.max_participants,
        members,
    }))
}

/// POST /api/rooms/{room_id}/presence
///
/// Updates the caller's last_seen. Presence is fire-and-forget: the
/// online flag is always derived at read time.
pub async fn update_presence(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let membership = require_active_membership(&state.db, room_id, user.user_id).await?;
    db::touch_last_seen(&state.db, membership.id).await?;

    Ok(Json(MessageResponse {
        message: "Presence updated successfully".to_string(),
    }))
}
