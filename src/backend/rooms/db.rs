/**
 * Database Operations for Rooms and Memberships
 *
 * Persistence layer for the room-membership store. Queries are written
 * against PostgreSQL with sqlx; functions take `impl PgExecutor` so they
 * compose into the callers' transactions.
 *
 * # Concurrency
 *
 * Capacity-checked joins must re-check the active member count under a
 * row lock on the room (`lock_room`), so two simultaneous joins at
 * capacity-1 cannot both pass the check.
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

/// A study room, annotated with its active member count
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoomRow {
    pub id: Uuid,
    pub room_code: String,
    pub name: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub owner_id: Uuid,
    pub max_participants: i32,
    pub is_private: bool,
    pub is_active: bool,
    pub meeting_url: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A membership row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// An active member joined with user identity
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRow {
    pub user_id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// A room joined with the caller's own membership
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRoomRow {
    #[sqlx(flatten)]
    pub room: RoomRow,
    pub my_role: String,
    pub my_joined_at: DateTime<Utc>,
    pub my_last_seen: Option<DateTime<Utc>>,
}

/// Room fields needed while holding the room row lock
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomLockRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub max_participants: i32,
    pub is_active: bool,
}

const ROOM_COLUMNS: &str = r#"
    r.id, r.room_code, r.name, r.description, r.subject, r.owner_id,
    r.max_participants, r.is_private, r.is_active, r.meeting_url,
    (SELECT COUNT(*) FROM room_memberships m
       WHERE m.room_id = r.id AND m.is_active) AS member_count,
    r.created_at
"#;

/// Generate a human-shareable room code: 8 uppercase hex characters
pub fn generate_room_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Insert a new room
pub async fn insert_room(
    executor: impl PgExecutor<'_>,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
    subject: Option<&str>,
    max_participants: i32,
    is_private: bool,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let room_code = generate_room_code();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO study_rooms
            (id, room_code, name, description, subject, owner_id,
             max_participants, is_private, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $9)
        "#,
    )
    .bind(id)
    .bind(&room_code)
    .bind(name)
    .bind(description)
    .bind(subject)
    .bind(owner_id)
    .bind(max_participants)
    .bind(is_private)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(id)
}

/// Fetch a room by id
pub async fn find_room(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<Option<RoomRow>, sqlx::Error> {
    let sql = format!("SELECT {ROOM_COLUMNS} FROM study_rooms r WHERE r.id = $1");
    sqlx::query_as::<_, RoomRow>(&sql)
        .bind(room_id)
        .fetch_optional(executor)
        .await
}

/// Resolve an active room by its unique code (case-sensitive exact match)
pub async fn find_room_by_code(
    executor: impl PgExecutor<'_>,
    room_code: &str,
) -> Result<Option<RoomRow>, sqlx::Error> {
    let sql =
        format!("SELECT {ROOM_COLUMNS} FROM study_rooms r WHERE r.room_code = $1 AND r.is_active");
    sqlx::query_as::<_, RoomRow>(&sql)
        .bind(room_code)
        .fetch_optional(executor)
        .await
}

/// Lock a room row for the duration of a capacity-sensitive mutation
pub async fn lock_room(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<Option<RoomLockRow>, sqlx::Error> {
    sqlx::query_as::<_, RoomLockRow>(
        r#"
        SELECT id, owner_id, max_participants, is_active
        FROM study_rooms
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(room_id)
    .fetch_optional(executor)
    .await
}

/// Count active memberships in a room
pub async fn active_member_count(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM room_memberships WHERE room_id = $1 AND is_active",
    )
    .bind(room_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Rooms visible to a user: public active rooms plus rooms they own or
/// hold an active membership in
pub async fn list_visible_rooms(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Vec<RoomRow>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {ROOM_COLUMNS}
        FROM study_rooms r
        WHERE r.is_active
          AND (NOT r.is_private
               OR r.owner_id = $1
               OR EXISTS (SELECT 1 FROM room_memberships m
                          WHERE m.room_id = r.id AND m.user_id = $1 AND m.is_active))
        ORDER BY r.created_at DESC
        "#
    );
    sqlx::query_as::<_, RoomRow>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await
}

/// Rooms where the user holds an active membership, most recently seen
/// first
pub async fn list_member_rooms(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Vec<MemberRoomRow>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {ROOM_COLUMNS},
               m.role AS my_role,
               m.joined_at AS my_joined_at,
               m.last_seen AS my_last_seen
        FROM study_rooms r
        JOIN room_memberships m ON m.room_id = r.id
        WHERE m.user_id = $1 AND m.is_active AND r.is_active
        ORDER BY m.last_seen DESC NULLS LAST
        "#
    );
    sqlx::query_as::<_, MemberRoomRow>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await
}

/// Find a user's membership in a room, active or not
pub async fn find_membership(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MembershipRow>, sqlx::Error> {
    sqlx::query_as::<_, MembershipRow>(
        r#"
        SELECT id, room_id, user_id, role, is_active, joined_at, last_seen
        FROM room_memberships
        WHERE room_id = $1 AND user_id = $2
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Find a user's active membership in a room
pub async fn find_active_membership(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MembershipRow>, sqlx::Error> {
    sqlx::query_as::<_, MembershipRow>(
        r#"
        SELECT id, room_id, user_id, role, is_active, joined_at, last_seen
        FROM room_memberships
        WHERE room_id = $1 AND user_id = $2 AND is_active
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Insert a fresh membership
pub async fn insert_membership(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
    user_id: Uuid,
    role: &str,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO room_memberships (id, room_id, user_id, role, is_active, joined_at, last_seen)
        VALUES ($1, $2, $3, $4, TRUE, $5, $5)
        "#,
    )
    .bind(id)
    .bind(room_id)
    .bind(user_id)
    .bind(role)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(id)
}

/// Reactivate an inactive membership, resetting joined_at
pub async fn reactivate_membership(
    executor: impl PgExecutor<'_>,
    membership_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE room_memberships
        SET is_active = TRUE, joined_at = $2, last_seen = $2
        WHERE id = $1
        "#,
    )
    .bind(membership_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Deactivate a membership (leave or kick); rows are never deleted
pub async fn deactivate_membership(
    executor: impl PgExecutor<'_>,
    membership_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE room_memberships
        SET is_active = FALSE, last_seen = $2
        WHERE id = $1
        "#,
    )
    .bind(membership_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Change a membership's role
pub async fn set_membership_role(
    executor: impl PgExecutor<'_>,
    membership_id: Uuid,
    role: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE room_memberships SET role = $2 WHERE id = $1")
        .bind(membership_id)
        .bind(role)
        .execute(executor)
        .await?;
    Ok(())
}

/// Update a membership's last_seen to now
pub async fn touch_last_seen(
    executor: impl PgExecutor<'_>,
    membership_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE room_memberships SET last_seen = $2 WHERE id = $1")
        .bind(membership_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
    Ok(())
}

/// Active members of a room joined with user identity, in join order
pub async fn list_active_members(
    executor: impl PgExecutor<'_>,
    room_id: Uuid,
) -> Result<Vec<MemberRow>, sqlx::Error> {
    sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT u.id AS user_id, u.username, u.first_name, u.last_name, u.avatar_url,
               m.role, m.joined_at, m.last_seen
        FROM room_memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.room_id = $1 AND m.is_active
        ORDER BY m.joined_at
        "#,
    )
    .bind(room_id)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_shape() {
        let code = generate_room_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_room_codes_are_distinct() {
        let a = generate_room_code();
        let b = generate_room_code();
        assert_ne!(a, b);
    }
}
