//! End-to-end scenario tests against PostgreSQL
//!
//! These exercise the full stack (router, handlers, transactions)
//! against a real database. They are skipped when `DATABASE_URL` is not
//! set, so the default test run stays hermetic. Each test seeds its own
//! users and rooms, so tests can run concurrently against one database.

mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use tower::ServiceExt;
use uuid::Uuid;

use common::{body_json, request, seed_user, test_app, try_connect_db, StubDocuments, StubIdentity};

/// Canvas payload with a single stroke drawn by `user`
fn canvas_with_stroke(user: Uuid, stroke_id: &str) -> serde_json::Value {
    serde_json::json!({
        "strokes": [{
            "id": stroke_id,
            "points": [{"x": 0.0, "y": 0.0}, {"x": 5.0, "y": 5.0}],
            "color": "#000000",
            "width": 2.0,
            "created_by": user,
            "created_at": "2026-01-01T00:00:00Z"
        }],
        "shapes": [],
        "text_elements": [],
        "background_color": "#ffffff",
        "canvas_size": {"width": 800, "height": 600}
    })
}

macro_rules! require_db {
    () => {
        match try_connect_db().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: DATABASE_URL not set");
                return;
            }
        }
    };
}

async fn create_room_with(
    app: &axum::Router,
    token: &str,
    name: &str,
    max_participants: i64,
) -> Uuid {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/rooms",
            Some(token),
            Some(serde_json::json!({"name": name, "max_participants": max_participants})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    Uuid::parse_str(body["room"]["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn capacity_boundary_admits_exactly_max_participants() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice)
        .with_user("bob", bob);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Capacity", 2).await;

    // Owner counts toward capacity; one slot remains
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("bob"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Room is full or inactive");
}

#[tokio::test]
async fn concurrent_joins_admit_only_remaining_capacity() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice)
        .with_user("bob", bob);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Race", 2).await;

    // One remaining slot, two simultaneous joins
    let (a, b) = tokio::join!(
        app.clone().oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        )),
        app.clone().oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("bob"),
            None,
        )),
    );

    let statuses = [a.unwrap().status(), b.unwrap().status()];
    let successes = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let conflicts = statuses
        .iter()
        .filter(|s| **s == StatusCode::CONFLICT)
        .count();
    assert_eq!(successes, 1, "exactly one join must win: {statuses:?}");
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn rejoin_reactivates_membership_instead_of_duplicating() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice);
    let app = test_app(pool.clone(), identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Rejoin", 5).await;

    for expected in [StatusCode::OK, StatusCode::CONFLICT] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/rooms/{room}/join"),
                Some("alice"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/leave"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Exactly one membership row exists for (room, alice)
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM room_memberships WHERE room_id = $1 AND user_id = $2")
            .bind(room)
            .bind(alice)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn owner_cannot_leave_their_room() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let identity = StubIdentity::new().with_user("owner", owner);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Owned", 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/leave"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn kick_respects_the_role_matrix() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let mod_a = seed_user(&pool, "mod_a").await;
    let mod_b = seed_user(&pool, "mod_b").await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("mod_a", mod_a)
        .with_user("mod_b", mod_b);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Kicks", 10).await;

    for token in ["mod_a", "mod_b"] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/rooms/{room}/join"),
                Some(token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    for target in [mod_a, mod_b] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/rooms/{room}/promote/{target}"),
                Some("owner"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Moderator cannot kick a peer moderator
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/kick/{mod_b}"),
            Some("mod_a"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Nobody kicks the owner
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/kick/{owner}"),
            Some("mod_a"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner kicking the same moderator succeeds
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/kick/{mod_b}"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Kicking an already-kicked member is a clean not-found
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/kick/{mod_b}"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn promotion_is_owner_only_and_member_only() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice)
        .with_user("bob", bob);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Promotions", 10).await;

    for token in ["alice", "bob"] {
        app.clone()
            .oneshot(request(
                "POST",
                &format!("/api/rooms/{room}/join"),
                Some(token),
                None,
            ))
            .await
            .unwrap();
    }

    // A non-owner cannot promote
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/promote/{bob}"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Owner promotes a member
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/promote/{bob}"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Promoting a moderator again conflicts
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/promote/{bob}"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn whiteboard_versions_advance_and_history_archives_prior_states() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let identity = StubIdentity::new().with_user("owner", owner);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Canvas", 5).await;

    // Lazy creation at version 1 with an empty canvas
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["whiteboard_session"]["version"], 1);
    assert_eq!(body["whiteboard_session"]["element_count"], 0);
    assert_eq!(body["user_permissions"]["can_clear"], true);

    // First write: prior state was empty, so no history row
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("owner"),
            Some(serde_json::json!({"session_data": canvas_with_stroke(owner, "s1")})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["whiteboard_session"]["version"], 2);

    // Second write: S1 (version 2) is archived
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("owner"),
            Some(serde_json::json!({"session_data": canvas_with_stroke(owner, "s2")})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["whiteboard_session"]["version"], 3);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/rooms/{room}/whiteboard/history"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["current_version"], 3);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["version"], 2);
    assert_eq!(
        history[0]["session_data"]["strokes"][0]["id"],
        "s1",
        "history must hold the pre-mutation state"
    );

    // Clear archives S2 (version 3) and advances to version 4
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/whiteboard/clear"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/rooms/{room}/whiteboard/history"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["current_version"], 4);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    // Newest first
    assert_eq!(history[0]["version"], 3);
    assert_eq!(history[0]["session_data"]["strokes"][0]["id"], "s2");
    assert_eq!(history[1]["version"], 2);
}

#[tokio::test]
async fn concurrent_whiteboard_writes_serialize_on_the_session_lock() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "WriteRace", 5).await;
    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();

    // Two simultaneous writes against the fresh session at version 1.
    // The session row lock serializes them: the second writer re-reads
    // the committed row and applies against the advanced version.
    let (a, b) = tokio::join!(
        app.clone().oneshot(request(
            "PUT",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("owner"),
            Some(serde_json::json!({"session_data": canvas_with_stroke(owner, "wa")})),
        )),
        app.clone().oneshot(request(
            "PUT",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("alice"),
            Some(serde_json::json!({"session_data": canvas_with_stroke(alice, "wb")})),
        )),
    );
    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/rooms/{room}/whiteboard/history"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;

    // Exactly one version per write: 1 -> 2 -> 3, never a skipped or
    // duplicated version. The first write replaced an empty canvas, so
    // only the second archived a snapshot, and it documents version 2.
    assert_eq!(body["current_version"], 3);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["version"], 2);
    assert_eq!(
        history[0]["session_data"]["strokes"].as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn clearing_requires_owner_or_moderator() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "ClearRules", 5).await;
    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/whiteboard/clear"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn document_shares_are_unique_while_active() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let doc = common::seed_document(&pool, alice, false).await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice);
    let documents = StubDocuments::new().with_document(doc, alice, false);
    let app = test_app(pool, identity, documents);

    let room = create_room_with(&app, "owner", "Docs", 5).await;
    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();

    // Owner does not own the document and it is not public
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/documents/share"),
            Some("owner"),
            Some(serde_json::json!({"document_id": doc})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The uploader shares it
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/documents/share"),
            Some("alice"),
            Some(serde_json::json!({"document_id": doc, "permissions": "write"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["room_document"]["can_write"], true);
    assert_eq!(body["room_document"]["can_admin"], false);
    let share_id = body["room_document"]["id"].as_str().unwrap().to_string();

    // Sharing again conflicts while the share is active
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/documents/share"),
            Some("alice"),
            Some(serde_json::json!({"document_id": doc})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Unshare, then sharing again succeeds
    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/rooms/{room}/documents/{share_id}/unshare"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/documents/share"),
            Some("alice"),
            Some(serde_json::json!({"document_id": doc})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn concurrent_shares_leave_exactly_one_active_share() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let doc = common::seed_document(&pool, owner, true).await;

    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice);
    let documents = StubDocuments::new().with_document(doc, owner, true);
    let app = test_app(pool.clone(), identity, documents);

    let room = create_room_with(&app, "owner", "ShareRace", 5).await;
    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();

    // The document is public, so both members may share it. The loser
    // of the race gets a conflict, never a server error.
    let (a, b) = tokio::join!(
        app.clone().oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/documents/share"),
            Some("owner"),
            Some(serde_json::json!({"document_id": doc})),
        )),
        app.clone().oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/documents/share"),
            Some("alice"),
            Some(serde_json::json!({"document_id": doc})),
        )),
    );

    let statuses = [a.unwrap().status(), b.unwrap().status()];
    let created = statuses
        .iter()
        .filter(|s| **s == StatusCode::CREATED)
        .count();
    let conflicts = statuses
        .iter()
        .filter(|s| **s == StatusCode::CONFLICT)
        .count();
    assert_eq!(created, 1, "exactly one share must win: {statuses:?}");
    assert_eq!(conflicts, 1);

    let (active,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM room_documents WHERE room_id = $1 AND document_id = $2 AND is_active",
    )
    .bind(room)
    .bind(doc)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn events_record_room_activity_newest_first() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let alice = seed_user(&pool, "alice").await;
    let identity = StubIdentity::new()
        .with_user("owner", owner)
        .with_user("alice", alice);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Audit", 5).await;
    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/join"),
            Some("alice"),
            None,
        ))
        .await
        .unwrap();

    app.clone()
        .oneshot(request(
            "PUT",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("alice"),
            Some(serde_json::json!({"session_data": canvas_with_stroke(alice, "s1")})),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(request(
            "PUT",
            &format!("/api/rooms/{room}/whiteboard"),
            Some("alice"),
            Some(serde_json::json!({
                "session_data": canvas_with_stroke(alice, "s2"),
                "update_type": "incremental"
            })),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/kick/{alice}"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/rooms/{room}/events"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["event_type"], "member_kick");
    assert_eq!(events[1]["event_type"], "whiteboard_update");
    assert_eq!(events[1]["event_data"]["version"], 3);
    assert_eq!(events[1]["event_data"]["update_type"], "incremental");
    // An update without an explicit type records the default
    assert_eq!(events[2]["event_data"]["version"], 2);
    assert_eq!(events[2]["event_data"]["update_type"], "full_update");
}

#[tokio::test]
async fn presence_touch_marks_member_online() {
    let pool = require_db!();

    let owner = seed_user(&pool, "owner").await;
    let identity = StubIdentity::new().with_user("owner", owner);
    let app = test_app(pool, identity, StubDocuments::new());

    let room = create_room_with(&app, "owner", "Presence", 5).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/rooms/{room}/presence"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/rooms/{room}/members"),
            Some("owner"),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["is_online"], true);
    assert_eq!(members[0]["role"], "owner");
}
