/**
 * Router Configuration
 *
 * Assembles the API route table. Every route lives under `/api` and
 * sits behind the bearer-token authentication middleware; handlers then
 * authorize against room membership themselves.
 *
 * # Route Details
 *
 * ## Rooms
 *
 * - `GET  /api/rooms` - visible rooms
 * - `POST /api/rooms` - create room
 * - `GET  /api/rooms/my-rooms` - caller's rooms
 * - `POST /api/rooms/join-by-code` - join by shareable code
 * - `GET  /api/rooms/{room_id}` - room detail
 * - `POST /api/rooms/{room_id}/join` - join
 * - `POST /api/rooms/{room_id}/leave` - leave
 * - `POST /api/rooms/{room_id}/kick/{user_id}` - kick member
 * - `POST /api/rooms/{room_id}/promote/{user_id}` - promote member
 * - `GET  /api/rooms/{room_id}/members` - members with presence
 * - `POST /api/rooms/{room_id}/presence` - presence heartbeat
 *
 * ## Whiteboard
 *
 * - `GET  /api/rooms/{room_id}/whiteboard` - session (lazy create)
 * - `PUT  /api/rooms/{room_id}/whiteboard` - replace state
 * - `POST /api/rooms/{room_id}/whiteboard/clear` - clear
 * - `GET  /api/rooms/{room_id}/whiteboard/history` - snapshots
 *
 * ## Documents & Events
 *
 * - `GET    /api/rooms/{room_id}/documents` - active shares
 * - `POST   /api/rooms/{room_id}/documents/share` - share
 * - `DELETE /api/rooms/{room_id}/documents/{share_id}/unshare` - unshare
 * - `GET    /api/rooms/{room_id}/events` - audit log
 */
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::documents::handlers as documents;
use crate::backend::events::handlers as events;
use crate::backend::middleware::auth::auth_middleware;
use crate::backend::rooms::handlers as rooms;
use crate::backend::server::state::AppState;
use crate::backend::whiteboard::handlers as whiteboard;

/// Create the Axum router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/my-rooms", get(rooms::my_rooms))
        .route("/rooms/join-by-code", post(rooms::join_by_code))
        .route("/rooms/{room_id}", get(rooms::get_room))
        .route("/rooms/{room_id}/join", post(rooms::join_room))
        .route("/rooms/{room_id}/leave", post(rooms::leave_room))
        .route("/rooms/{room_id}/kick/{user_id}", post(rooms::kick_member))
        .route(
            "/rooms/{room_id}/promote/{user_id}",
            post(rooms::promote_member),
        )
        .route("/rooms/{room_id}/members", get(rooms::get_members))
        .route("/rooms/{room_id}/presence", post(rooms::update_presence))
        .route(
            "/rooms/{room_id}/whiteboard",
            get(whiteboard::get_whiteboard).put(whiteboard::update_whiteboard),
        )
        .route(
            "/rooms/{room_id}/whiteboard/clear",
            post(whiteboard::clear_whiteboard),
        )
        .route(
            "/rooms/{room_id}/whiteboard/history",
            get(whiteboard::get_history),
        )
        .route("/rooms/{room_id}/documents", get(documents::list_documents))
        .route(
            "/rooms/{room_id}/documents/share",
            post(documents::share_document),
        )
        .route(
            "/rooms/{room_id}/documents/{share_id}/unshare",
            delete(documents::unshare_document),
        )
        .route("/rooms/{room_id}/events", get(events::get_events))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
