//! Backend Module
//!
//! This module contains all server-side code for the StudyCollab
//! application: an Axum HTTP server exposing the room-membership,
//! presence, whiteboard, document-share, and event-log operations over a
//! PostgreSQL store.
//!
//! # Architecture
//!
//! - `server` - Configuration, application state, and initialization
//! - `error` - The `ApiError` taxonomy and HTTP conversion
//! - `identity` - External collaborator contracts (identity resolution,
//!   document directory) and their Postgres-backed implementations
//! - `middleware` - Bearer-token authentication middleware
//! - `rooms` - Room + membership store, capability matrix, presence
//! - `whiteboard` - Versioned whiteboard session engine and history log
//! - `documents` - Room document share registry
//! - `events` - Append-only collaboration event log
//! - `routes` - Router assembly

pub mod documents;
pub mod error;
pub mod events;
pub mod identity;
pub mod middleware;
pub mod rooms;
pub mod routes;
pub mod server;
pub mod whiteboard;
