//! StudyCollab - Main Library
//!
//! Room-membership, presence, and collaborative-whiteboard core for the
//! StudyCollab backend.
//!
//! The crate is organized into two modules:
//!
//! - `shared` - Transport-independent domain types: the typed canvas
//!   schema, room roles, share permissions, and the collaboration event
//!   vocabulary
//! - `backend` - The Axum HTTP server: request handlers, persistence,
//!   authentication middleware, and server wiring

pub mod shared;
pub mod backend;
