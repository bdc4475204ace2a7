//! Shared Module
//!
//! This module contains domain types that are independent of transport
//! and persistence: the typed whiteboard canvas schema, room roles, share
//! permission tiers, and the collaboration event vocabulary. Handlers and
//! database code both build on these types.

pub mod canvas;
pub mod types;

pub use canvas::{CanvasSize, CanvasState, Point, Shape, ShapeKind, Stroke, TextElement};
pub use types::{CollabEventType, RoomRole, SharePermission};
