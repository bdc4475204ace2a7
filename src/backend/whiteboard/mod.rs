//! Whiteboard Module
//!
//! The versioned whiteboard session engine and its append-only history
//! log. Each room has at most one active session; every state-replacing
//! write snapshots the prior state into history first, then bumps the
//! version, inside a single transaction holding the session row lock.

pub mod db;
pub mod handlers;
pub mod session;
