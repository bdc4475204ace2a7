//! Documents Module
//!
//! Room document share registry: which documents are attached to a room
//! and with what permission tier. Ownership checks go through the
//! injected `DocumentDirectory` collaborator.

pub mod db;
pub mod handlers;
