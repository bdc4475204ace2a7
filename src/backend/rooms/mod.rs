//! Rooms Module
//!
//! Room and membership store, the role capability matrix, and presence
//! derivation. Handlers follow the authorize-then-mutate-then-log
//! pattern: the membership check gates every operation, mutations run in
//! one transaction, and audit events are recorded inside that same
//! transaction.

pub mod capabilities;
pub mod db;
pub mod handlers;
