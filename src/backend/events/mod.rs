//! Events Module
//!
//! Append-only collaboration event log. `record_event` is
//! executor-generic so every caller appends inside its own transaction,
//! keeping the audit trail atomic with the mutation it records.

pub mod db;
pub mod handlers;
