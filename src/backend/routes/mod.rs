//! Routes Module
//!
//! Router assembly for the backend API.

pub mod router;
