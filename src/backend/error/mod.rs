//! Error Module
//!
//! Defines the backend error taxonomy and its conversion to HTTP
//! responses.

pub mod conversion;
pub mod types;

pub use types::ApiError;
