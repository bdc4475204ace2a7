//! Middleware Module
//!
//! Request middleware for the backend, currently bearer-token
//! authentication.

pub mod auth;

pub use auth::AuthenticatedUser;
