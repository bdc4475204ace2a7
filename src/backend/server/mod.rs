//! Server Module
//!
//! Configuration loading, application state, and server initialization.

pub mod config;
pub mod init;
pub mod state;
