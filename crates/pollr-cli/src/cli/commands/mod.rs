//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod interactive;
pub mod polls;
pub mod prompt;
pub mod render;
