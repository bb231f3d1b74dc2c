//! Core pollr library (backend client, session, screens, config).

pub mod backend;
pub mod config;
pub mod logging;
pub mod model;
pub mod screens;
pub mod session;
pub mod tally;
pub mod validation;
