//! campusdeck library
//!
//! Section-scoped data cache and load orchestrator for a multi-tenant admin
//! console. The binary in `main.rs` is a thin driver over [`app::App`]; the
//! modules are public so integration tests can exercise them directly.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod refresh;
pub mod section;
pub mod state;
pub mod stats;

#[cfg(test)]
mod testing;
