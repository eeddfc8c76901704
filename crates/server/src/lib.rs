//! HTTP API service for Scopeline.
//!
//! This crate provides:
//! - Axum router over the `plan` library
//! - Uniform JSON response envelope with error status mapping
//! - Handlers for projects, tasks, chat, estimations and admin repair
//! - Env-based configuration and two binaries (`plan-server`, `plan-admin`)

pub mod config;
pub mod envelope;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use envelope::{ApiError, ApiResponse};
pub use routes::build_router;
pub use state::AppState;
