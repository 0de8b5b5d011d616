//! hura-api: HTTP API for the Hura tourism assistant
//!
//! REST endpoints for questions, translation, maps and weather, plus the
//! WhatsApp webhook. Built with axum.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{build_app, start_server, AppState};
