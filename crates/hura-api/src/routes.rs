//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{ask, health, maps, menu, root, translate_en2rw, translate_rw2en, weather};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/menu", get(menu))
        .route("/health", get(health))
        // Services
        .route("/ask", post(ask))
        .route("/translate/en2rw", post(translate_en2rw))
        .route("/translate/rw2en", post(translate_rw2en))
        .route("/maps", post(maps))
        .route("/weather", post(weather))
}
