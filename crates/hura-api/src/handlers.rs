//! HTTP API handlers

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use hura_core::router::{SERVICE_MAPS, SERVICE_WEATHER};
use hura_core::storage::dir_size_mb;
use hura_core::{Direction, Error};

use crate::error::{ApiError, Result};
use crate::models::{
    processing_time, FeatureStatus, HealthDetails, HealthResponse, MenuOption, MenuResponse, Question,
    QueryResponse, RootResponse, ServiceQuery, TranslationRequest, TranslationResponse,
};
use crate::server::AppState;

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

fn feature_status(state: &AppState) -> FeatureStatus {
    let backends = state.backends();
    FeatureStatus {
        rag: backends.rag_available(),
        translation: backends.translation_available(),
        maps: backends.maps_available() && state.config.maps_enabled(),
        weather: backends.weather_available() && state.config.weather_enabled(),
        whatsapp: state.config.twilio_configured(),
    }
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to Hura Tourism Chatbot! Choose your service from the menu below.".to_string(),
        endpoints: json!({
            "menu": "GET /menu",
            "ask_question": "POST /ask",
            "translate_en2rw": "POST /translate/en2rw",
            "translate_rw2en": "POST /translate/rw2en",
            "location_service": "POST /maps",
            "weather_service": "POST /weather",
            "whatsapp_webhook": "POST /whatsapp/webhook",
            "health_check": "GET /health"
        }),
        documentation: "/docs".to_string(),
    })
}

fn option(id: &str, title: &str, description: &str, endpoint: &str, example: serde_json::Value) -> MenuOption {
    MenuOption {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        endpoint: endpoint.to_string(),
        method: "POST".to_string(),
        example,
    }
}

/// `GET /menu`
pub async fn menu(State(state): State<AppState>) -> Json<MenuResponse> {
    Json(MenuResponse {
        title: "🌍 Hura Tourism Chatbot - Main Menu".to_string(),
        description: "Choose a service to get started:".to_string(),
        options: vec![
            option(
                "1",
                "🤖 Ask a Question",
                "Get information about Kigali, tourism, culture, and more",
                "/ask",
                json!({"text": "Tell me about Kigali Genocide Memorial"}),
            ),
            option(
                "2a",
                "🔄 Translate: English → Kinyarwanda",
                "Translate English text to Kinyarwanda",
                "/translate/en2rw",
                json!({"text": "Hello, how are you?"}),
            ),
            option(
                "2b",
                "🔄 Translate: Kinyarwanda → English",
                "Translate Kinyarwanda text to English",
                "/translate/rw2en",
                json!({"text": "Muraho, amakuru?"}),
            ),
            option(
                "3",
                "🗺️ Location Service",
                "Find places, get directions, and discover nearby locations",
                "/maps",
                json!({"query": "Where is Kimironko?"}),
            ),
            option(
                "4",
                "🌤️ Weather Updates",
                "Get current weather and forecasts for Kigali and Rwanda",
                "/weather",
                json!({"query": "What's the weather today?"}),
            ),
        ],
        features_status: feature_status(&state),
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backends = state.backends();
    let persistent = state.config.storage.persistent_path();

    Json(HealthResponse {
        status: "healthy".to_string(),
        details: HealthDetails {
            rag_service: backends.rag_available(),
            translation_service: backends.translation_available(),
            maps_service: backends.maps_available(),
            weather_service: backends.weather_available(),
            whatsapp_service: state.whatsapp.is_some(),
            active_whatsapp_sessions: state.whatsapp.as_ref().map_or(0, |w| w.active_sessions()),
            persistent_storage: persistent.display().to_string(),
            storage_usage: dir_size_mb(&persistent),
            features: feature_status(&state),
        },
    })
}

/// `POST /ask`: routed to maps, weather, translation or RAG
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Question>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let text = body(payload)?.validated()?;
    if !state.backends().rag_available() {
        return Err(ApiError::ServiceUnavailable(
            "RAG service initializing, try again in 30 seconds".to_string(),
        ));
    }

    let start = Instant::now();
    match state.router.route(&text).await {
        Ok(routed) => Ok(Json(QueryResponse {
            response: routed.response,
            processing_time: processing_time(start.elapsed().as_secs_f64()),
            service_used: Some(routed.service_used),
        })),
        Err(Error::ServiceUnavailable(msg)) => Err(ApiError::ServiceUnavailable(msg)),
        Err(e) => {
            error!("Query processing error: {}", e);
            Err(ApiError::Processing("Error processing your question".to_string()))
        }
    }
}

async fn translate(state: &AppState, text: String, direction: Direction) -> Result<Json<TranslationResponse>> {
    let Some(translation) = &state.backends().translation else {
        return Err(ApiError::ServiceUnavailable(
            "Translation service not loaded yet.".to_string(),
        ));
    };

    debug!("Translating ({}): {}", direction, text);
    match translation.translate(&text, direction).await {
        Ok(result) => Ok(Json(TranslationResponse {
            translation: result.text,
            source_language: direction.source_language().to_string(),
            target_language: direction.target_language().to_string(),
            service_used: result.service,
        })),
        Err(e) => {
            error!("Translation error ({}): {}", direction, e);
            Err(ApiError::Processing("Translation failed.".to_string()))
        }
    }
}

/// `POST /translate/en2rw`
pub async fn translate_en2rw(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>> {
    let text = body(payload)?.validated()?;
    translate(&state, text, Direction::EnToRw).await
}

/// `POST /translate/rw2en`
pub async fn translate_rw2en(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>> {
    let text = body(payload)?.validated()?;
    translate(&state, text, Direction::RwToEn).await
}

/// `POST /maps`
pub async fn maps(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ServiceQuery>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let query = body(payload)?.validated()?;
    let Some(maps) = &state.backends().maps else {
        return Err(ApiError::ServiceUnavailable("Maps service not available.".to_string()));
    };

    let start = Instant::now();
    let response = maps.process_query(&query).await.map_err(|e| {
        error!("Maps query processing error: {}", e);
        ApiError::Processing("Error processing location request".to_string())
    })?;

    Ok(Json(QueryResponse {
        response,
        processing_time: processing_time(start.elapsed().as_secs_f64()),
        service_used: Some(SERVICE_MAPS.to_string()),
    }))
}

/// `POST /weather`
pub async fn weather(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ServiceQuery>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let query = body(payload)?.validated()?;
    let Some(weather) = &state.backends().weather else {
        return Err(ApiError::ServiceUnavailable("Weather service not available.".to_string()));
    };

    let start = Instant::now();
    let response = weather.process_query(&query).await.map_err(|e| {
        error!("Weather query processing error: {}", e);
        ApiError::Processing("Error processing weather request".to_string())
    })?;

    Ok(Json(QueryResponse {
        response,
        processing_time: processing_time(start.elapsed().as_secs_f64()),
        service_used: Some(SERVICE_WEATHER.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::rate_limit::RateLimiter;
    use crate::server::build_app;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use hura_core::translation::TranslationService;
    use hura_core::{Answerer, Backends, Config, LocationLookup, Translator, WeatherLookup};
    use hura_whatsapp::WebhookState;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Fake {
        fail: bool,
    }

    #[async_trait]
    impl Answerer for Fake {
        async fn answer(&self, question: &str) -> hura_core::Result<String> {
            if self.fail {
                return Err(Error::LlmApi("timeout".to_string()));
            }
            Ok(format!("answer to {}", question))
        }
    }

    #[async_trait]
    impl Translator for Fake {
        fn name(&self) -> &str {
            "Fake Translate"
        }

        async fn translate(&self, text: &str, _direction: Direction) -> hura_core::Result<String> {
            if self.fail {
                return Err(Error::Translation("quota".to_string()));
            }
            Ok(text.to_uppercase())
        }
    }

    #[async_trait]
    impl LocationLookup for Fake {
        async fn process_query(&self, query: &str) -> hura_core::Result<String> {
            Ok(format!("map of {}", query))
        }
    }

    #[async_trait]
    impl WeatherLookup for Fake {
        async fn process_query(&self, query: &str) -> hura_core::Result<String> {
            Ok(format!("weather for {}", query))
        }
    }

    fn backends(fail: bool) -> Backends {
        Backends {
            rag: Some(Arc::new(Fake { fail })),
            translation: Some(Arc::new(TranslationService::new(Arc::new(Fake { fail }), None))),
            maps: Some(Arc::new(Fake { fail })),
            weather: Some(Arc::new(Fake { fail })),
        }
    }

    fn app_with(backends: Backends, config: Config, limit: u32) -> Router {
        let state = AppState::new(config, backends, None);
        build_app(state, WebhookState::default(), Arc::new(RateLimiter::new(limit)))
    }

    fn app(backends: Backends) -> Router {
        app_with(backends, Config::default(), 1000)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_and_menu() {
        let (status, json) = send(app(backends(false)), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["endpoints"]["ask_question"], "POST /ask");

        let (status, json) = send(app(backends(false)), get("/menu")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = json["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["1", "2a", "2b", "3", "4"]);
        assert_eq!(json["features_status"]["rag"], true);
        // No API keys in the default config
        assert_eq!(json["features_status"]["maps"], false);
        assert_eq!(json["features_status"]["whatsapp"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blob.bin"), vec![0u8; 1024 * 1024]).unwrap();

        let mut config = Config::default();
        config.storage.persistent_dir = tmp.path().display().to_string();
        config.whatsapp.account_sid = "AC123".to_string();
        config.whatsapp.auth_token = "token".to_string();
        config.whatsapp.phone_number = "+14155238886".to_string();

        let (status, json) = send(app_with(Backends::default(), config, 1000), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["details"]["rag_service"], false);
        assert_eq!(json["details"]["active_whatsapp_sessions"], 0);
        assert_eq!(json["details"]["storage_usage"], "1.00 MB");
        assert_eq!(json["details"]["features"]["whatsapp"], true);
        assert_eq!(json["details"]["features"]["rag"], false);
    }

    #[tokio::test]
    async fn test_ask_routes_to_rag() {
        let (status, json) = send(
            app(backends(false)),
            post_json("/ask", json!({"text": "  Tell me about Rwandan coffee  "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "answer to Tell me about Rwandan coffee");
        assert_eq!(json["service_used"], "RAG");
        assert!(json["processing_time"].as_str().unwrap().ends_with(" seconds"));
    }

    #[tokio::test]
    async fn test_ask_routes_to_weather() {
        let (status, json) = send(
            app(backends(false)),
            post_json("/ask", json!({"text": "Will it rain tomorrow?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["service_used"], "OpenWeather");
    }

    #[tokio::test]
    async fn test_ask_validation() {
        let (status, json) = send(app(backends(false)), post_json("/ask", json!({"text": "   "}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"], "Query cannot be empty");

        let long = "a".repeat(1001);
        let (status, json) = send(app(backends(false)), post_json("/ask", json!({"text": long}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"], "Query too long (max 1000 characters)");

        let (status, json) = send(app(backends(false)), post_json("/ask", json!({"question": "hi"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_ask_without_rag() {
        let (status, json) = send(app(Backends::default()), post_json("/ask", json!({"text": "hi"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["detail"], "RAG service initializing, try again in 30 seconds");
    }

    #[tokio::test]
    async fn test_ask_processing_failure() {
        let (status, json) = send(
            app(backends(true)),
            post_json("/ask", json!({"text": "Tell me about Nyungwe"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "Error processing your question");
    }

    #[tokio::test]
    async fn test_translate_endpoints() {
        let (status, json) = send(
            app(backends(false)),
            post_json("/translate/en2rw", json!({"text": "good morning"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["translation"], "GOOD MORNING");
        assert_eq!(json["source_language"], "English");
        assert_eq!(json["target_language"], "Kinyarwanda");
        assert_eq!(json["service_used"], "Fake Translate");

        let (_, json) = send(
            app(backends(false)),
            post_json("/translate/rw2en", json!({"text": "mwaramutse"})),
        )
        .await;
        assert_eq!(json["source_language"], "Kinyarwanda");
        assert_eq!(json["target_language"], "English");
    }

    #[tokio::test]
    async fn test_translate_errors() {
        let (status, json) = send(app(backends(true)), post_json("/translate/en2rw", json!({"text": "hi"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "Translation failed.");

        let (status, json) = send(app(Backends::default()), post_json("/translate/rw2en", json!({"text": "hi"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["detail"], "Translation service not loaded yet.");

        let long = "a".repeat(2001);
        let (status, _) = send(app(backends(false)), post_json("/translate/en2rw", json!({"text": long}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_maps_and_weather() {
        let (status, json) = send(
            app(backends(false)),
            post_json("/maps", json!({"query": "Where is\u{7} Kimironko?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "map of Where is Kimironko?");
        assert_eq!(json["service_used"], "Google Maps");

        let (status, json) = send(app(backends(false)), post_json("/weather", json!({"query": "today"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["service_used"], "OpenWeather");

        let (status, json) = send(app(Backends::default()), post_json("/weather", json!({"query": "today"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["detail"], "Weather service not available.");

        let long = "a".repeat(501);
        let (status, _) = send(app(backends(false)), post_json("/maps", json!({"query": long}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let app = app_with(backends(false), Config::default(), 2);
        let request = || {
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "198.51.100.4")
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(app.clone().oneshot(request()).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(request()).await.unwrap().status(), StatusCode::OK);

        let (status, json) = send(app, request()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["detail"], "Too many requests. Please try again later.");
    }

    #[tokio::test]
    async fn test_zero_rate_limit_allows_traffic() {
        let app = app_with(backends(false), Config::default(), 0);
        for _ in 0..5 {
            assert_eq!(app.clone().oneshot(get("/health")).await.unwrap().status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_webhook_is_mounted() {
        let request = Request::builder()
            .method("POST")
            .uri("/whatsapp/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("From=whatsapp%3A%2B1&To=whatsapp%3A%2B2&Body=hi"))
            .unwrap();
        let (status, json) = send(app(backends(false)), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["detail"], "WhatsApp service not available.");
    }
}
