//! hura-gateway: Hura tourism assistant server
//!
//! Usage:
//!   hura-gateway             - Start the HTTP API and WhatsApp webhook
//!   hura-gateway --reindex   - Rebuild the vector index and exit
//!   hura-gateway --help      - Show help

use std::sync::Arc;
use std::time::Duration;

use hura_api::AppState;
use hura_core::storage::ensure_directories;
use hura_core::{
    build_embedder, Answerer, Backends, Config, LlmClient, LocationLookup, MapsService, RagService,
    TranslationService, VectorStore, WeatherLookup, WeatherService,
};
use hura_whatsapp::{InMemorySessionStore, SignatureVerifier, TwilioClient, WebhookState, WhatsAppService, WEBHOOK_PATH};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// HTTP API + WhatsApp webhook
    Server,
    /// Rebuild the vector index and exit
    Reindex,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("hura-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting hura-gateway...");
    ensure_directories(&[
        config.storage.persistent_path(),
        config.storage.model_cache_path(),
        config.storage.vector_db_path(),
    ]);

    match mode {
        RunMode::Reindex => reindex(&config).await,
        _ => run_server(config).await,
    }
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--reindex" => return RunMode::Reindex,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("hura-gateway - Hura Tourism Chatbot");
    println!();
    println!("Usage:");
    println!("  hura-gateway            Start the HTTP API and WhatsApp webhook");
    println!("  hura-gateway --reindex  Rebuild the vector index and exit");
    println!("  hura-gateway --help     Show this help message");
    println!("  hura-gateway --version  Show version");
    println!();
    println!("Configuration is read from hura.toml and the environment.");
    println!();
    println!("Environment Variables:");
    println!("  LLM_PROVIDER            claude, openai or gemini (default: claude)");
    println!("  LLM_API_KEY             LLM API key");
    println!("  GOOGLE_MAPS_API_KEY     Enables the location service");
    println!("  OPENWEATHER_API_KEY     Enables the weather service");
    println!("  GOOGLE_TRANSLATE_API_KEY  Google Translate fallback");
    println!("  TWILIO_ACCOUNT_SID      Twilio account for WhatsApp");
    println!("  TWILIO_AUTH_TOKEN       Twilio auth token");
    println!("  TWILIO_PHONE_NUMBER     WhatsApp sender number");
    println!("  WHATSAPP_API_BASE_URL   Public URL used to verify Twilio signatures");
    println!("  PERSISTENT_DIR          Data directory (default: /data)");
    println!("  PORT                    HTTP port (default: 7860)");
    println!("  RUST_LOG                Log filter (default: info)");
}

async fn reindex(config: &Config) -> anyhow::Result<()> {
    let embedder = build_embedder(&config.embedding).map_err(|e| anyhow::anyhow!("Embedder error: {}", e))?;
    let store = VectorStore::open(config, embedder, true)
        .await
        .map_err(|e| anyhow::anyhow!("Reindex failed: {}", e))?;
    tracing::info!("Vector index rebuilt with {} documents", store.len());
    Ok(())
}

fn llm_client(config: &Config) -> Option<LlmClient> {
    if !config.llm_configured() {
        tracing::warn!("No LLM API key configured - answers fall back to the best matching document");
        return None;
    }

    match LlmClient::new(&config.llm) {
        Ok(client) => {
            tracing::info!("LLM: {:?} ({})", config.llm.provider, config.llm.effective_model());
            Some(client)
        }
        Err(e) => {
            tracing::error!("Failed to create LLM client: {}", e);
            None
        }
    }
}

async fn rag_service(config: &Config, llm: Option<LlmClient>) -> Option<Arc<dyn Answerer>> {
    let embedder = match build_embedder(&config.embedding) {
        Ok(embedder) => embedder,
        Err(e) => {
            tracing::error!("Failed to create embedder: {}", e);
            return None;
        }
    };

    match VectorStore::open(config, embedder, false).await {
        Ok(store) => {
            let rag = RagService::new(Arc::new(store), llm);
            tracing::info!("RAG service ready ({} documents)", rag.document_count());
            Some(Arc::new(rag))
        }
        Err(e) => {
            tracing::error!("Failed to initialize RAG service: {}", e);
            None
        }
    }
}

async fn build_backends(config: &Config) -> Backends {
    let llm = llm_client(config);

    let rag = rag_service(config, llm.clone()).await;

    let translation = match TranslationService::from_config(config, llm) {
        Ok(Some(service)) => {
            tracing::info!("Translation service: {}", service.name());
            Some(Arc::new(service))
        }
        Ok(None) => {
            tracing::warn!("No translation backend configured - translation is disabled");
            None
        }
        Err(e) => {
            tracing::error!("Failed to initialize translation service: {}", e);
            None
        }
    };

    let maps: Option<Arc<dyn LocationLookup>> = match MapsService::new(&config.maps) {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            tracing::error!("Failed to initialize maps service: {}", e);
            None
        }
    };

    let weather: Option<Arc<dyn WeatherLookup>> = match WeatherService::new(&config.weather) {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            tracing::error!("Failed to initialize weather service: {}", e);
            None
        }
    };

    Backends {
        rag,
        translation,
        maps,
        weather,
    }
}

fn webhook_state(config: &Config, whatsapp: Option<Arc<WhatsAppService>>) -> WebhookState {
    let settings = &config.whatsapp;
    let verifier = if settings.validate_signature && !settings.auth_token.is_empty() {
        if settings.public_base_url.is_empty() {
            tracing::warn!("WHATSAPP_API_BASE_URL not set - Twilio signatures cannot be verified");
            None
        } else {
            let url = format!("{}{}", settings.public_base_url.trim_end_matches('/'), WEBHOOK_PATH);
            tracing::info!("Verifying Twilio signatures for {}", url);
            Some(SignatureVerifier::new(settings.auth_token.clone(), url))
        }
    } else {
        None
    };

    WebhookState {
        service: whatsapp,
        verifier,
    }
}

/// Run server mode
async fn run_server(config: Config) -> anyhow::Result<()> {
    let backends = build_backends(&config).await;

    let whatsapp = if config.whatsapp.enabled {
        let sessions = Arc::new(InMemorySessionStore::new());
        if config.whatsapp.session_idle_timeout_secs > 0 {
            let idle = Duration::from_secs(config.whatsapp.session_idle_timeout_secs);
            sessions.clone().start_cleanup_task(idle);
        }

        let service = WhatsAppService::new(backends.clone(), sessions, TwilioClient::new(&config.whatsapp));
        Some(Arc::new(service))
    } else {
        tracing::info!("WhatsApp integration is disabled");
        None
    };

    let webhook = webhook_state(&config, whatsapp.clone());
    let state = AppState::new(config, backends, whatsapp);

    tracing::info!("hura-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    hura_api::start_server(state, webhook, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down...");
    })
    .await
}
