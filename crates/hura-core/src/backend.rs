//! Backend seams shared by the router, the HTTP handlers and the WhatsApp
//! state machine

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::translation::{Direction, TranslationService};

/// Answers free-text tourism questions
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// A single translation backend
#[async_trait]
pub trait Translator: Send + Sync {
    /// Name reported to clients as `service_used`
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, direction: Direction) -> Result<String>;
}

/// Answers location questions
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn process_query(&self, query: &str) -> Result<String>;
}

/// Answers weather questions
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn process_query(&self, query: &str) -> Result<String>;
}

/// The set of backends available at runtime. `None` means the service
/// failed to start or is not configured.
#[derive(Clone, Default)]
pub struct Backends {
    pub rag: Option<Arc<dyn Answerer>>,
    pub translation: Option<Arc<TranslationService>>,
    pub maps: Option<Arc<dyn LocationLookup>>,
    pub weather: Option<Arc<dyn WeatherLookup>>,
}

impl Backends {
    pub fn rag_available(&self) -> bool {
        self.rag.is_some()
    }

    pub fn translation_available(&self) -> bool {
        self.translation.is_some()
    }

    pub fn maps_available(&self) -> bool {
        self.maps.is_some()
    }

    pub fn weather_available(&self) -> bool {
        self.weather.is_some()
    }
}
