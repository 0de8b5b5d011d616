//! Query classification and dispatch to the matching backend

use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;
use tracing::info;

use crate::backend::Backends;
use crate::error::{Error, Result};
use crate::maps;
use crate::translation::Direction;
use crate::weather::{self, TimePeriod};

pub const SERVICE_RAG: &str = "RAG";
pub const SERVICE_MAPS: &str = "Google Maps";
pub const SERVICE_WEATHER: &str = "OpenWeather";

pub const TRANSLATE_USAGE_HINT: &str = "Please specify what you'd like to translate. \
For example: 'Translate hello to Kinyarwanda' or 'Translate Muraho to English'";

const TRANSLATION_KEYWORDS: &[&str] = &["translate", "in kinyarwanda", "in english", "what does this mean"];

/// What a free-text query is about
#[derive(Debug, Clone, PartialEq)]
pub struct QueryType {
    pub is_maps: bool,
    pub is_weather: bool,
    pub is_translation: bool,
    pub is_general: bool,
    pub location: Option<String>,
    pub time_period: Option<TimePeriod>,
}

pub fn detect_query_type(text: &str) -> QueryType {
    let lower = text.to_lowercase();

    let is_maps = maps::is_maps_query(text);
    let is_weather = weather::is_weather_query(text);
    let is_translation = TRANSLATION_KEYWORDS.iter().any(|kw| lower.contains(kw));

    let mut location = None;
    let mut time_period = None;
    if is_maps {
        location = maps::extract_location(text);
    }
    if is_weather {
        location = Some(weather::extract_location(text));
        time_period = Some(weather::extract_time_period(text));
    }

    QueryType {
        is_maps,
        is_weather,
        is_translation,
        is_general: !(is_maps || is_weather || is_translation),
        location,
        time_period,
    }
}

fn target_phrase() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(?:^|\s+)(?:to|into|in)\s+(?:kinyarwanda|english)\s*[.?!]*\s*$").ok())
        .as_ref()
}

fn translate_keyword() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)translate").ok()).as_ref()
}

/// Text to translate and its direction, from a request such as
/// `Translate "good morning" to Kinyarwanda`
pub fn extract_translation_request(text: &str) -> Option<(String, Direction)> {
    let found = translate_keyword()?.find(text)?;
    let mut rest = text[found.end()..].trim();

    if let Some(re) = target_phrase() {
        if let Some(m) = re.find(rest) {
            rest = &rest[..m.start()];
        }
    }

    let payload = rest
        .trim()
        .trim_start_matches(':')
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’'))
        .trim();
    if payload.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    let direction = if lower.contains("kinyarwanda") || lower.contains("rwanda") {
        Direction::EnToRw
    } else {
        Direction::RwToEn
    };

    Some((payload.to_string(), direction))
}

/// A routed answer and the backend that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResponse {
    pub response: String,
    pub service_used: String,
}

/// Sends each query to maps, weather, translation or RAG, in that order of
/// precedence
#[derive(Clone)]
pub struct QueryRouter {
    backends: Backends,
}

impl QueryRouter {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub async fn route(&self, text: &str) -> Result<RoutedResponse> {
        let start = Instant::now();
        let query_type = detect_query_type(text);

        let routed = if query_type.is_maps {
            let maps = self
                .backends
                .maps
                .as_ref()
                .ok_or_else(|| Error::ServiceUnavailable("Maps service not available.".to_string()))?;
            RoutedResponse {
                response: maps.process_query(text).await?,
                service_used: SERVICE_MAPS.to_string(),
            }
        } else if query_type.is_weather {
            let weather = self
                .backends
                .weather
                .as_ref()
                .ok_or_else(|| Error::ServiceUnavailable("Weather service not available.".to_string()))?;
            RoutedResponse {
                response: weather.process_query(text).await?,
                service_used: SERVICE_WEATHER.to_string(),
            }
        } else if query_type.is_translation {
            self.route_translation(text).await?
        } else {
            let rag = self
                .backends
                .rag
                .as_ref()
                .ok_or_else(|| Error::ServiceUnavailable("RAG service not available.".to_string()))?;
            RoutedResponse {
                response: rag.answer(text).await?,
                service_used: SERVICE_RAG.to_string(),
            }
        };

        info!(
            "{} query processed in {:.2}s",
            routed.service_used,
            start.elapsed().as_secs_f64()
        );
        Ok(routed)
    }

    async fn route_translation(&self, text: &str) -> Result<RoutedResponse> {
        let translation = self
            .backends
            .translation
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable("Translation service not available.".to_string()))?;

        match extract_translation_request(text) {
            Some((payload, direction)) => {
                let result = translation.translate(&payload, direction).await?;
                Ok(RoutedResponse {
                    response: result.text,
                    service_used: result.service,
                })
            }
            None => Ok(RoutedResponse {
                response: TRANSLATE_USAGE_HINT.to_string(),
                service_used: translation.name().to_string(),
            }),
        }
    }
}
