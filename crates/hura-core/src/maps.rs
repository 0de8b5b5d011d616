//! Google Maps wrapper: place search, directions and nearby places

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::backend::LocationLookup;
use crate::config::MapsConfig;
use crate::error::{Error, Result};

pub const NO_ACCESS_MESSAGE: &str = "I'm sorry, but I don't have access to maps and location services at the moment. \
Please check with your hotel or local information center for directions.";

pub const UNKNOWN_LOCATION_MESSAGE: &str = "I'm not sure what location you're asking about. \
Could you please be more specific? For example: 'Where is Kimironko?' or 'How do I get to the airport?'";

const MAPS_KEYWORDS: &[&str] = &[
    "where is",
    "location",
    "address",
    "directions",
    "how to get",
    "how do i get",
    "route",
    "map",
    "nearby",
    "close to",
    "kimironko",
    "nyarutarama",
    "kacyiru",
    "remera",
    "kicukiro",
    "airport",
    "hotel",
    "restaurant",
    "museum",
    "market",
    "bank",
    "atm",
    "pharmacy",
    "hospital",
    "school",
    "university",
];

const DIRECTIONS_KEYWORDS: &[&str] = &["how to get", "directions", "route", "how do i get"];

const NEARBY_KEYWORDS: &[&str] = &["restaurant", "food", "eat", "hotel", "accommodation"];

const LOCATION_PATTERNS: &[&str] = &[
    r"(?i)where is (.+?)(?:\?|$)",
    r"(?i)location of (.+?)(?:\?|$)",
    r"(?i)address of (.+?)(?:\?|$)",
    r"(?i)how to get to (.+?)(?:\?|$)",
    r"(?i)how do i get to (.+?)(?:\?|$)",
    r"(?i)directions to (.+?)(?:\?|$)",
    r"(?i)route to (.+?)(?:\?|$)",
];

const NEARBY_RADIUS_METERS: u32 = 5000;

fn location_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        LOCATION_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Whether the text looks like a location question
pub fn is_maps_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    MAPS_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Pull the place name out of a location question, adding `, Kigali` when
/// the city is not named
pub fn extract_location(text: &str) -> Option<String> {
    let location = location_patterns()
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|loc| !loc.is_empty())?;

    if location.to_lowercase().contains("kigali") {
        Some(location)
    } else {
        Some(format!("{}, Kigali", location))
    }
}

// ============================================================================
// API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    vicinity: String,
    geometry: Option<Geometry>,
    rating: Option<f64>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    routes: Vec<RouteResult>,
}

#[derive(Debug, Deserialize)]
struct RouteResult {
    #[serde(default)]
    legs: Vec<LegResult>,
}

#[derive(Debug, Deserialize)]
struct LegResult {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
    #[serde(default)]
    steps: Vec<StepResult>,
}

#[derive(Debug, Deserialize)]
struct StepResult {
    #[serde(default)]
    html_instructions: String,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(default)]
    text: String,
}

fn text_of(value: Option<TextValue>) -> String {
    value.map(|v| v.text).unwrap_or_default()
}

/// A place found by text search
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub location: Option<LatLng>,
    pub rating: Option<f64>,
    pub types: Vec<String>,
    pub place_id: String,
}

/// One step of a route
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub instruction: String,
    pub distance: String,
    pub duration: String,
}

/// First leg of the first route
#[derive(Debug, Clone, PartialEq)]
pub struct Directions {
    pub distance: String,
    pub duration: String,
    pub start_address: String,
    pub end_address: String,
    pub steps: Vec<Step>,
}

/// A place near another one
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyPlace {
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
    pub types: Vec<String>,
}

// ============================================================================
// Service
// ============================================================================

/// Google Maps Platform client
pub struct MapsService {
    client: Client,
    api_key: String,
    base_url: String,
    default_location: String,
}

impl MapsService {
    pub fn new(config: &MapsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        if config.api_key.is_empty() {
            warn!("Google Maps API key not configured - maps features will be disabled");
        } else {
            info!("Google Maps service initialized successfully");
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_location: config.default_location.clone(),
        })
    }

    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("Google Maps {}: {}", endpoint, status)));
        }
        Ok(response.json().await?)
    }

    /// Text search restricted to Rwanda; first result
    pub async fn search_place(&self, query: &str) -> Result<Option<Place>> {
        let query = if query.to_lowercase().contains("kigali") {
            query.to_string()
        } else {
            format!("{}, Kigali", query)
        };

        let data: PlacesResponse = self
            .get_json(
                "/maps/api/place/textsearch/json",
                &[("query", query), ("region", "rw".to_string())],
            )
            .await?;

        if data.status != "OK" {
            warn!("Place search failed: {}", data.status);
            return Ok(None);
        }

        Ok(data.results.into_iter().next().map(|place| Place {
            name: place.name,
            address: place.formatted_address,
            location: place.geometry.map(|g| g.location),
            rating: place.rating,
            types: place.types,
            place_id: place.place_id,
        }))
    }

    /// Route between two places; first leg of the first route
    pub async fn get_directions(&self, origin: &str, destination: &str) -> Result<Option<Directions>> {
        let data: DirectionsResponse = self
            .get_json(
                "/maps/api/directions/json",
                &[
                    ("origin", origin.to_string()),
                    ("destination", destination.to_string()),
                    ("region", "rw".to_string()),
                ],
            )
            .await?;

        if data.status != "OK" {
            warn!("Directions failed: {}", data.status);
            return Ok(None);
        }

        let leg = data
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.legs.into_iter().next());

        Ok(leg.map(|leg| Directions {
            distance: text_of(leg.distance),
            duration: text_of(leg.duration),
            start_address: leg.start_address,
            end_address: leg.end_address,
            steps: leg
                .steps
                .into_iter()
                .map(|s| Step {
                    instruction: s.html_instructions,
                    distance: text_of(s.distance),
                    duration: text_of(s.duration),
                })
                .collect(),
        }))
    }

    /// Up to five places of `place_type` around `location`
    pub async fn get_nearby_places(&self, location: &str, place_type: &str) -> Result<Option<Vec<NearbyPlace>>> {
        let Some(coords) = self.search_place(location).await?.and_then(|p| p.location) else {
            return Ok(None);
        };

        let data: PlacesResponse = self
            .get_json(
                "/maps/api/place/nearbysearch/json",
                &[
                    ("location", format!("{},{}", coords.lat, coords.lng)),
                    ("radius", NEARBY_RADIUS_METERS.to_string()),
                    ("type", place_type.to_string()),
                ],
            )
            .await?;

        if data.status != "OK" {
            warn!("Nearby search failed: {}", data.status);
            return Ok(None);
        }

        Ok(Some(
            data.results
                .into_iter()
                .take(5)
                .map(|p| NearbyPlace {
                    name: p.name,
                    address: p.vicinity,
                    rating: p.rating,
                    types: p.types,
                })
                .collect(),
        ))
    }

    async fn directions_answer(&self, destination: &str) -> String {
        match self.get_directions(&self.default_location, destination).await {
            Ok(Some(d)) => format!(
                "To get to {} from Kigali:\n• Distance: {}\n• Duration: {}\n• Start: {}\n• End: {}",
                destination, d.distance, d.duration, d.start_address, d.end_address
            ),
            Ok(None) => format!(
                "I couldn't find directions to {}. Please check the location name and try again.",
                destination
            ),
            Err(e) => {
                error!("Error getting directions: {}", e);
                format!(
                    "I couldn't find directions to {}. Please check the location name and try again.",
                    destination
                )
            }
        }
    }

    async fn place_answer(&self, query: &str, location: &str) -> String {
        let not_found = format!(
            "I couldn't find information about {}. Please check the spelling or try a different location name.",
            location
        );

        let place = match self.search_place(location).await {
            Ok(Some(place)) => place,
            Ok(None) => return not_found,
            Err(e) => {
                error!("Error searching place: {}", e);
                return not_found;
            }
        };

        let mut response = format!("📍 **{}**\n📍 Address: {}\n", place.name, place.address);
        if let Some(rating) = place.rating.filter(|r| *r > 0.0) {
            response.push_str(&format!("⭐ Rating: {:.1}/5\n", rating));
        }

        let lower = query.to_lowercase();
        if NEARBY_KEYWORDS.iter().any(|w| lower.contains(w)) {
            let place_type = if lower.contains("restaurant") { "restaurant" } else { "lodging" };
            match self.get_nearby_places(location, place_type).await {
                Ok(Some(nearby)) if !nearby.is_empty() => {
                    response.push_str("\n🍽️ **Nearby places:**\n");
                    for p in nearby.iter().take(3) {
                        response.push_str(&format!("• {} ({})\n", p.name, p.address));
                    }
                }
                Ok(_) => {}
                Err(e) => error!("Error getting nearby places: {}", e),
            }
        }

        response
    }
}

#[async_trait]
impl LocationLookup for MapsService {
    async fn process_query(&self, query: &str) -> Result<String> {
        if !self.enabled() {
            return Ok(NO_ACCESS_MESSAGE.to_string());
        }

        let Some(location) = extract_location(query) else {
            return Ok(UNKNOWN_LOCATION_MESSAGE.to_string());
        };

        let lower = query.to_lowercase();
        if DIRECTIONS_KEYWORDS.iter().any(|w| lower.contains(w)) {
            Ok(self.directions_answer(&location).await)
        } else {
            Ok(self.place_answer(query, &location).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str, api_key: &str) -> MapsService {
        MapsService::new(&MapsConfig {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            ..MapsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_is_maps_query() {
        assert!(is_maps_query("Where is Kimironko market?"));
        assert!(is_maps_query("Any good RESTAURANT nearby"));
        assert!(!is_maps_query("Tell me about gorilla trekking"));
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location("Where is Kimironko Market?").as_deref(),
            Some("Kimironko Market, Kigali")
        );
        assert_eq!(
            extract_location("how do I get to the airport").as_deref(),
            Some("the airport, Kigali")
        );
        assert_eq!(
            extract_location("Directions to Kigali Convention Centre?").as_deref(),
            Some("Kigali Convention Centre")
        );
        assert_eq!(extract_location("best hotels"), None);
    }

    #[tokio::test]
    async fn test_no_api_key() {
        let maps = service("http://127.0.0.1:9", "");
        let answer = maps.process_query("Where is Remera?").await.unwrap();
        assert_eq!(answer, NO_ACCESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_unknown_location() {
        let maps = service("http://127.0.0.1:9", "key");
        let answer = maps.process_query("nearby pharmacy").await.unwrap();
        assert_eq!(answer, UNKNOWN_LOCATION_MESSAGE);
    }

    #[tokio::test]
    async fn test_place_search_answer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/textsearch/json"))
            .and(query_param("query", "Kimironko Market, Kigali"))
            .and(query_param("region", "rw"))
            .and(query_param("key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "name": "Kimironko Market",
                    "formatted_address": "KG 11 Ave, Kigali",
                    "geometry": {"location": {"lat": -1.949, "lng": 30.126}},
                    "rating": 4.3,
                    "types": ["market"],
                    "place_id": "abc"
                }]
            })))
            .mount(&server)
            .await;

        let maps = service(&server.uri(), "key");
        let answer = maps.process_query("Where is Kimironko Market?").await.unwrap();
        assert_eq!(
            answer,
            "📍 **Kimironko Market**\n📍 Address: KG 11 Ave, Kigali\n⭐ Rating: 4.3/5\n"
        );
    }

    async fn place_answer_with_rating(rating: f64) -> String {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "name": "Inema Arts Center",
                    "formatted_address": "KG 563 St, Kigali",
                    "geometry": {"location": {"lat": -1.94, "lng": 30.09}},
                    "rating": rating
                }]
            })))
            .mount(&server)
            .await;

        service(&server.uri(), "key")
            .process_query("Where is Inema Arts Center?")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rating_formatting() {
        let whole = place_answer_with_rating(4.0).await;
        assert!(whole.contains("⭐ Rating: 4.0/5\n"));

        let unrated = place_answer_with_rating(0.0).await;
        assert!(!unrated.contains("Rating"));
        assert!(unrated.starts_with("📍 **Inema Arts Center**\n📍 Address: KG 563 St, Kigali\n"));
    }

    #[tokio::test]
    async fn test_place_with_nearby_restaurants() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{
                    "name": "Heaven Restaurant",
                    "formatted_address": "KN 29 St, Kigali",
                    "geometry": {"location": {"lat": -1.95, "lng": 30.06}}
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("radius", "5000"))
            .and(query_param("type", "restaurant"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [
                    {"name": "A", "vicinity": "Street 1"},
                    {"name": "B", "vicinity": "Street 2"},
                    {"name": "C", "vicinity": "Street 3"},
                    {"name": "D", "vicinity": "Street 4"}
                ]
            })))
            .mount(&server)
            .await;

        let maps = service(&server.uri(), "key");
        let answer = maps.process_query("Where is Heaven Restaurant?").await.unwrap();
        assert!(answer.starts_with("📍 **Heaven Restaurant**\n"));
        assert!(answer.contains("🍽️ **Nearby places:**\n• A (Street 1)\n• B (Street 2)\n• C (Street 3)\n"));
        assert!(!answer.contains("Street 4"));
    }

    #[tokio::test]
    async fn test_directions_answer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .and(query_param("origin", "Kigali, Rwanda"))
            .and(query_param("destination", "the airport, Kigali"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{"legs": [{
                    "distance": {"text": "10.2 km"},
                    "duration": {"text": "22 mins"},
                    "start_address": "Kigali, Rwanda",
                    "end_address": "Kigali International Airport",
                    "steps": [{"html_instructions": "Head east", "distance": {"text": "1 km"}, "duration": {"text": "2 mins"}}]
                }]}]
            })))
            .mount(&server)
            .await;

        let maps = service(&server.uri(), "key");
        let answer = maps.process_query("How do I get to the airport?").await.unwrap();
        assert_eq!(
            answer,
            "To get to the airport, Kigali from Kigali:\n• Distance: 10.2 km\n• Duration: 22 mins\n\
             • Start: Kigali, Rwanda\n• End: Kigali International Airport"
        );

        let directions = maps
            .get_directions("Kigali, Rwanda", "the airport, Kigali")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(directions.steps.len(), 1);
        assert_eq!(directions.steps[0].instruction, "Head east");
    }

    #[tokio::test]
    async fn test_api_failure_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let maps = service(&server.uri(), "key");
        let answer = maps.process_query("Where is Nyamirambo?").await.unwrap();
        assert!(answer.starts_with("I couldn't find information about Nyamirambo, Kigali."));

        let answer = maps.process_query("route to Musanze").await.unwrap();
        assert!(answer.starts_with("I couldn't find directions to Musanze, Kigali."));
    }

    #[tokio::test]
    async fn test_zero_results_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS", "results": []})))
            .mount(&server)
            .await;

        let maps = service(&server.uri(), "key");
        assert!(maps.search_place("nowhere").await.unwrap().is_none());
    }
}
