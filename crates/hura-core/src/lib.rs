//! hura-core: Hura tourism assistant core library
//!
//! Settings, the Q&A corpus and its vector store, RAG answering,
//! translation, the Google Maps and OpenWeather wrappers, and the query
//! router that picks between them.

pub mod backend;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod maps;
pub mod rag;
pub mod router;
pub mod storage;
pub mod translation;
pub mod vector;
pub mod weather;

pub use backend::{Answerer, Backends, LocationLookup, Translator, WeatherLookup};
pub use config::{Config, LlmConfig, LlmProvider};
pub use error::{Error, Result};
pub use knowledge::{QaRecord, Source};
pub use llm::LlmClient;
pub use maps::MapsService;
pub use rag::RagService;
pub use router::{detect_query_type, QueryRouter, QueryType, RoutedResponse};
pub use translation::{Direction, Translation, TranslationService};
pub use vector::{build_embedder, Embedder, VectorStore};
pub use weather::WeatherService;
