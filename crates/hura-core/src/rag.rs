//! Retrieval-augmented answering over the tourism corpus

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use crate::backend::Answerer;
use crate::error::Result;
use crate::llm::LlmClient;
use crate::vector::{ScoredDocument, VectorStore};

/// Answer given when the corpus has nothing relevant
pub const NO_INFO_ANSWER: &str = "I couldn't find official info, contact tourism@rdb.rw";

const SYSTEM_PROMPT: &str = "You are a tourism assistant for Kigali, Rwanda. \
Answer the user's question as helpfully and specifically as possible, using the information provided. \
Do not mention or refer to the information source or context in your answer. \
If you don't know the answer, say: \"I couldn't find official info, contact tourism@rdb.rw\". \
Respond concisely in 2-3 sentences.";

const LOCATION_KEYWORDS: &[&str] = &["how to get", "transport", "where is", "directions to"];

/// Append a Kigali hint to location-flavored questions
pub fn expand_query(text: &str) -> String {
    let lower = text.to_lowercase();
    if LOCATION_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        format!("{} in Kigali, Rwanda", text)
    } else {
        text.to_string()
    }
}

/// Retrieved document texts separated by blank lines
pub fn build_context(docs: &[ScoredDocument]) -> String {
    docs.iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User turn sent to the LLM
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("Information:\n{}\n\nQuestion: {}", context, question)
}

/// The `ANSWER:` part of an indexed document
fn extract_answer(text: &str) -> &str {
    match text.find("ANSWER:") {
        Some(pos) => text[pos + "ANSWER:".len()..].trim(),
        None => text.trim(),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    }
}

/// RAG pipeline: retrieve, prompt, generate
pub struct RagService {
    store: Arc<VectorStore>,
    llm: Option<LlmClient>,
}

impl RagService {
    /// Without an LLM the service answers extractively from the best match
    pub fn new(store: Arc<VectorStore>, llm: Option<LlmClient>) -> Self {
        Self { store, llm }
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub async fn query(&self, text: &str) -> Result<String> {
        let start = Instant::now();

        let result = self.run(text).await;
        match &result {
            Ok(_) => info!(
                "Processed query in {:.2}s: {}",
                start.elapsed().as_secs_f64(),
                preview(text)
            ),
            Err(e) => error!("Query processing error: {}", e),
        }
        result
    }

    async fn run(&self, text: &str) -> Result<String> {
        let docs = self.store.retrieve(text).await?;

        let Some(llm) = &self.llm else {
            return Ok(docs
                .first()
                .map(|d| extract_answer(&d.text).to_string())
                .unwrap_or_else(|| NO_INFO_ANSWER.to_string()));
        };

        let context = build_context(&docs);
        let prompt = build_user_prompt(&context, &expand_query(text));
        llm.complete(SYSTEM_PROMPT, &prompt).await
    }
}

#[async_trait]
impl Answerer for RagService {
    async fn answer(&self, question: &str) -> Result<String> {
        self.query(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, LlmProvider, RetrievalConfig, SearchType};
    use crate::knowledge::{QaRecord, Source};
    use crate::vector::{Embedder, HashingEmbedder};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store(records: &[QaRecord]) -> Arc<VectorStore> {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(128));
        let index = VectorStore::build_index(records, embedder.as_ref()).await.unwrap();
        let retrieval = RetrievalConfig {
            search_k: 2,
            search_type: SearchType::Similarity,
            ..RetrievalConfig::default()
        };
        Arc::new(VectorStore::from_index(index, embedder, retrieval))
    }

    fn records() -> Vec<QaRecord> {
        vec![
            QaRecord {
                question: "Where is the Kigali Genocide Memorial?".to_string(),
                answer: "It is in Gisozi, about 10 minutes from the city centre.".to_string(),
                source: Source::GovFaq,
            },
            QaRecord {
                question: "Can I use mobile money?".to_string(),
                answer: "Yes, MTN MoMo is accepted almost everywhere.".to_string(),
                source: Source::Blog,
            },
        ]
    }

    #[test]
    fn test_expand_query() {
        assert_eq!(
            expand_query("Where is the convention centre?"),
            "Where is the convention centre? in Kigali, Rwanda"
        );
        assert_eq!(
            expand_query("Best TRANSPORT options"),
            "Best TRANSPORT options in Kigali, Rwanda"
        );
        assert_eq!(expand_query("Is Kigali safe?"), "Is Kigali safe?");
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_user_prompt("QUESTION: a\nANSWER: b", "a?");
        assert_eq!(prompt, "Information:\nQUESTION: a\nANSWER: b\n\nQuestion: a?");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(60);
        assert_eq!(preview(&long).len(), 53);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_extractive_answer_without_llm() {
        let rag = RagService::new(store(&records()).await, None);
        let answer = rag.answer("Can I pay with mobile money?").await.unwrap();
        assert_eq!(answer, "Yes, MTN MoMo is accepted almost everywhere.");
    }

    #[tokio::test]
    async fn test_empty_store_gives_canned_answer() {
        let rag = RagService::new(store(&[]).await, None);
        assert_eq!(rag.answer("anything").await.unwrap(), NO_INFO_ANSWER);
    }

    #[tokio::test]
    async fn test_llm_receives_context_and_expanded_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_string_contains("Information:"))
            .and(body_string_contains("Gisozi"))
            .and(body_string_contains("in Kigali, Rwanda"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "The memorial is in Gisozi."}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            provider: LlmProvider::Claude,
            api_key: "k".to_string(),
            ..LlmConfig::default()
        };
        let llm = LlmClient::with_base_url(&config, server.uri()).unwrap();
        let rag = RagService::new(store(&records()).await, Some(llm));

        let answer = rag.query("Where is the genocide memorial").await.unwrap();
        assert_eq!(answer, "The memorial is in Gisozi.");
    }
}
