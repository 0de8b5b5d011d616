//! Persistent vector store over the Q&A corpus

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, RetrievalConfig, SearchType};
use crate::error::{Error, Result};
use crate::knowledge::{self, QaRecord};

use super::embedder::Embedder;
use super::index::{IndexEntry, ScoredDocument, VectorIndex};

/// Name of the collection and of its file under the vector DB directory
pub const COLLECTION_NAME: &str = "kigali_tourism";

const EMBED_BATCH_SIZE: usize = 32;

/// Vector index plus the embedder that produced it
pub struct VectorStore {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalConfig,
}

impl VectorStore {
    /// Path of the persisted index inside `vector_db_dir`
    pub fn index_path(vector_db_dir: &Path) -> PathBuf {
        vector_db_dir.join(format!("{}.json", COLLECTION_NAME))
    }

    /// Load the persisted index, or build it from the corpus.
    ///
    /// A file written by a different embedder, or one that cannot be
    /// parsed, is discarded and rebuilt. `reindex` forces a rebuild.
    pub async fn open(config: &Config, embedder: Arc<dyn Embedder>, reindex: bool) -> Result<Self> {
        let path = Self::index_path(&config.storage.vector_db_path());

        if !reindex && path.exists() {
            match VectorIndex::load(&path) {
                Ok(index) if index.embedder_id == embedder.id() => {
                    info!("Loaded vector store from {} ({} documents)", path.display(), index.len());
                    return Ok(Self::from_index(index, embedder, config.retrieval.clone()));
                }
                Ok(index) => {
                    info!(
                        "Vector store was built with '{}', current embedder is '{}'; rebuilding",
                        index.embedder_id,
                        embedder.id()
                    );
                }
                Err(e) => {
                    warn!("Discarding unreadable vector store {}: {}", path.display(), e);
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!("Failed to remove {}: {}", path.display(), e);
                    }
                }
            }
        }

        info!("Creating new vector store...");
        let records = knowledge::load_corpus(&config.storage.data_path());
        let index = Self::build_index(&records, embedder.as_ref()).await?;

        if let Err(e) = index.save(&path) {
            warn!("Failed to persist vector store to {}: {}", path.display(), e);
        } else {
            info!("Vector store saved to {}", path.display());
        }

        Ok(Self::from_index(index, embedder, config.retrieval.clone()))
    }

    /// Wrap an already built index
    pub fn from_index(index: VectorIndex, embedder: Arc<dyn Embedder>, retrieval: RetrievalConfig) -> Self {
        Self {
            index,
            embedder,
            retrieval,
        }
    }

    /// Embed `records` in batches into a fresh index
    pub async fn build_index(records: &[QaRecord], embedder: &dyn Embedder) -> Result<VectorIndex> {
        let mut index = VectorIndex::new(COLLECTION_NAME, embedder.id(), embedder.dimension());

        for chunk in records.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = chunk.iter().map(QaRecord::document_text).collect();
            let embeddings = embedder.embed(&texts).await?;
            if embeddings.len() != chunk.len() {
                return Err(Error::VectorStore(format!(
                    "embedder returned {} vectors for {} documents",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            for (record, embedding) in chunk.iter().zip(embeddings) {
                index.add(IndexEntry::from_record(record, embedding))?;
            }
        }

        info!("Indexed {} documents into '{}'", index.len(), COLLECTION_NAME);
        Ok(index)
    }

    /// Retrieve the `search_k` best documents for `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("no embedding returned for query".to_string()))?;

        let k = self.retrieval.search_k;
        let docs = match self.retrieval.search_type {
            SearchType::Similarity => self.index.similarity_search(&query_vec, k),
            SearchType::Mmr => {
                self.index
                    .mmr_search(&query_vec, k, self.retrieval.fetch_k, self.retrieval.lambda_mult)
            }
        };
        Ok(docs)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Source;
    use crate::vector::HashingEmbedder;
    use serde_json::json;

    fn write_corpus(dir: &Path) {
        std::fs::write(
            dir.join("tourism_faq_gov.json"),
            json!([
                {"question": "Do I need a visa to visit Rwanda?", "answer": "Most visitors can get a visa on arrival at Kigali airport."},
                {"question": "What currency is used in Rwanda?", "answer": "The Rwandan franc (RWF) is the official currency."},
                {"question": "Is tap water safe to drink?", "answer": "Drink bottled or boiled water to be safe."}
            ])
            .to_string(),
        )
        .unwrap();
    }

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = root.join("data").display().to_string();
        config.storage.vector_db_path = root.join("vector_db").display().to_string();
        config.retrieval.search_k = 1;
        config
    }

    #[tokio::test]
    async fn test_open_builds_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        write_corpus(&tmp.path().join("data"));
        let config = test_config(tmp.path());
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(128));

        let store = VectorStore::open(&config, embedder.clone(), false).await.unwrap();
        assert_eq!(store.len(), 3);
        assert!(VectorStore::index_path(&config.storage.vector_db_path()).exists());

        let hits = store.retrieve("which currency is used in Rwanda").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].original_question, "What currency is used in Rwanda?");
        assert_eq!(hits[0].source, Source::GovFaq);

        // Second open loads the persisted file even if the corpus is gone
        std::fs::remove_file(tmp.path().join("data/tourism_faq_gov.json")).unwrap();
        let reopened = VectorStore::open(&config, embedder, false).await.unwrap();
        assert_eq!(reopened.len(), 3);
    }

    #[tokio::test]
    async fn test_open_rebuilds_on_embedder_change() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        write_corpus(&tmp.path().join("data"));
        let config = test_config(tmp.path());

        VectorStore::open(&config, Arc::new(HashingEmbedder::new(64)), false)
            .await
            .unwrap();
        let store = VectorStore::open(&config, Arc::new(HashingEmbedder::new(32)), false)
            .await
            .unwrap();

        let saved = VectorIndex::load(&VectorStore::index_path(&config.storage.vector_db_path())).unwrap();
        assert_eq!(saved.dimension, 32);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_open_replaces_corrupt_index() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        std::fs::create_dir_all(tmp.path().join("vector_db")).unwrap();
        write_corpus(&tmp.path().join("data"));
        let config = test_config(tmp.path());
        std::fs::write(VectorStore::index_path(&config.storage.vector_db_path()), "garbage").unwrap();

        let store = VectorStore::open(&config, Arc::new(HashingEmbedder::new(64)), false)
            .await
            .unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_on_empty_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let store = VectorStore::open(&config, Arc::new(HashingEmbedder::new(16)), false)
            .await
            .unwrap();
        assert!(store.is_empty());
        assert!(store.retrieve("anything").await.unwrap().is_empty());
    }
}
