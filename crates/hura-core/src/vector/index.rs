//! In-memory cosine index

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::knowledge::{QaRecord, Source};

/// A stored document with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub source: Source,
    pub original_question: String,
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn from_record(record: &QaRecord, embedding: Vec<f32>) -> Self {
        Self {
            text: record.document_text(),
            source: record.source,
            original_question: record.question.clone(),
            embedding,
        }
    }
}

/// A retrieval hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub text: String,
    pub source: Source,
    pub original_question: String,
    pub score: f32,
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Flat vector index, persisted as a single JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub collection: String,
    pub embedder_id: String,
    pub dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(collection: impl Into<String>, embedder_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            embedder_id: embedder_id.into(),
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: IndexEntry) -> Result<()> {
        if entry.embedding.len() != self.dimension {
            return Err(Error::VectorStore(format!(
                "embedding has dimension {}, index expects {}",
                entry.embedding.len(),
                self.dimension
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn scored(&self, idx: usize, score: f32) -> ScoredDocument {
        let entry = &self.entries[idx];
        ScoredDocument {
            text: entry.text.clone(),
            source: entry.source,
            original_question: entry.original_question.clone(),
            score,
        }
    }

    /// Indices and scores of the `k` nearest entries, best first
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scores: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.embedding)))
            .collect();

        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(k);
        scores
    }

    /// Top-`k` by cosine similarity
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Vec<ScoredDocument> {
        self.nearest(query, k)
            .into_iter()
            .map(|(i, score)| self.scored(i, score))
            .collect()
    }

    /// Maximal marginal relevance over the `fetch_k` nearest entries.
    ///
    /// Each step picks the candidate maximizing
    /// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, selected))`.
    pub fn mmr_search(&self, query: &[f32], k: usize, fetch_k: usize, lambda: f32) -> Vec<ScoredDocument> {
        let mut candidates = self.nearest(query, fetch_k.max(k));
        let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k);

        while selected.len() < k && !candidates.is_empty() {
            let mut best_pos = 0;
            let mut best_score = f32::NEG_INFINITY;

            for (pos, (idx, relevance)) in candidates.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|(s, _)| cosine_similarity(&self.entries[*idx].embedding, &self.entries[*s].embedding))
                    .fold(f32::NEG_INFINITY, f32::max);
                let redundancy = if selected.is_empty() { 0.0 } else { redundancy };

                let score = lambda * relevance - (1.0 - lambda) * redundancy;
                if score > best_score {
                    best_score = score;
                    best_pos = pos;
                }
            }

            selected.push(candidates.remove(best_pos));
        }

        selected
            .into_iter()
            .map(|(i, score)| self.scored(i, score))
            .collect()
    }

    /// Write the index atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(self)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let index: VectorIndex = serde_json::from_slice(&content)?;

        if let Some(bad) = index.entries.iter().find(|e| e.embedding.len() != index.dimension) {
            return Err(Error::VectorStore(format!(
                "entry '{}' has dimension {}, index expects {}",
                bad.original_question,
                bad.embedding.len(),
                index.dimension
            )));
        }
        Ok(index)
    }
}
