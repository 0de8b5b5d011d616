//! Vector store over the Q&A corpus
//!
//! - [`embedder`]: text → vector backends (local hashing, HTTP)
//! - [`index`]: in-memory cosine index with similarity and MMR search
//! - [`store`]: load-or-build wrapper used by the RAG service

pub mod embedder;
pub mod index;
pub mod store;

pub use embedder::{build_embedder, Embedder, HashingEmbedder, HttpEmbedder};
pub use index::{cosine_similarity, IndexEntry, ScoredDocument, VectorIndex};
pub use store::{VectorStore, COLLECTION_NAME};
