//! Q&A corpus loading
//!
//! The corpus is three static JSON files, each an array of
//! `{"question": ..., "answer": ...}` objects. Records are validated,
//! tagged with their source and deduplicated by question.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Tripadvisor,
    GovFaq,
    Blog,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Tripadvisor, Source::GovFaq, Source::Blog];

    /// File name of this source under the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Source::Tripadvisor => "tripadvisor_forum.json",
            Source::GovFaq => "tourism_faq_gov.json",
            Source::Blog => "local_blog_etiquette.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Tripadvisor => "tripadvisor",
            Source::GovFaq => "gov_faq",
            Source::Blog => "blog",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw entry as found in the JSON files
#[derive(Debug, Deserialize)]
struct RawEntry {
    question: Option<String>,
    answer: Option<String>,
}

/// A validated question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub source: Source,
}

impl QaRecord {
    /// Text stored in the vector index
    pub fn document_text(&self) -> String {
        format!("QUESTION: {}\nANSWER: {}", self.question, self.answer)
    }

    /// Both fields present with a question of at least 5 and an answer of
    /// at least 10 characters after trimming
    pub fn is_valid(&self) -> bool {
        self.question.trim().chars().count() >= 5 && self.answer.trim().chars().count() >= 10
    }
}

/// Parse one source file. Unreadable or malformed files yield no records.
pub fn load_file(path: &Path, source: Source) -> Vec<QaRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Error loading {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let entries: Vec<RawEntry> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error loading {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match (entry.question, entry.answer) {
            (Some(question), Some(answer)) => Some(QaRecord {
                question,
                answer,
                source,
            }),
            _ => None,
        })
        .collect()
}

/// Drop invalid records and repeated questions (case-insensitive, trimmed),
/// keeping the first occurrence
pub fn deduplicate(records: Vec<QaRecord>) -> Vec<QaRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| record.is_valid())
        .filter(|record| seen.insert(record.question.trim().to_lowercase()))
        .collect()
}

/// Load every source file under `data_dir`
pub fn load_corpus(data_dir: &Path) -> Vec<QaRecord> {
    let mut all = Vec::new();
    for source in Source::ALL {
        let records = load_file(&data_dir.join(source.file_name()), source);
        info!("Loaded {} records from {}", records.len(), source);
        all.extend(records);
    }

    let unique = deduplicate(all);
    info!("Corpus contains {} unique Q&A records", unique.len());
    unique
}
