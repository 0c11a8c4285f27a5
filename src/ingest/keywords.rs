// src/ingest/keywords.rs
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Built-in relevance terms, used when no keyword file is configured.
/// Hungarian terms appear both accented and unaccented; feeds are inconsistent.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "arany",
    "ezüst",
    "ezust",
    "gold",
    "silver",
    "xau",
    "xag",
    "bullion",
    "precious metal",
    "nemesfém",
    "nemesfem",
    "mining",
    "comex",
    "fed",
    "inflation",
    "infláció",
    "inflacio",
    "dollár",
    "dollar",
    "ounce",
    "unca",
    "central bank",
    "jegybank",
];

/// Case-insensitive substring matcher over a term list. An empty set keeps
/// everything; the filter only acts when terms exist.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    pub fn new(terms: Vec<String>) -> Self {
        let terms = terms
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let hay = text.to_lowercase();
        self.terms.iter().any(|t| hay.contains(t.as_str()))
    }

    /// Number of distinct terms found; used for prompt ranking.
    pub fn hit_count(&self, text: &str) -> usize {
        let hay = text.to_lowercase();
        self.terms.iter().filter(|t| hay.contains(t.as_str())).count()
    }
}

/// Load terms from a TOML file with a single `keywords = [...]` array.
pub fn load_keywords_from(path: &Path) -> Result<KeywordSet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading keywords from {}", path.display()))?;

    #[derive(serde::Deserialize)]
    struct KeywordFile {
        keywords: Vec<String>,
    }

    let parsed: KeywordFile = toml::from_str(&content)
        .with_context(|| format!("parsing keywords from {}", path.display()))?;
    Ok(KeywordSet::new(parsed.keywords))
}
