// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Spot prices in USD per troy ounce. `None` means the value could not be
/// fetched; that is distinct from a zero price and never aborts a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceSnapshot {
    pub gold_usd: Option<f64>,
    pub silver_usd: Option<f64>,
}

impl PriceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.gold_usd.is_none() && self.silver_usd.is_none()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,   // normalized headline, dedup key
    pub summary: String, // normalized description, may be empty
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String, // e.g., "Kitco"
}

#[async_trait::async_trait]
pub trait PriceProvider {
    async fn fetch_spot(&self) -> Result<PriceSnapshot>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait NewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &str;
}
