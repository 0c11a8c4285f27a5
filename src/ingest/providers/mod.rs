// src/ingest/providers/mod.rs
pub mod gold_api;
pub mod metals_api;
pub mod news_rss;
