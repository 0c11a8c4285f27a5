// src/ingest/mod.rs
pub mod keywords;
pub mod providers;
pub mod types;

use std::collections::HashSet;

use strsim::normalized_levenshtein;
use tracing::{debug, warn};

use crate::ingest::keywords::KeywordSet;
use crate::ingest::types::{NewsItem, NewsProvider, PriceProvider, PriceSnapshot};

/// Titles closer than this (normalized Levenshtein) count as the same story.
pub const SIMILARITY_THRESHOLD: f64 = 0.90;

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Normalize both text fields, keep keyword matches, drop repeated titles
/// (first occurrence wins, order preserved), cap the result.
/// Returns (kept, filtered_count, dedup_count).
pub fn filter_dedup_cap(
    raw_items: Vec<NewsItem>,
    keywords: &KeywordSet,
    cap: usize,
) -> (Vec<NewsItem>, usize, usize) {
    let mut filtered_out = 0usize;
    let mut filtered = Vec::with_capacity(raw_items.len());
    for mut item in raw_items {
        item.title = normalize_text(&item.title);
        item.summary = normalize_text(&item.summary);
        let haystack = format!("{} {}", item.title, item.summary);
        let keep = !item.title.is_empty() && keywords.matches(&haystack);
        if !keep {
            filtered_out += 1;
            continue;
        }
        filtered.push(item);
    }

    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(filtered.len());
    let mut dedup_out = 0usize;
    for item in filtered {
        if !seen_titles.insert(item.title.clone()) {
            dedup_out += 1;
            continue;
        }
        kept.push(item);
    }
    kept.truncate(cap);

    (kept, filtered_out, dedup_out)
}

/// Pick the headlines worth showing the model: most keyword hits first,
/// newer on ties, near-duplicates of an already picked title skipped.
pub fn select_for_prompt(items: &[NewsItem], keywords: &KeywordSet, limit: usize) -> Vec<NewsItem> {
    let mut order: Vec<(usize, usize, i64)> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let hits = keywords.hit_count(&format!("{} {}", item.title, item.summary));
            let ts = item.published_at.map(|d| d.timestamp()).unwrap_or(0);
            (idx, hits, ts)
        })
        .collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));

    let mut picked: Vec<NewsItem> = Vec::with_capacity(limit);
    for (idx, _, _) in order {
        if picked.len() >= limit {
            break;
        }
        let candidate = &items[idx];
        let candidate_lower = candidate.title.to_lowercase();
        let near_dup = picked.iter().any(|p| {
            normalized_levenshtein(&p.title.to_lowercase(), &candidate_lower)
                >= SIMILARITY_THRESHOLD
        });
        if near_dup {
            continue;
        }
        picked.push(candidate.clone());
    }
    picked
}

/// Gathers the run's inputs: one spot-price snapshot and the filtered,
/// deduplicated news list. Provider failures are logged and absorbed here;
/// this stage never fails the run.
pub struct SignalCollector {
    price_providers: Vec<Box<dyn PriceProvider>>,
    news_providers: Vec<Box<dyn NewsProvider>>,
    keywords: KeywordSet,
    max_news_items: usize,
}

impl SignalCollector {
    pub fn new(
        price_providers: Vec<Box<dyn PriceProvider>>,
        news_providers: Vec<Box<dyn NewsProvider>>,
        keywords: KeywordSet,
        max_news_items: usize,
    ) -> Self {
        Self {
            price_providers,
            news_providers,
            keywords,
            max_news_items,
        }
    }

    /// Providers are tried in priority order; the first non-empty snapshot
    /// wins and later providers are not consulted. No merging across sources.
    pub async fn fetch_prices(&self) -> PriceSnapshot {
        for provider in &self.price_providers {
            match provider.fetch_spot().await {
                Ok(snapshot) if !snapshot.is_empty() => {
                    debug!(
                        provider = provider.name(),
                        gold = ?snapshot.gold_usd,
                        silver = ?snapshot.silver_usd,
                        "spot prices fetched"
                    );
                    return snapshot;
                }
                Ok(_) => warn!(provider = provider.name(), "provider returned no prices"),
                Err(e) => warn!(error = ?e, provider = provider.name(), "price provider error"),
            }
        }
        PriceSnapshot::default()
    }

    pub async fn fetch_news(&self) -> Vec<NewsItem> {
        let mut raw = Vec::new();
        for provider in &self.news_providers {
            match provider.fetch_latest().await {
                Ok(mut items) => raw.append(&mut items),
                Err(e) => warn!(error = ?e, provider = provider.name(), "news provider error"),
            }
        }

        let total = raw.len();
        let (kept, filtered, deduped) = filter_dedup_cap(raw, &self.keywords, self.max_news_items);
        debug!(
            total,
            kept = kept.len(),
            filtered,
            deduped,
            "news pipeline finished"
        );
        kept
    }

    pub fn select_for_prompt(&self, items: &[NewsItem], limit: usize) -> Vec<NewsItem> {
        select_for_prompt(items, &self.keywords, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(title: &str, summary: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            summary: summary.to_string(),
            url: None,
            published_at: None,
            source: "Test".to_string(),
        }
    }

    #[test]
    fn normalize_text_collapses_ws_and_punct() {
        let s = "  Hello,&nbsp;&nbsp; world!!!  ";
        let out = normalize_text(s);
        assert_eq!(out, "Hello, world");
    }

    #[test]
    fn normalize_text_strips_tags() {
        let s = "<p>Gold <b>rallies</b></p>";
        assert_eq!(normalize_text(s), "Gold rallies");
    }

    #[test]
    fn filter_drops_offtopic_and_empty_titles() {
        let keywords = KeywordSet::new(vec!["gold".into()]);
        let raw = vec![
            item("Gold hits new high", ""),
            item("Corn futures slide", ""),
            item("   ", "summary without a headline"),
        ];
        let (kept, filtered, deduped) = filter_dedup_cap(raw, &keywords, 20);
        assert_eq!(kept.len(), 1);
        assert_eq!(filtered, 2);
        assert_eq!(deduped, 0);
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let keywords = KeywordSet::default();
        let raw = vec![
            item("Gold steady", "first copy"),
            item("Silver up", ""),
            item("Gold steady.", "syndicated copy, same title after normalization"),
        ];
        let (kept, _filtered, deduped) = filter_dedup_cap(raw, &keywords, 20);
        assert_eq!(deduped, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].summary, "first copy");
        assert_eq!(kept[1].title, "Silver up");
    }

    #[test]
    fn cap_truncates_after_dedup() {
        let keywords = KeywordSet::default();
        let raw = (0..6).map(|i| item(&format!("Headline {i}"), "")).collect();
        let (kept, _, _) = filter_dedup_cap(raw, &keywords, 3);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].title, "Headline 0");
    }

    #[test]
    fn select_prefers_keyword_hits_then_recency() {
        let keywords = KeywordSet::new(vec!["gold".into(), "silver".into()]);
        let old = Utc.with_ymd_and_hms(2026, 8, 20, 8, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2026, 8, 21, 8, 0, 0).unwrap();

        let mut a = item("Gold and silver both rally", "");
        a.published_at = Some(old);
        let mut b = item("Gold drifts", "");
        b.published_at = Some(new);
        let mut c = item("Market note", "");
        c.published_at = Some(new);

        let picked = select_for_prompt(&[c, b, a], &keywords, 2);
        assert_eq!(picked[0].title, "Gold and silver both rally");
        assert_eq!(picked[1].title, "Gold drifts");
    }

    #[test]
    fn select_skips_near_duplicate_titles() {
        let keywords = KeywordSet::new(vec!["gold".into()]);
        let a = item("Gold climbs past resistance as dollar softens", "");
        let b = item("Gold climbs past resistance as dollar softens!", "");
        let c = item("Gold miners report record quarter", "");

        let picked = select_for_prompt(&[a, b, c], &keywords, 3);
        assert_eq!(picked.len(), 2);
    }
}
