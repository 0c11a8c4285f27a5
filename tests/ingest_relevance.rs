// tests/ingest_relevance.rs
use chrono::{TimeZone, Utc};
use metals_newsletter::ingest::keywords::KeywordSet;
use metals_newsletter::ingest::select_for_prompt;
use metals_newsletter::ingest::types::NewsItem;

fn item(title: &str, summary: &str, source: &str) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        summary: summary.to_string(),
        url: None,
        published_at: None,
        source: source.to_string(),
    }
}

#[test]
fn near_duplicate_skip_does_not_starve_the_limit() {
    let keywords = KeywordSet::new(vec!["gold".into(), "silver".into()]);
    let t = |h| Utc.with_ymd_and_hms(2026, 8, 21, h, 0, 0).unwrap();

    let mut a = item("Gold surges on safe haven flows", "", "Kitco");
    a.published_at = Some(t(9));
    let mut b = item("Gold surges on safe-haven flows", "", "Mining.com");
    b.published_at = Some(t(8));
    let mut c = item("Silver lags the rally", "", "Kitco");
    c.published_at = Some(t(7));

    let picked = select_for_prompt(&[a, b, c], &keywords, 2);
    assert_eq!(picked.len(), 2);
    assert_eq!(picked[0].title, "Gold surges on safe haven flows");
    assert_eq!(picked[1].title, "Silver lags the rally");
}

#[test]
fn undated_items_rank_behind_dated_ones_on_hit_ties() {
    let keywords = KeywordSet::new(vec!["gold".into()]);
    let dated = {
        let mut i = item("Gold firm ahead of data", "", "Kitco");
        i.published_at = Some(Utc.with_ymd_and_hms(2026, 8, 21, 6, 0, 0).unwrap());
        i
    };
    let undated = item("Gold miners in focus", "", "Mining.com");

    let picked = select_for_prompt(&[undated.clone(), dated.clone()], &keywords, 2);
    assert_eq!(picked[0].title, dated.title);
    assert_eq!(picked[1].title, undated.title);
}

#[test]
fn limit_is_respected() {
    let keywords = KeywordSet::new(vec!["gold".into()]);
    let titles = [
        "Gold climbs past resistance",
        "Central bank buying accelerates",
        "Mining output slips in Peru",
        "Dollar index retreats",
        "ETF inflows turn positive",
    ];
    let items: Vec<NewsItem> = titles.iter().map(|t| item(t, "", "Kitco")).collect();
    let picked = select_for_prompt(&items, &keywords, 3);
    assert_eq!(picked.len(), 3);
}
