// tests/providers_rss.rs
use metals_newsletter::ingest::keywords::KeywordSet;
use metals_newsletter::ingest::providers::news_rss::RssNewsProvider;
use metals_newsletter::ingest::types::{NewsProvider, PriceProvider};
use metals_newsletter::ingest::SignalCollector;

const FIXTURE: &str = include_str!("fixtures/metals_news.xml");

#[tokio::test]
async fn fixture_feed_parses_all_items() {
    let provider = RssNewsProvider::from_fixture("Metals Desk", FIXTURE);
    let items = provider.fetch_latest().await.unwrap();

    assert_eq!(items.len(), 4);

    let first = &items[0];
    assert_eq!(first.title, "Gold climbs past resistance as dollar softens");
    assert_eq!(first.source, "Metals Desk");
    assert_eq!(
        first.url.as_deref(),
        Some("https://example.com/metals/gold-climbs")
    );
    // nbsp scrubbed, trailing period normalized away
    assert_eq!(
        first.summary,
        "Spot gold extended gains after a weaker dollar print"
    );
    assert_eq!(
        first.published_at.unwrap().to_rfc3339(),
        "2026-08-21T08:15:00+00:00"
    );
}

#[tokio::test]
async fn collector_over_fixture_filters_and_dedups() {
    let provider = RssNewsProvider::from_fixture("Metals Desk", FIXTURE);
    let collector = SignalCollector::new(
        Vec::<Box<dyn PriceProvider>>::new(),
        vec![Box::new(provider) as Box<dyn NewsProvider>],
        KeywordSet::new(vec!["gold".into(), "silver".into()]),
        20,
    );

    let news = collector.fetch_news().await;

    // duplicate gold headline collapsed, grains story filtered out
    assert_eq!(news.len(), 2);
    assert_eq!(news[0].url.as_deref(), Some("https://example.com/metals/gold-climbs"));
    assert_eq!(news[1].title, "Silver demand from solar sector hits record");
}

#[tokio::test]
async fn broken_xml_is_an_error_not_a_panic() {
    let provider = RssNewsProvider::from_fixture("Broken", "<rss><channel><item>");
    assert!(provider.fetch_latest().await.is_err());
}
