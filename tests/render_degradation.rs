// tests/render_degradation.rs
//
// The pipeline must produce a complete, sendable document even when the
// upstream signals degrade: no prices, unstructured completions, or both.
use chrono::{TimeZone, Utc};
use metals_newsletter::generate::{parse_newsletter, DEFAULT_SUBJECT};
use metals_newsletter::ingest::types::PriceSnapshot;
use metals_newsletter::render::{render, PRICE_PLACEHOLDER};

fn ts() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 21, 6, 0, 0).unwrap()
}

#[test]
fn unstructured_completion_and_no_prices_still_render() {
    let newsletter = parse_newsletter("A piac ma nyugodt volt, nagy mozgás nélkül.", ts());
    let doc = render(&newsletter, &PriceSnapshot::default());

    assert_eq!(doc.subject, DEFAULT_SUBJECT);
    assert!(doc.html.starts_with("<!DOCTYPE html>"));
    assert_eq!(doc.html.matches(PRICE_PLACEHOLDER).count(), 2);
    assert!(doc.html.contains("A piac ma nyugodt volt"));
    assert!(doc.html.contains("{$unsubscribe}"));
}

#[test]
fn partial_snapshot_renders_known_price_and_placeholder() {
    let newsletter = parse_newsletter("Tárgy\nElőnézet\n\n<p>törzs</p>", ts());
    let prices = PriceSnapshot {
        gold_usd: Some(2412.0),
        silver_usd: None,
    };
    let doc = render(&newsletter, &prices);

    assert!(doc.html.contains("2412.00 USD"));
    assert_eq!(doc.html.matches(PRICE_PLACEHOLDER).count(), 1);
    assert!(doc.html.contains("<p>törzs</p>"));
}

#[test]
fn empty_completion_text_still_yields_a_document() {
    let newsletter = parse_newsletter("", ts());
    let doc = render(&newsletter, &PriceSnapshot::default());

    assert_eq!(doc.subject, DEFAULT_SUBJECT);
    assert!(doc.html.contains("<p></p>"));
    assert!(doc.html.contains("2026-08-21"));
}

#[test]
fn preheader_lands_in_the_hidden_block_and_the_field() {
    let newsletter = parse_newsletter("Tárgy\nRövid előnézeti sor\n\n<p>törzs</p>", ts());
    let doc = render(&newsletter, &PriceSnapshot::default());

    assert_eq!(doc.preheader, "Rövid előnézeti sor");
    assert!(doc.html.contains("Rövid előnézeti sor"));
}
