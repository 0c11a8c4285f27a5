use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{NewsItem, NewsProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let parsed = OffsetDateTime::parse(ts, &Rfc2822).ok()?;
    let unix = parsed.to_offset(UtcOffset::UTC).unix_timestamp();
    DateTime::<Utc>::from_timestamp(unix, 0)
}

/// Generic RSS 2.0 headline source. The label doubles as the item source and
/// shows up in logs and the prompt.
pub struct RssNewsProvider {
    label: String,
    mode: Mode,
}

enum Mode {
    Http {
        url: String,
        client: reqwest::Client,
    },
    // Owned copy so tests can hand in decoded fixtures.
    Fixture(String),
}

impl RssNewsProvider {
    pub fn from_url(
        label: impl Into<String>,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            label: label.into(),
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn from_fixture(label: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mode: Mode::Fixture(xml.into()),
        }
    }

    fn parse_items(&self, xml: &str) -> Result<Vec<NewsItem>> {
        let cleaned = scrub_html_entities_for_xml(xml);
        let rss: Rss =
            from_str(&cleaned).with_context(|| format!("parsing {} rss xml", self.label))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = crate::ingest::normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let summary =
                crate::ingest::normalize_text(it.description.as_deref().unwrap_or_default());

            out.push(NewsItem {
                title,
                summary,
                url: it.link,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
                source: self.label.clone(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl NewsProvider for RssNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        match &self.mode {
            Mode::Fixture(xml) => self.parse_items(xml),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} rss get", self.label))?;
                let body = resp
                    .text()
                    .await
                    .with_context(|| format!("{} rss body", self.label))?;
                self.parse_items(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Feeds embed named HTML entities that XML parsers reject.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_dates_parse_to_utc() {
        let dt = parse_rfc2822("Fri, 21 Aug 2026 08:15:00 GMT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-08-21T08:15:00+00:00");
        assert!(parse_rfc2822("not a date").is_none());
    }

    #[test]
    fn entity_scrub_keeps_xml_parseable() {
        let xml = r#"<rss><channel><item><title>Gold &ndash; up&nbsp;again</title></item></channel></rss>"#;
        let provider = RssNewsProvider::from_fixture("Test", xml);
        let items = provider.parse_items(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Gold - up again");
    }
}
