//! Runtime configuration, resolved exactly once at startup.
//!
//! `Config::from_env` is the only place that reads the environment; every
//! component downstream takes plain values. `.env` loading happens in `main`
//! before this runs.

use std::env;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::deliver::Recipient;
use crate::error::ConfigError;
use crate::ingest::keywords::{self, KeywordSet};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SENDER_EMAIL: &str = "noreply@example.com";
pub const DEFAULT_SENDER_NAME: &str = "AranyHír";
pub const DEFAULT_METALS_API_URL: &str = "https://metals-api.com/api/latest";
pub const DEFAULT_SPOT_API_URL: &str = "https://api.gold-api.com";
pub const DEFAULT_STATE_PATH: &str = "state/last_run.json";
pub const DEFAULT_KEYWORDS_PATH: &str = "config/keywords.toml";

const DEFAULT_NEWS_FEEDS: &[(&str, &str)] = &[
    ("Kitco", "https://www.kitco.com/rss/category/commentaries.xml"),
    ("Mining.com", "https://www.mining.com/feed/"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsFeed {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub model: String,
    pub mailerlite_api_key: String,
    pub recipient: Recipient,
    pub sender_email: String,
    pub sender_name: String,
    pub metals_api_key: Option<String>,
    pub metals_api_url: String,
    pub spot_api_url: String,
    pub news_feeds: Vec<NewsFeed>,
    pub keywords: KeywordSet,
    pub min_news_items: usize,
    pub max_news_items: usize,
    pub state_path: PathBuf,
    pub test_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = require("OPENAI_API_KEY")?;
        let mailerlite_api_key = require("MAILERLITE_API_KEY")?;
        let model = optional("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let test_mode = optional("TEST_MODE").map(|v| is_truthy(&v)).unwrap_or(false);
        let recipient = resolve_recipient(
            test_mode,
            optional("MAILERLITE_GROUP_ID"),
            optional("MAILERLITE_SUBSCRIBER_EMAIL"),
        )?;

        let news_feeds = match optional("NEWS_FEED_URLS") {
            Some(raw) => parse_feed_list(&raw)?,
            None => default_feeds(),
        };
        let keywords = load_keywords(optional("NEWS_KEYWORDS_PATH").map(PathBuf::from));

        Ok(Self {
            openai_api_key,
            model,
            mailerlite_api_key,
            recipient,
            sender_email: optional("SENDER_EMAIL")
                .unwrap_or_else(|| DEFAULT_SENDER_EMAIL.to_string()),
            sender_name: optional("SENDER_NAME").unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
            metals_api_key: optional("METALS_API_KEY"),
            metals_api_url: optional("METALS_API_URL")
                .unwrap_or_else(|| DEFAULT_METALS_API_URL.to_string()),
            spot_api_url: optional("SPOT_API_URL")
                .unwrap_or_else(|| DEFAULT_SPOT_API_URL.to_string()),
            news_feeds,
            keywords,
            min_news_items: parse_count("NEWS_MIN_ITEMS", 1)?,
            max_news_items: parse_count("NEWS_MAX_ITEMS", 20)?,
            state_path: optional("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            test_mode,
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn optional(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_count(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match optional(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
            var,
            reason: format!("not a number: {raw}"),
        }),
    }
}

/// Group id (broadcast) beats the single fallback address. Test mode ignores
/// the group and requires the safe single address, so a test run can never
/// reach the production list.
fn resolve_recipient(
    test_mode: bool,
    group: Option<String>,
    single: Option<String>,
) -> Result<Recipient, ConfigError> {
    if test_mode {
        return single
            .map(Recipient::Single)
            .ok_or(ConfigError::MissingVar("MAILERLITE_SUBSCRIBER_EMAIL"));
    }
    if let Some(id) = group {
        return Ok(Recipient::Group(id));
    }
    if let Some(email) = single {
        return Ok(Recipient::Single(email));
    }
    Err(ConfigError::NoRecipient)
}

/// `NEWS_FEED_URLS` format: comma-separated `Label=url` entries. A bare url
/// gets a label derived from its host.
fn parse_feed_list(raw: &str) -> Result<Vec<NewsFeed>, ConfigError> {
    let mut feeds = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (label, url) = match entry.split_once('=') {
            Some((label, url)) if !url.trim().is_empty() && !label.contains("://") => {
                (label.trim().to_string(), url.trim().to_string())
            }
            _ if entry.contains("://") => (derive_label(entry), entry.to_string()),
            _ => {
                return Err(ConfigError::InvalidVar {
                    var: "NEWS_FEED_URLS",
                    reason: format!("bad entry: {entry}"),
                })
            }
        };
        feeds.push(NewsFeed { label, url });
    }
    if feeds.is_empty() {
        return Err(ConfigError::InvalidVar {
            var: "NEWS_FEED_URLS",
            reason: "no feeds configured".to_string(),
        });
    }
    Ok(feeds)
}

fn derive_label(url: &str) -> String {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .map(|host| host.trim_start_matches("www.").to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "Feed".to_string())
}

fn default_feeds() -> Vec<NewsFeed> {
    DEFAULT_NEWS_FEEDS
        .iter()
        .map(|(label, url)| NewsFeed {
            label: (*label).to_string(),
            url: (*url).to_string(),
        })
        .collect()
}

/// An unusable keyword file degrades to the built-in list with a warning;
/// a broken filter must not block the day's issue.
fn load_keywords(explicit: Option<PathBuf>) -> KeywordSet {
    if let Some(path) = explicit {
        match keywords::load_keywords_from(&path) {
            Ok(set) => return set,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "keyword file unusable, using built-in list");
                return KeywordSet::builtin();
            }
        }
    }
    let default = Path::new(DEFAULT_KEYWORDS_PATH);
    if default.exists() {
        match keywords::load_keywords_from(default) {
            Ok(set) => return set,
            Err(e) => {
                warn!(error = %e, "default keyword file unusable, using built-in list");
            }
        }
    }
    KeywordSet::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_group_beats_single() {
        let r = resolve_recipient(false, Some("123".into()), Some("a@b.hu".into())).unwrap();
        assert_eq!(r, Recipient::Group("123".into()));
    }

    #[test]
    fn recipient_single_is_fallback() {
        let r = resolve_recipient(false, None, Some("a@b.hu".into())).unwrap();
        assert_eq!(r, Recipient::Single("a@b.hu".into()));
    }

    #[test]
    fn recipient_missing_is_config_error() {
        assert!(matches!(
            resolve_recipient(false, None, None),
            Err(ConfigError::NoRecipient)
        ));
    }

    #[test]
    fn test_mode_never_targets_the_group() {
        let r = resolve_recipient(true, Some("123".into()), Some("safe@b.hu".into())).unwrap();
        assert_eq!(r, Recipient::Single("safe@b.hu".into()));

        assert!(matches!(
            resolve_recipient(true, Some("123".into()), None),
            Err(ConfigError::MissingVar("MAILERLITE_SUBSCRIBER_EMAIL"))
        ));
    }

    #[test]
    fn feed_list_parses_labels_and_bare_urls() {
        let feeds =
            parse_feed_list("Kitco=https://kitco.com/rss, https://www.mining.com/feed/").unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].label, "Kitco");
        assert_eq!(feeds[1].label, "mining.com");
        assert_eq!(feeds[1].url, "https://www.mining.com/feed/");
    }

    #[test]
    fn feed_url_with_query_equals_survives() {
        let feeds = parse_feed_list("https://example.com/rss?fmt=xml&lang=hu").unwrap();
        assert_eq!(feeds[0].url, "https://example.com/rss?fmt=xml&lang=hu");
        assert_eq!(feeds[0].label, "example.com");
    }

    #[test]
    fn bad_feed_entry_is_rejected() {
        assert!(parse_feed_list("garbage").is_err());
        assert!(parse_feed_list("").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn from_env_requires_credentials() {
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("MAILERLITE_API_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar("OPENAI_API_KEY"))
        ));
    }

    #[serial_test::serial]
    #[test]
    fn from_env_applies_defaults() {
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("MAILERLITE_API_KEY", "ml-test");
        env::set_var("MAILERLITE_GROUP_ID", "42");
        env::remove_var("MODEL");
        env::remove_var("NEWS_FEED_URLS");
        env::remove_var("NEWS_MIN_ITEMS");
        env::remove_var("TEST_MODE");
        env::remove_var("MAILERLITE_SUBSCRIBER_EMAIL");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.recipient, Recipient::Group("42".into()));
        assert_eq!(cfg.min_news_items, 1);
        assert_eq!(cfg.max_news_items, 20);
        assert_eq!(cfg.news_feeds.len(), 2);
        assert_eq!(cfg.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert!(!cfg.test_mode);

        env::remove_var("OPENAI_API_KEY");
        env::remove_var("MAILERLITE_API_KEY");
        env::remove_var("MAILERLITE_GROUP_ID");
    }
}
