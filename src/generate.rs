//! Newsletter generation via chat completions.
//!
//! The model is asked for a fixed shape: subject line, preheader line, then
//! an HTML-fragment body. Parsing of the completion is total; a malformed
//! completion degrades to defaults instead of failing the run. Only an empty
//! completion or an exhausted call budget is fatal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::ingest::types::{NewsItem, PriceSnapshot};
use crate::retry::HttpCaller;

pub const DEFAULT_SUBJECT: &str = "Arany és ezüst piaci összefoglaló";
pub const DEFAULT_PREHEADER: &str = "Napi áttekintés a nemesfémpiacról.";

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "Te egy tömör, magyar nyelvű pénzügyi hírlevél szerkesztője vagy, \
az arany- és ezüstpiacra szakosodva. A kimenet felépítése kötött: az első sor a tárgysor \
(címke nélkül), a második sor egy rövid előnézeti szöveg, majd üres sor után a hírlevél \
törzse HTML-részletként (<h2>, <p>, <ul> elemekkel). Legfeljebb 600 szó. Mindig hivatkozz \
a megadott árfolyamadatokra, és soha ne találj ki számokat.";

/// One generated issue. `generated_at` is fixed at creation so rendering
/// stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Newsletter {
    pub subject: String,
    pub preheader: String,
    pub body_html: String,
    pub generated_at: DateTime<Utc>,
}

#[async_trait]
pub trait NewsletterGenerator {
    async fn generate(
        &self,
        prices: &PriceSnapshot,
        news: &[NewsItem],
    ) -> Result<Newsletter, GenerationError>;
}

/// Chat-completions backed generator.
pub struct OpenAiGenerator {
    caller: HttpCaller,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(caller: HttpCaller, api_key: String, model: String) -> Self {
        Self {
            caller,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl NewsletterGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        prices: &PriceSnapshot,
        news: &[NewsItem],
    ) -> Result<Newsletter, GenerationError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let user = build_user_prompt(prices, news);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.4,
            max_tokens: 900,
        };

        let request = self
            .caller
            .client()
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&req);
        let resp = self.caller.execute(request, "chat-completions").await?;
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        Ok(parse_newsletter(&content, Utc::now()))
    }
}

fn fmt_price_for_prompt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2} USD"),
        None => "nem elérhető".to_string(),
    }
}

fn build_user_prompt(prices: &PriceSnapshot, news: &[NewsItem]) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    out.push_str("Mai piaci adatok:\n");
    let _ = writeln!(
        out,
        "- Arany (XAU/USD): {}",
        fmt_price_for_prompt(prices.gold_usd)
    );
    let _ = writeln!(
        out,
        "- Ezüst (XAG/USD): {}",
        fmt_price_for_prompt(prices.silver_usd)
    );

    out.push_str("\nFriss hírek:\n");
    if news.is_empty() {
        out.push_str("- (nincs friss hír)\n");
    }
    for item in news {
        let date = item
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "n. a.".to_string());
        let _ = writeln!(out, "- [{date}] {} ({})", item.title, item.source);
    }

    out.push_str("\nÍrd meg a mai hírlevelet a fenti adatok alapján.");
    out
}

/// Total parse of a completion: the first two non-empty lines become subject
/// and preheader, the remainder the body (blank lines preserved). Anything
/// less structured falls back to defaults with the whole text as body.
pub fn parse_newsletter(text: &str, generated_at: DateTime<Utc>) -> Newsletter {
    let lines: Vec<&str> = text.lines().collect();

    let mut subject: Option<String> = None;
    let mut preheader: Option<String> = None;
    let mut body_start = lines.len();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if subject.is_none() {
            subject = Some(strip_label(trimmed, &["subject:", "tárgy:", "targy:"]).to_string());
        } else {
            preheader =
                Some(strip_label(trimmed, &["preheader:", "előnézet:", "elonezet:"]).to_string());
            body_start = i + 1;
            break;
        }
    }

    let body_raw = lines
        .get(body_start..)
        .map(|rest| rest.join("\n"))
        .unwrap_or_default();
    let body_raw = body_raw.trim();

    match (subject, preheader) {
        (Some(subject), Some(preheader)) if !body_raw.is_empty() && !subject.is_empty() => {
            Newsletter {
                subject,
                preheader,
                body_html: ensure_html(body_raw),
                generated_at,
            }
        }
        _ => Newsletter {
            subject: DEFAULT_SUBJECT.to_string(),
            preheader: DEFAULT_PREHEADER.to_string(),
            body_html: ensure_html(text.trim()),
            generated_at,
        },
    }
}

/// Strips a leading label like `Tárgy:` case-insensitively. Falls through
/// untouched when the byte offset after the label is not a char boundary.
fn strip_label<'a>(line: &'a str, labels: &[&str]) -> &'a str {
    let lower = line.to_lowercase();
    for label in labels {
        if lower.starts_with(label) && line.is_char_boundary(label.len()) {
            return line[label.len()..].trim_start();
        }
    }
    line
}

/// Bodies that come back as plain text are wrapped in paragraph markup with
/// escaped text; bodies that already look like markup pass through unchanged.
pub fn ensure_html(body: &str) -> String {
    if looks_like_html(body) {
        body.to_string()
    } else {
        wrap_plain_text(body)
    }
}

fn looks_like_html(body: &str) -> bool {
    body.chars().take(20).any(|c| c == '<')
}

fn wrap_plain_text(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 64);
    for paragraph in body.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        out.push_str("<p>");
        let mut first = true;
        for line in paragraph.lines() {
            if !first {
                out.push_str("<br/>");
            }
            out.push_str(&html_escape::encode_text(line.trim()));
            first = false;
        }
        out.push_str("</p>\n");
    }
    if out.is_empty() {
        out.push_str("<p></p>\n");
    }
    out
}
