//! Final HTML assembly.
//!
//! Pure and deterministic: the same newsletter and snapshot always produce
//! the same document. The generated body fragment is trusted markup (already
//! normalized at the generation stage) and is embedded as-is; everything
//! else placed into the template is escaped here.

use html_escape::encode_text;

use crate::generate::Newsletter;
use crate::ingest::types::PriceSnapshot;

pub const PRICE_PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub subject: String,
    pub preheader: String,
    pub html: String,
}

pub fn fmt_price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2} USD"),
        None => PRICE_PLACEHOLDER.to_string(),
    }
}

pub fn render(newsletter: &Newsletter, prices: &PriceSnapshot) -> Document {
    let subject_html = encode_text(&newsletter.subject);
    let preheader_html = encode_text(&newsletter.preheader);
    let gold = fmt_price(prices.gold_usd);
    let silver = fmt_price(prices.silver_usd);
    let date = newsletter.generated_at.format("%Y-%m-%d");
    let body = &newsletter.body_html;

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="hu">
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"></head>
<body style="margin:0;padding:0;background:#f4f1ea;font-family:Georgia,'Times New Roman',serif;">
<div style="display:none;max-height:0;overflow:hidden;">{preheader_html}</div>
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f4f1ea;padding:24px 0;">
  <tr><td align="center">
    <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:6px;overflow:hidden;">
      <tr><td style="background:#1c1a17;color:#d4af37;padding:18px 24px;font-size:22px;font-weight:700;">{subject_html}</td></tr>
      <tr><td style="padding:16px 24px;border-bottom:1px solid #e8e2d6;">
        <table width="100%" cellpadding="0" cellspacing="0">
          <tr>
            <td style="color:#8a8576;font-size:13px;">Arany (XAU/USD)</td>
            <td align="right" style="font-weight:700;color:#1c1a17;">{gold}</td>
          </tr>
          <tr>
            <td style="color:#8a8576;font-size:13px;">Ez&uuml;st (XAG/USD)</td>
            <td align="right" style="font-weight:700;color:#1c1a17;">{silver}</td>
          </tr>
        </table>
      </td></tr>
      <tr><td style="padding:20px 24px;color:#33302a;font-size:15px;line-height:1.6;">
{body}
      </td></tr>
      <tr><td style="padding:14px 24px;border-top:1px solid #e8e2d6;">
        <p style="margin:0;color:#8a8576;font-size:12px;">
          Automatikus napi kiad&aacute;s &middot; {date}
          <br>Leiratkoz&aacute;s: {{$unsubscribe}}
        </p>
      </td></tr>
    </table>
  </td></tr>
</table>
</body>
</html>
"#
    );

    Document {
        subject: newsletter.subject.clone(),
        preheader: newsletter.preheader.clone(),
        html,
    }
}
