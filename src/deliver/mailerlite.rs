//! MailerLite delivery, both API generations.
//!
//! Connect (current) is a three-step shape: create the campaign, upload its
//! content, trigger the send. Legacy (v2) is a single call with the HTML
//! inline. Both extract the campaign id from `data.id` or `id`, string or
//! number.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::render::Document;
use crate::retry::HttpCaller;

use super::{DeliveryEndpoint, DeliveryReceipt, Recipient, SendEndpoint};

pub const CONNECT_BASE: &str = "https://connect.mailerlite.com/api";
pub const LEGACY_BASE: &str = "https://api.mailerlite.com/api/v2";

#[derive(Debug, Clone)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

/// Plumbing shared by both endpoint generations: authenticated JSON calls
/// through the resilient caller.
#[derive(Clone)]
pub struct MailerLiteApi {
    caller: HttpCaller,
    api_key: String,
}

impl MailerLiteApi {
    pub fn new(caller: HttpCaller, api_key: String) -> Self {
        Self { caller, api_key }
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        label: &'static str,
    ) -> Result<Value, DeliveryError> {
        let request = self
            .caller
            .client()
            .post(url)
            .bearer_auth(&self.api_key)
            .json(payload);
        let resp = self.caller.execute(request, label).await?;
        decode_json(resp, label).await
    }

    async fn put_json(
        &self,
        url: &str,
        payload: &Value,
        label: &'static str,
    ) -> Result<Value, DeliveryError> {
        let request = self
            .caller
            .client()
            .put(url)
            .bearer_auth(&self.api_key)
            .json(payload);
        let resp = self.caller.execute(request, label).await?;
        decode_json(resp, label).await
    }
}

/// Send endpoints may reply with an empty body on success.
async fn decode_json(resp: reqwest::Response, label: &'static str) -> Result<Value, DeliveryError> {
    let text = resp
        .text()
        .await
        .map_err(|e| DeliveryError::Decode(format!("{label}: {e}")))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| DeliveryError::Decode(format!("{label}: {e}")))
}

fn extract_campaign_id(value: &Value) -> Option<String> {
    let node = value
        .get("data")
        .and_then(|d| d.get("id"))
        .or_else(|| value.get("id"))?;
    match node {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Digit-only group ids go out as JSON numbers, anything else as strings.
fn group_json(id: &str) -> Value {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        match id.parse::<u64>() {
            Ok(n) => json!(n),
            Err(_) => json!(id),
        }
    } else {
        json!(id)
    }
}

/// Current-generation endpoint: POST /campaigns, PUT content, POST send.
pub struct MailerLiteConnect {
    api: MailerLiteApi,
    sender: Sender,
}

impl MailerLiteConnect {
    pub fn new(api: MailerLiteApi, sender: Sender) -> Self {
        Self { api, sender }
    }

    /// One-shot, best-effort profile upsert before a single-address send.
    /// Rejections are logged and the send proceeds; campaign targeting
    /// tolerates an already existing profile.
    async fn upsert_subscriber(&self, email: &str) {
        let url = format!("{}/subscribers", CONNECT_BASE);
        let result = self
            .api
            .caller
            .client()
            .post(&url)
            .bearer_auth(&self.api.api_key)
            .json(&json!({ "email": email }))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(email, "subscriber profile upserted");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "subscriber upsert rejected, sending anyway");
            }
            Err(e) => warn!(error = %e, "subscriber upsert failed, sending anyway"),
        }
    }
}

#[async_trait::async_trait]
impl SendEndpoint for MailerLiteConnect {
    async fn deliver(
        &self,
        document: &Document,
        recipient: &Recipient,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        if let Recipient::Single(email) = recipient {
            self.upsert_subscriber(email).await;
        }

        let created = self
            .api
            .post_json(
                &format!("{}/campaigns", CONNECT_BASE),
                &json!({
                    "name": document.subject,
                    "type": "regular",
                    "subject": document.subject,
                    "from": { "email": self.sender.email, "name": self.sender.name },
                }),
                "campaign-create",
            )
            .await?;
        let campaign_id = extract_campaign_id(&created).ok_or_else(|| {
            DeliveryError::UnexpectedResponse("campaign create response carries no id".to_string())
        })?;

        self.api
            .put_json(
                &format!("{}/campaigns/{}/content", CONNECT_BASE, campaign_id),
                &json!({ "html": document.html, "plain": document.preheader }),
                "campaign-content",
            )
            .await?;

        let target = match recipient {
            Recipient::Group(id) => json!({ "groups": [group_json(id)] }),
            Recipient::Single(email) => json!({ "emails": [email] }),
        };
        self.api
            .post_json(
                &format!("{}/campaigns/{}/actions/send", CONNECT_BASE, campaign_id),
                &target,
                "campaign-send",
            )
            .await?;

        Ok(DeliveryReceipt {
            campaign_id,
            endpoint: DeliveryEndpoint::Connect,
        })
    }

    fn name(&self) -> &'static str {
        "mailerlite-connect"
    }
}

/// Legacy v2 endpoint: one POST with the HTML inline. By the time the call
/// returns 2xx the campaign is out, so a response without an id still counts
/// as delivered.
pub struct MailerLiteLegacy {
    api: MailerLiteApi,
    sender: Sender,
}

impl MailerLiteLegacy {
    pub fn new(api: MailerLiteApi, sender: Sender) -> Self {
        Self { api, sender }
    }
}

#[async_trait::async_trait]
impl SendEndpoint for MailerLiteLegacy {
    async fn deliver(
        &self,
        document: &Document,
        recipient: &Recipient,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let mut payload = json!({
            "type": "regular",
            "subject": document.subject,
            "from": self.sender.email,
            "from_name": self.sender.name,
            "html": document.html,
            "plain": document.preheader,
        });
        match recipient {
            Recipient::Group(id) => {
                payload["groups"] = json!([group_json(id)]);
            }
            Recipient::Single(email) => {
                payload["emails"] = json!([email]);
            }
        }

        let created = self
            .api
            .post_json(
                &format!("{}/campaigns/send", LEGACY_BASE),
                &payload,
                "legacy-campaign-send",
            )
            .await?;
        let campaign_id =
            extract_campaign_id(&created).unwrap_or_else(|| "unrecorded".to_string());

        Ok(DeliveryReceipt {
            campaign_id,
            endpoint: DeliveryEndpoint::Legacy,
        })
    }

    fn name(&self) -> &'static str {
        "mailerlite-legacy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_id_from_connect_and_legacy_shapes() {
        let connect = json!({ "data": { "id": "abc123" } });
        assert_eq!(extract_campaign_id(&connect).as_deref(), Some("abc123"));

        let legacy = json!({ "id": 4521 });
        assert_eq!(extract_campaign_id(&legacy).as_deref(), Some("4521"));

        assert_eq!(extract_campaign_id(&json!({ "ok": true })), None);
        assert_eq!(extract_campaign_id(&json!({ "data": { "id": "" } })), None);
        assert_eq!(extract_campaign_id(&Value::Null), None);
    }

    #[test]
    fn group_ids_go_numeric_only_when_digits() {
        assert_eq!(group_json("12345"), json!(12345));
        assert_eq!(group_json("vip-readers"), json!("vip-readers"));
        assert_eq!(group_json(""), json!(""));
    }
}
