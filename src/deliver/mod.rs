// src/deliver/mod.rs
pub mod mailerlite;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::DeliveryError;
use crate::render::Document;

/// Where a campaign goes: a provider-side group (broadcast) or one direct
/// address (safe/test sends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Group(String),
    Single(String),
}

/// Which API generation carried the send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEndpoint {
    Connect,
    Legacy,
}

impl std::fmt::Display for DeliveryEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryEndpoint::Connect => f.write_str("connect"),
            DeliveryEndpoint::Legacy => f.write_str("legacy"),
        }
    }
}

/// Proof of a confirmed send; the only thing that may trigger a state commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub campaign_id: String,
    pub endpoint: DeliveryEndpoint,
}

/// One concrete delivery shape (create/fill/send or single-call).
#[async_trait]
pub trait SendEndpoint {
    async fn deliver(
        &self,
        document: &Document,
        recipient: &Recipient,
    ) -> Result<DeliveryReceipt, DeliveryError>;

    fn name(&self) -> &'static str;
}

/// Campaign-level seam the job runner talks to.
#[async_trait]
pub trait CampaignDispatcher {
    async fn send(
        &self,
        document: &Document,
        recipient: &Recipient,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Tries the primary shape, then the alternate exactly once. Double failure
/// folds both messages into one terminal error.
pub struct Dispatcher<P, A> {
    primary: P,
    alternate: A,
}

impl<P, A> Dispatcher<P, A> {
    pub fn new(primary: P, alternate: A) -> Self {
        Self { primary, alternate }
    }
}

#[async_trait]
impl<P, A> CampaignDispatcher for Dispatcher<P, A>
where
    P: SendEndpoint + Send + Sync,
    A: SendEndpoint + Send + Sync,
{
    async fn send(
        &self,
        document: &Document,
        recipient: &Recipient,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let primary_err = match self.primary.deliver(document, recipient).await {
            Ok(receipt) => {
                info!(
                    endpoint = self.primary.name(),
                    campaign = %receipt.campaign_id,
                    "campaign sent"
                );
                return Ok(receipt);
            }
            Err(e) => e,
        };
        warn!(
            error = %primary_err,
            endpoint = self.primary.name(),
            "primary delivery failed, trying fallback"
        );

        match self.alternate.deliver(document, recipient).await {
            Ok(receipt) => {
                info!(
                    endpoint = self.alternate.name(),
                    campaign = %receipt.campaign_id,
                    "campaign sent via fallback"
                );
                Ok(receipt)
            }
            Err(fallback_err) => Err(DeliveryError::AllEndpointsFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }
}
