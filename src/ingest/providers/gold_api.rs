use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::ingest::types::{PriceProvider, PriceSnapshot};
use crate::retry::HttpCaller;

/// Secondary spot source, keyless, one GET per symbol (`/price/XAU` style).
/// A partial snapshot is fine; a symbol that fails stays `None`.
pub struct GoldApiProvider {
    caller: HttpCaller,
    base_url: String,
}

impl GoldApiProvider {
    pub fn new(caller: HttpCaller, base_url: String) -> Self {
        Self { caller, base_url }
    }

    async fn fetch_symbol(&self, symbol: &str) -> Result<f64> {
        #[derive(Deserialize)]
        struct PriceBody {
            price: f64,
        }

        let url = format!("{}/price/{}", self.base_url.trim_end_matches('/'), symbol);
        let resp = self
            .caller
            .execute(self.caller.client().get(&url), "spot-ticker")
            .await?;
        let body: PriceBody = resp
            .json()
            .await
            .with_context(|| format!("decoding spot ticker response for {symbol}"))?;
        Ok(body.price)
    }

    async fn fetch_optional(&self, symbol: &str) -> Option<f64> {
        match self.fetch_symbol(symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(error = ?e, symbol, "spot ticker symbol failed");
                None
            }
        }
    }
}

#[async_trait]
impl PriceProvider for GoldApiProvider {
    async fn fetch_spot(&self) -> Result<PriceSnapshot> {
        Ok(PriceSnapshot {
            gold_usd: self.fetch_optional("XAU").await,
            silver_usd: self.fetch_optional("XAG").await,
        })
    }

    fn name(&self) -> &'static str {
        "gold-api"
    }
}
