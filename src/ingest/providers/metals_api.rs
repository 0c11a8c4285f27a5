use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{PriceProvider, PriceSnapshot};
use crate::retry::HttpCaller;

/// metals-api style response: prices keyed by symbol under `rates`.
/// Values are passed through as delivered; unit interpretation is the
/// upstream account's concern.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Primary spot-price source. One GET for both symbols.
pub struct MetalsApiProvider {
    caller: HttpCaller,
    url: String,
    api_key: String,
}

impl MetalsApiProvider {
    pub fn new(caller: HttpCaller, url: String, api_key: String) -> Self {
        Self {
            caller,
            url,
            api_key,
        }
    }

    fn snapshot_from(rates: &HashMap<String, f64>) -> PriceSnapshot {
        PriceSnapshot {
            gold_usd: rates.get("XAU").copied(),
            silver_usd: rates.get("XAG").copied(),
        }
    }
}

#[async_trait]
impl PriceProvider for MetalsApiProvider {
    async fn fetch_spot(&self) -> Result<PriceSnapshot> {
        let request = self.caller.client().get(&self.url).query(&[
            ("access_key", self.api_key.as_str()),
            ("base", "USD"),
            ("symbols", "XAU,XAG"),
        ]);
        let resp = self.caller.execute(request, "metals-api").await?;
        let body: RatesResponse = resp
            .json()
            .await
            .context("decoding metals-api response")?;
        if body.success == Some(false) {
            return Err(anyhow!("metals-api reported failure"));
        }
        Ok(Self::snapshot_from(&body.rates))
    }

    fn name(&self) -> &'static str {
        "metals-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_both_symbols() {
        let rates = HashMap::from([("XAU".to_string(), 2412.5), ("XAG".to_string(), 29.1)]);
        let snap = MetalsApiProvider::snapshot_from(&rates);
        assert_eq!(snap.gold_usd, Some(2412.5));
        assert_eq!(snap.silver_usd, Some(29.1));
    }

    #[test]
    fn missing_symbols_stay_none() {
        let rates = HashMap::from([("XAU".to_string(), 2412.5)]);
        let snap = MetalsApiProvider::snapshot_from(&rates);
        assert_eq!(snap.silver_usd, None);
        assert!(!snap.is_empty());
        assert!(MetalsApiProvider::snapshot_from(&HashMap::new()).is_empty());
    }
}
