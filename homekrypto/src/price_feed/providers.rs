//! Market-data providers for the HKT price.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

use super::errors::{PriceFeedError, PriceFeedResult};
use super::models::HktPriceSnapshot;

/// Source of HKT market data
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short provider name used in logs and on stored records
    fn name(&self) -> &str;

    /// Fetch the current market record
    async fn fetch(&self) -> PriceFeedResult<HktPriceSnapshot>;
}

fn malformed(provider: &str, reason: impl Into<String>) -> PriceFeedError {
    PriceFeedError::MalformedResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}

/// Read a number that providers encode either as JSON number or string
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn checked_price(provider: &str, price: Option<f64>) -> PriceFeedResult<f64> {
    let price = price.ok_or_else(|| malformed(provider, "missing USD price"))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(PriceFeedError::InvalidPrice {
            provider: provider.to_string(),
            price,
        });
    }
    Ok(price)
}

async fn get_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
) -> PriceFeedResult<Value> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PriceFeedError::UnexpectedStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.json().await?)
}

/// CoinGecko `/simple/price` quote with market cap, volume and 24h change
pub struct CoinGeckoProvider {
    base_url: String,
    token_id: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub const NAME: &'static str = "coingecko";

    pub fn new(
        base_url: impl Into<String>,
        token_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_id: token_id.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Parse a `/simple/price` body, which is keyed by coin id.
    /// That endpoint carries no supply figure.
    pub fn parse(
        body: &Value,
        token_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> PriceFeedResult<HktPriceSnapshot> {
        let quote = body
            .get(token_id)
            .ok_or_else(|| malformed(Self::NAME, format!("no quote for {token_id}")))?;

        let price = checked_price(Self::NAME, number(quote.get("usd")))?;

        Ok(HktPriceSnapshot {
            price,
            price_change_24h: number(quote.get("usd_24h_change")),
            market_cap: number(quote.get("usd_market_cap")),
            volume_24h: number(quote.get("usd_24h_vol")),
            total_supply: None,
            last_updated: fetched_at,
            source: Self::NAME.to_string(),
        })
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self) -> PriceFeedResult<HktPriceSnapshot> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_market_cap=true&include_24hr_vol=true&include_24hr_change=true",
            self.base_url, self.token_id
        );
        let body = get_json(&self.client, Self::NAME, &url).await?;
        Self::parse(&body, &self.token_id, Utc::now())
    }
}

/// DexScreener `/latest/dex/tokens/{address}` pair data
pub struct DexScreenerProvider {
    base_url: String,
    token_address: String,
    client: reqwest::Client,
}

impl DexScreenerProvider {
    pub const NAME: &'static str = "dexscreener";

    pub fn new(
        base_url: impl Into<String>,
        token_address: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_address: token_address.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Parse a `/latest/dex/tokens/{address}` body; the first pair wins
    pub fn parse(body: &Value, fetched_at: DateTime<Utc>) -> PriceFeedResult<HktPriceSnapshot> {
        let pair = body
            .get("pairs")
            .and_then(Value::as_array)
            .and_then(|pairs| pairs.first())
            .ok_or_else(|| malformed(Self::NAME, "no trading pairs"))?;

        let price = checked_price(Self::NAME, number(pair.get("priceUsd")))?;

        Ok(HktPriceSnapshot {
            price,
            price_change_24h: number(pair.get("priceChange").and_then(|c| c.get("h24"))),
            market_cap: number(pair.get("marketCap")).or_else(|| number(pair.get("fdv"))),
            volume_24h: number(pair.get("volume").and_then(|v| v.get("h24"))),
            total_supply: None,
            last_updated: fetched_at,
            source: Self::NAME.to_string(),
        })
    }
}

#[async_trait]
impl PriceProvider for DexScreenerProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self) -> PriceFeedResult<HktPriceSnapshot> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, self.token_address);
        let body = get_json(&self.client, Self::NAME, &url).await?;
        Self::parse(&body, Utc::now())
    }
}
