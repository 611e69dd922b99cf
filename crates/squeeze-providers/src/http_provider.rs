//! The one concrete implementation per provider trait backing onto the shared
//! HTTP client, wrapped in the TTL cache from `CacheRegistry`. A
//! reqwest-client-plus-rate-limit shape, generalized across the several data
//! kinds this engine consumes instead of one vendor's full API.

use crate::cache_registry::CacheRegistry;
use crate::concurrency::{with_retry_on_rate_limit, ConcurrencyHarness};
use crate::ports::{
    BarsProvider, BorrowProvider, CatalystProvider, FundamentalsProvider, LiquidityProvider,
    QuoteProvider, ShortInterestProvider,
};
use crate::records::{
    BarsRecord, BorrowRecord, CatalystRecord, FundamentalsRecord, LiquidityRecord, QuoteRecord,
    ShortInterestRecord,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// A provider configured in strict mode with no credential fails closed at
/// construction time: `StrictModeMissingCredential` is fatal at startup,
/// never mid-run.
pub fn require_credential_in_strict_mode(strict_mode: bool, api_key: &Option<String>, provider_name: &str) -> anyhow::Result<()> {
    if strict_mode && api_key.is_none() {
        anyhow::bail!("provider '{provider_name}' is configured in strict mode but no credential was supplied");
    }
    Ok(())
}

pub struct HttpProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: Arc<CacheRegistry>,
    harness: ConcurrencyHarness,
}

impl HttpProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, cache: Arc<CacheRegistry>, max_concurrency: usize) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?,
            base_url: base_url.into(),
            api_key,
            cache,
            harness: ConcurrencyHarness::new(max_concurrency, Duration::from_secs(10)),
        })
    }

    /// Shared concurrency harness, exposed so the enrichment orchestrator can fan a
    /// batch of tickers out through the same per-provider bound this client uses for
    /// single calls.
    pub fn harness(&self) -> &ConcurrencyHarness {
        &self.harness
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}{}", self.base_url, path);
        let result = with_retry_on_rate_limit(
            3,
            Duration::from_millis(200),
            |status: &StatusCode| *status == StatusCode::TOO_MANY_REQUESTS,
            || async {
                let mut req = self.client.get(&url);
                if let Some(key) = &self.api_key {
                    req = req.bearer_auth(key);
                }
                let response = req.send().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                if response.status().is_success() {
                    Ok(response)
                } else {
                    Err(response.status())
                }
            },
        )
        .await;

        match result {
            Ok(response) => response.json::<T>().await.ok(),
            Err(status) => {
                tracing::debug!(%status, %url, "provider call treated as absent");
                None
            }
        }
    }
}

#[async_trait]
impl FundamentalsProvider for HttpProviderClient {
    async fn get(&self, ticker: &str) -> Option<FundamentalsRecord> {
        if let Some(hit) = self.cache.fundamentals.get(ticker) {
            return Some(hit);
        }
        let record: FundamentalsRecord = self.fetch_json(&format!("/fundamentals/{ticker}")).await?;
        self.cache.fundamentals.put(ticker.to_uppercase(), record.clone());
        self.cache.mirror_to_disk("fundamentals", ticker, &record).await;
        Some(record)
    }
}

#[async_trait]
impl LiquidityProvider for HttpProviderClient {
    async fn get(&self, ticker: &str) -> Option<LiquidityRecord> {
        if let Some(hit) = self.cache.liquidity.get(ticker) {
            return Some(hit);
        }
        let record: LiquidityRecord = self.fetch_json(&format!("/liquidity/{ticker}")).await?;
        self.cache.liquidity.put(ticker.to_uppercase(), record.clone());
        self.cache.mirror_to_disk("liquidity", ticker, &record).await;
        Some(record)
    }
}

#[async_trait]
impl BorrowProvider for HttpProviderClient {
    async fn get(&self, ticker: &str) -> Option<BorrowRecord> {
        if let Some(hit) = self.cache.borrow.get(ticker) {
            return Some(hit);
        }
        let record: BorrowRecord = self.fetch_json(&format!("/borrow/{ticker}")).await?;
        self.cache.borrow.put(ticker.to_uppercase(), record.clone());
        self.cache.mirror_to_disk("borrow", ticker, &record).await;
        Some(record)
    }
}

#[async_trait]
impl ShortInterestProvider for HttpProviderClient {
    async fn get(&self, ticker: &str) -> Option<ShortInterestRecord> {
        if let Some(hit) = self.cache.short_interest.get(ticker) {
            return Some(hit);
        }
        let record: ShortInterestRecord = self.fetch_json(&format!("/short-interest/{ticker}")).await?;
        self.cache.short_interest.put(ticker.to_uppercase(), record.clone());
        self.cache.mirror_to_disk("short_interest", ticker, &record).await;
        Some(record)
    }
}

#[async_trait]
impl CatalystProvider for HttpProviderClient {
    async fn get(&self, ticker: &str) -> Option<CatalystRecord> {
        if let Some(hit) = self.cache.catalyst.get(ticker) {
            return Some(hit);
        }
        let record: CatalystRecord = self.fetch_json(&format!("/catalysts/{ticker}")).await?;
        self.cache.catalyst.put(ticker.to_uppercase(), record.clone());
        self.cache.mirror_to_disk("catalyst", ticker, &record).await;
        Some(record)
    }
}

/// Quotes carry no TTL beyond the request itself: no cache lookup.
#[async_trait]
impl QuoteProvider for HttpProviderClient {
    async fn get(&self, ticker: &str) -> Option<QuoteRecord> {
        self.fetch_json(&format!("/quotes/{ticker}")).await
    }
}

#[async_trait]
impl BarsProvider for HttpProviderClient {
    async fn get_minute_bars(&self, ticker: &str) -> Option<BarsRecord> {
        self.fetch_json(&format!("/bars/{ticker}?resolution=minute")).await
    }

    async fn get_daily_bars(&self, ticker: &str) -> Option<BarsRecord> {
        self.fetch_json(&format!("/bars/{ticker}?resolution=day")).await
    }
}
