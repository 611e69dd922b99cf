//! One `#[async_trait]` per data kind. The orchestrator depends on these
//! traits, never on a concrete HTTP client, so fakes can stand in for tests.

use crate::records::{
    BarsRecord, BorrowRecord, CatalystRecord, FundamentalsRecord, LiquidityRecord, QuoteRecord,
    ShortInterestRecord,
};
use async_trait::async_trait;

#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Option<FundamentalsRecord>;
}

#[async_trait]
pub trait LiquidityProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Option<LiquidityRecord>;
}

#[async_trait]
pub trait BorrowProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Option<BorrowRecord>;
}

#[async_trait]
pub trait ShortInterestProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Option<ShortInterestRecord>;
}

#[async_trait]
pub trait CatalystProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Option<CatalystRecord>;
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get(&self, ticker: &str) -> Option<QuoteRecord>;
}

#[async_trait]
pub trait BarsProvider: Send + Sync {
    async fn get_minute_bars(&self, ticker: &str) -> Option<BarsRecord>;
    async fn get_daily_bars(&self, ticker: &str) -> Option<BarsRecord>;
}

/// FINRA daily short-volume tape, keyed by trading day rather than ticker; see
/// `crate::finra` for the file layout and the step-back-5-days lookup rule.
#[async_trait]
pub trait FinraTapeProvider: Send + Sync {
    async fn get_for_symbol(&self, ticker: &str, asof: chrono::DateTime<chrono::Utc>) -> Option<(f64, f64)>;
}
