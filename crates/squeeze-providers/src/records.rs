//! Per-kind provider record shapes. Each is the payload a provider port
//! returns on a hit; `None` from the trait method means absent, not an empty record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use squeeze_core::{Bar, Catalyst};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    pub float_shares: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub asof: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityRecord {
    pub avg_dollar_liquidity_30d: Option<f64>,
    pub adv_30d_shares: Option<f64>,
    pub asof: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub borrow_fee_pct: Option<f64>,
    pub borrow_fee_trend_pp7d: Option<f64>,
    pub utilization_pct: Option<f64>,
    pub asof: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortInterestRecord {
    pub short_interest_shares: Option<f64>,
    pub short_interest_pct: Option<f64>,
    pub days_to_cover: Option<f64>,
    pub asof: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalystRecord {
    pub catalyst: Catalyst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub last_price: Option<f64>,
    pub spread_pct_today: Option<f64>,
    pub halted_today: bool,
    pub day_volume: Option<f64>,
    pub day_change_pct: Option<f64>,
    pub day_dollar_volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarsRecord {
    pub bars: Vec<Bar>,
}

/// One row from a FINRA daily short-volume tape file. A symbol may legitimately
/// appear more than once for the same trading day (distinct reporting venues);
/// see `aggregate_short_volume` for the dedup-by-summing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinraTapeRow {
    pub symbol: String,
    pub short_volume: f64,
    pub total_volume: f64,
}
