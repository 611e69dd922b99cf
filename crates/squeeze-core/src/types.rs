use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OHLCV bar, minute or daily resolution depending on the provider call that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Where a field's value came from. Ordered loosely from most to least trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Real,
    Proxy,
    Estimate,
    Default,
}

/// A value plus the provenance/confidence discipline required for short-interest and
/// borrow-fee style fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimated<T> {
    pub value: T,
    pub provenance: Provenance,
    pub confidence: f64,
}

impl<T> Estimated<T> {
    pub fn real(value: T) -> Self {
        Self { value, provenance: Provenance::Real, confidence: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalystType {
    Earnings,
    News,
    VolumeBreakout,
    PriceBreakout,
    PriceBreakdown,
    ReversalSetup,
    OversoldBounce,
    VolatilityExpansion,
    EarningsApproach,
    TechnicalPattern,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalystItem {
    pub headline: String,
    pub source: String,
    pub published: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalyst {
    pub catalyst_type: CatalystType,
    pub verified_in_window: bool,
    pub date_valid: bool,
    pub days_to_event: Option<f64>,
    pub strength: f64,
    pub items: Vec<CatalystItem>,
    pub placeholder: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Technicals {
    pub vwap: Option<f64>,
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub rsi: Option<f64>,
    pub atr_pct: Option<f64>,
    pub rel_volume: Option<f64>,
    pub volume: Option<f64>,
    pub price_change_1d_pct: Option<f64>,
    pub price_change_5d_pct: Option<f64>,
    pub price_change_30d_pct: Option<f64>,
    pub vwap_held_or_reclaimed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsSnapshot {
    pub call_put_ratio: Option<f64>,
    pub implied_volatility: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialSnapshot {
    pub mentions_today: Option<f64>,
    pub avg_mentions_7d: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Freshness {
    pub short_interest_age_days: Option<f64>,
    pub borrow_fee_age_days: Option<f64>,
}

/// Derived boolean signals set by the gate engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flags {
    pub high_volume_spike: bool,
    pub high_priority: bool,
    pub vwap_reclaim: bool,
    pub oversold_bounce: bool,
    pub good_technicals: bool,
    pub momentum_breakout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    TradeReady,
    EarlyReady,
    Watch,
    Monitor,
    None,
}

impl Default for Tier {
    fn default() -> Self {
        Tier::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    EarlyReady,
    Watchlist,
    Monitor,
    NoAction,
    ExitCandidate,
}

impl Default for Action {
    fn default() -> Self {
        Action::NoAction
    }
}

/// Per-component subscore recorded for audit in `score_explain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentExplain {
    pub name: String,
    pub subscore: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreExplain {
    pub components: Vec<ComponentExplain>,
    pub gate_flags: Vec<String>,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub tp1: f64,
    pub tp2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryHint {
    VwapReclaim,
    BaseBreakout,
}

/// One candidate row per symbol per run, assembled by the feature record and then
/// annotated by the gate engine, scorer, and action mapper in sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub ticker: String,
    pub price: Option<f64>,
    pub float_shares: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub market_cap: Option<f64>,
    pub adv_30d_shares: Option<f64>,
    pub avg_dollar_liquidity_30d: Option<f64>,

    pub short_interest_pct: Option<Estimated<f64>>,
    pub days_to_cover: Option<Estimated<f64>>,
    pub short_interest_shares: Option<f64>,

    pub borrow_fee_pct: Option<Estimated<f64>>,
    pub borrow_fee_trend_pp7d: Option<f64>,
    pub utilization_pct: Option<f64>,

    pub freshness: Freshness,
    pub catalyst: Option<Catalyst>,
    pub technicals: Technicals,
    pub options: Option<OptionsSnapshot>,
    pub sentiment: Option<SentimentSnapshot>,
    pub social: Option<SocialSnapshot>,

    pub spread_pct_today: Option<f64>,
    pub halted_today: bool,
    pub held: bool,

    pub flags: Flags,
    pub gate_score: f64,
    pub composite_score: f64,
    pub tier: Tier,
    pub action: Action,
    pub entry_hint: Option<EntryHint>,
    pub risk: Option<RiskLevels>,
    pub score_explain: ScoreExplain,

    /// Gate-stage pass flags, read by the scorer/mapper; not part of the public contract
    /// but carried alongside the record because gating and scoring happen in separate passes.
    pub pass_trade_ready: bool,
    pub pass_early: bool,
}

impl FeatureRecord {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            price: None,
            float_shares: None,
            shares_outstanding: None,
            market_cap: None,
            adv_30d_shares: None,
            avg_dollar_liquidity_30d: None,
            short_interest_pct: None,
            days_to_cover: None,
            short_interest_shares: None,
            borrow_fee_pct: None,
            borrow_fee_trend_pp7d: None,
            utilization_pct: None,
            freshness: Freshness::default(),
            catalyst: None,
            technicals: Technicals::default(),
            options: None,
            sentiment: None,
            social: None,
            spread_pct_today: None,
            halted_today: false,
            held: false,
            flags: Flags::default(),
            gate_score: 0.0,
            composite_score: 0.0,
            tier: Tier::None,
            action: Action::NoAction,
            entry_hint: None,
            risk: None,
            score_explain: ScoreExplain::default(),
            pass_trade_ready: false,
            pass_early: false,
        }
    }
}

/// Per-stage counts tracked across a run, used both for the audit record and as the
/// cold-tape detector's rolling-window input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateStageCounts {
    pub trade_ready: usize,
    pub technical: usize,
    pub squeeze: usize,
    pub catalyst: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub asof: DateTime<Utc>,
    pub preset: String,
    pub config_digest: String,
    pub universe_count: usize,
    pub prefiltered_count: usize,
    pub enriched_count: usize,
    pub passed_count: usize,
    pub gate_counts: GateStageCounts,
    pub relaxation_active: bool,
    pub candidates: Vec<FeatureRecord>,
    pub drops: HashMap<String, Vec<String>>,
    pub cancelled: bool,
}

/// A process-local TTL cache entry; `T` is the deserialized provider payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCacheEntry<T> {
    pub key: String,
    pub value: T,
    pub inserted_at: DateTime<Utc>,
    pub ttl_secs: i64,
}

impl<T> ProviderCacheEntry<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.inserted_at).num_seconds() >= self.ttl_secs
    }
}
