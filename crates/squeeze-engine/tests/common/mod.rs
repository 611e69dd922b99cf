//! Shared fixtures for the end-to-end scenario tests below. Each scenario
//! wires a `ProviderBundle` of fixed, in-memory fakes — the same pattern
//! `squeeze-orchestrator`'s own enrichment tests use — and drives the real
//! `squeeze_engine::run()` controller over it.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use squeeze_core::Bar;
use squeeze_orchestrator::ProviderBundle;
use squeeze_providers::{
    BarsProvider, BarsRecord, BorrowProvider, BorrowRecord, CatalystProvider, CatalystRecord,
    FinraTapeProvider, FundamentalsProvider, FundamentalsRecord, LiquidityProvider, LiquidityRecord,
    QuoteProvider, QuoteRecord, ShortInterestProvider, ShortInterestRecord,
};
use std::collections::HashMap;
use std::sync::Arc;

/// One in-memory map per provider kind, keyed by ticker. Absent from a map
/// means the provider returns `None` for that ticker, exactly like a real
/// vendor with no coverage.
#[derive(Default)]
pub struct Fixtures {
    pub fundamentals: HashMap<String, FundamentalsRecord>,
    pub liquidity: HashMap<String, LiquidityRecord>,
    pub borrow: HashMap<String, BorrowRecord>,
    pub short_interest: HashMap<String, ShortInterestRecord>,
    pub catalyst: HashMap<String, CatalystRecord>,
    pub quote: HashMap<String, QuoteRecord>,
    pub minute_bars: HashMap<String, Vec<Bar>>,
    pub daily_bars: HashMap<String, Vec<Bar>>,
    pub finra: HashMap<String, (f64, f64)>,
}

#[async_trait]
impl FundamentalsProvider for Fixtures {
    async fn get(&self, ticker: &str) -> Option<FundamentalsRecord> {
        self.fundamentals.get(ticker).cloned()
    }
}

#[async_trait]
impl LiquidityProvider for Fixtures {
    async fn get(&self, ticker: &str) -> Option<LiquidityRecord> {
        self.liquidity.get(ticker).cloned()
    }
}

#[async_trait]
impl BorrowProvider for Fixtures {
    async fn get(&self, ticker: &str) -> Option<BorrowRecord> {
        self.borrow.get(ticker).cloned()
    }
}

#[async_trait]
impl ShortInterestProvider for Fixtures {
    async fn get(&self, ticker: &str) -> Option<ShortInterestRecord> {
        self.short_interest.get(ticker).cloned()
    }
}

#[async_trait]
impl CatalystProvider for Fixtures {
    async fn get(&self, ticker: &str) -> Option<CatalystRecord> {
        self.catalyst.get(ticker).cloned()
    }
}

#[async_trait]
impl QuoteProvider for Fixtures {
    async fn get(&self, ticker: &str) -> Option<QuoteRecord> {
        self.quote.get(ticker).cloned()
    }
}

#[async_trait]
impl BarsProvider for Fixtures {
    async fn get_minute_bars(&self, ticker: &str) -> Option<BarsRecord> {
        self.minute_bars.get(ticker).cloned().map(|bars| BarsRecord { bars })
    }
    async fn get_daily_bars(&self, ticker: &str) -> Option<BarsRecord> {
        self.daily_bars.get(ticker).cloned().map(|bars| BarsRecord { bars })
    }
}

#[async_trait]
impl FinraTapeProvider for Fixtures {
    async fn get_for_symbol(&self, ticker: &str, _asof: DateTime<Utc>) -> Option<(f64, f64)> {
        self.finra.get(ticker).copied()
    }
}

pub fn bundle(fixtures: Fixtures) -> ProviderBundle {
    let shared = Arc::new(fixtures);
    ProviderBundle {
        fundamentals: shared.clone(),
        liquidity: shared.clone(),
        borrow: shared.clone(),
        short_interest: shared.clone(),
        catalyst: shared.clone(),
        quote: shared.clone(),
        bars: shared.clone(),
        finra: shared,
    }
}

pub fn flat_bar(close: f64, volume: f64) -> Bar {
    Bar { timestamp: Utc::now(), open: close, high: close, low: close, close, volume }
}

/// `days` daily bars drifting up ~1%/day from `start_close`, with the final
/// day's close landing exactly `final_jump_pct`% above the prior close (so
/// `price_change_pct(bars, 1)` comes out to exactly that value) and a constant
/// `day_range`-wide high/low band (so `atr_pct` settles near
/// `100 * day_range / last_close`).
pub fn rising_daily_bars(start_close: f64, days: usize, final_jump_pct: f64, day_range: f64) -> Vec<Bar> {
    let mut closes = Vec::with_capacity(days);
    let mut c = start_close;
    for _ in 0..days - 1 {
        closes.push(c);
        c *= 1.01;
    }
    let prev = *closes.last().unwrap();
    closes.push(prev * (1.0 + final_jump_pct / 100.0));

    let now = Utc::now();
    closes
        .into_iter()
        .enumerate()
        .map(|(i, close)| Bar {
            timestamp: now - ChronoDuration::days((days - i) as i64),
            open: close,
            high: close + day_range / 2.0,
            low: close - day_range / 2.0,
            close,
            volume: 1_000_000.0,
        })
        .collect()
}

pub fn quote(price: f64, day_volume: f64, day_change_pct: f64, day_dollar_volume: f64) -> QuoteRecord {
    QuoteRecord {
        last_price: Some(price),
        spread_pct_today: None,
        halted_today: false,
        day_volume: Some(day_volume),
        day_change_pct: Some(day_change_pct),
        day_dollar_volume: Some(day_dollar_volume),
    }
}
