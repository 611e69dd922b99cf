//! Candidate set construction and the snapshot/heuristic pre-filter that
//! runs before the expensive provider fan-out.

use async_trait::async_trait;
use squeeze_providers::QuoteRecord;
use std::collections::{HashMap, HashSet};

/// Port over the broker API's tradeable-symbols listing; trading/broker
/// surfaces are an external collaborator, consumed here only through this
/// trait.
#[async_trait]
pub trait BrokerUniverseProvider: Send + Sync {
    async fn list_active_us_common_stocks(&self) -> Vec<String>;
}

/// Symbols containing `.` or `-`, or longer than 5 characters, are warrants,
/// units, or preferred share classes and are excluded outright, before either
/// pre-filter path runs.
pub fn exclude_non_standard_tickers(symbols: Vec<String>) -> Vec<String> {
    symbols.into_iter().filter(|s| !s.contains('.') && !s.contains('-') && s.len() <= 5).collect()
}

/// Builds the universe from the broker listing (or `test_symbols` when
/// supplied), filtering out current holdings and non-standard ticker shapes.
pub fn build_universe(broker_symbols: Vec<String>, holdings: &HashSet<String>, test_symbols: Option<&[String]>) -> Vec<String> {
    let source: Vec<String> = match test_symbols {
        Some(symbols) => symbols.to_vec(),
        None => broker_symbols,
    };
    let shaped = exclude_non_standard_tickers(source);
    shaped.into_iter().filter(|s| !holdings.contains(s)).collect()
}

/// Snapshot-based pre-filter: retain symbols where every threshold holds.
/// Symbols absent from `snapshots` are dropped (treated as "no
/// snapshot for this symbol", not "passes").
pub fn prefilter_snapshot(symbols: &[String], snapshots: &HashMap<String, QuoteRecord>, max_tickers: usize) -> Vec<String> {
    let mut kept: Vec<String> = symbols
        .iter()
        .filter(|symbol| {
            let Some(snapshot) = snapshots.get(*symbol) else { return false };
            let Some(price) = snapshot.last_price else { return false };
            let Some(day_volume) = snapshot.day_volume else { return false };
            let Some(day_change_pct) = snapshot.day_change_pct else { return false };
            let Some(day_dollar_volume) = snapshot.day_dollar_volume else { return false };

            (2.0..=100.0).contains(&price)
                && day_volume >= 500_000.0
                && day_change_pct.abs() >= 2.0
                && day_dollar_volume >= 1_000_000.0
        })
        .cloned()
        .collect();
    kept.truncate(max_tickers);
    kept
}

/// Fallback heuristic used when a market snapshot isn't available: ticker
/// length ≤ 4 and no `X`/`Z` character, capped at `max_tickers`.
pub fn prefilter_heuristic(symbols: &[String], max_tickers: usize) -> Vec<String> {
    let mut kept: Vec<String> = symbols
        .iter()
        .filter(|s| s.len() <= 4 && !s.contains('X') && !s.contains('Z'))
        .cloned()
        .collect();
    kept.truncate(max_tickers);
    kept
}
