//! Fans every provider kind out across the pre-filtered ticker list, then
//! assembles one `FeatureRecord` per ticker from whatever came back, falling
//! through to the estimator layer for anything a provider didn't supply.

use chrono::{DateTime, Utc};
use squeeze_core::{Estimated, FeatureRecord, Provenance};
use squeeze_estimator::{
    estimate_catalyst, estimate_days_to_cover, estimate_short_interest_pct, finra_proxy,
    BorrowFeeInputs, CatalystInputs, ShortInterestInputs,
};
use squeeze_providers::{
    BarsProvider, BorrowProvider, CatalystProvider, ConcurrencyHarness, FinraTapeProvider,
    FundamentalsProvider, LiquidityProvider, QuoteProvider, ShortInterestProvider,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// One `Arc<dyn Trait>` per provider port; the orchestrator depends on this
/// bundle rather than any concrete client so fakes can stand in for tests.
#[derive(Clone)]
pub struct ProviderBundle {
    pub fundamentals: Arc<dyn FundamentalsProvider>,
    pub liquidity: Arc<dyn LiquidityProvider>,
    pub borrow: Arc<dyn BorrowProvider>,
    pub short_interest: Arc<dyn ShortInterestProvider>,
    pub catalyst: Arc<dyn CatalystProvider>,
    pub quote: Arc<dyn QuoteProvider>,
    pub bars: Arc<dyn BarsProvider>,
    pub finra: Arc<dyn FinraTapeProvider>,
}

/// Fans the 7 batchable provider kinds out via the harness, then assembles a
/// `FeatureRecord` per ticker from whatever came back. The FINRA tape lookup
/// is local file I/O rather than a rate-limited vendor call, so it's awaited
/// directly per ticker instead of going through the harness.
pub async fn enrich(
    tickers: Vec<String>,
    holdings: &HashSet<String>,
    providers: &ProviderBundle,
    harness: &ConcurrencyHarness,
    global_budget: Duration,
    asof: DateTime<Utc>,
) -> Vec<FeatureRecord> {
    let fundamentals = {
        let p = providers.fundamentals.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get(&t).await }
        })
    };
    let liquidity = {
        let p = providers.liquidity.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get(&t).await }
        })
    };
    let borrow = {
        let p = providers.borrow.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get(&t).await }
        })
    };
    let short_interest = {
        let p = providers.short_interest.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get(&t).await }
        })
    };
    let catalyst = {
        let p = providers.catalyst.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get(&t).await }
        })
    };
    let quote = {
        let p = providers.quote.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get(&t).await }
        })
    };
    let minute_bars = {
        let p = providers.bars.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get_minute_bars(&t).await }
        })
    };
    let daily_bars = {
        let p = providers.bars.clone();
        harness.fetch_all(&tickers, global_budget, move |t| {
            let p = p.clone();
            async move { p.get_daily_bars(&t).await }
        })
    };

    let (mut fundamentals, mut liquidity, mut borrow, mut short_interest, mut catalyst, mut quote, mut minute_bars, mut daily_bars) =
        (
            fundamentals.await,
            liquidity.await,
            borrow.await,
            short_interest.await,
            catalyst.await,
            quote.await,
            minute_bars.await,
            daily_bars.await,
        );

    let mut records = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let mut record = FeatureRecord::new(&ticker);
        record.held = holdings.contains(&ticker);

        if let Some(f) = fundamentals.remove(&ticker) {
            record.float_shares = f.float_shares;
            record.market_cap = f.market_cap;
            record.shares_outstanding = f.shares_outstanding;
        }
        if let Some(l) = liquidity.remove(&ticker) {
            record.avg_dollar_liquidity_30d = l.avg_dollar_liquidity_30d;
            record.adv_30d_shares = l.adv_30d_shares;
        }
        if let Some(b) = borrow.remove(&ticker) {
            record.borrow_fee_pct = b.borrow_fee_pct.map(Estimated::real);
            record.borrow_fee_trend_pp7d = b.borrow_fee_trend_pp7d;
            record.utilization_pct = b.utilization_pct;
            record.freshness.borrow_fee_age_days = Some((asof - b.asof).num_seconds() as f64 / 86_400.0);
        }
        let direct_short_interest = short_interest.remove(&ticker);
        if let Some(ref s) = direct_short_interest {
            record.short_interest_shares = s.short_interest_shares;
            record.short_interest_pct = s.short_interest_pct.map(Estimated::real);
            record.days_to_cover = s.days_to_cover.map(Estimated::real);
            record.freshness.short_interest_age_days = Some((asof - s.asof).num_seconds() as f64 / 86_400.0);
        }
        if let Some(c) = catalyst.remove(&ticker) {
            record.catalyst = Some(c.catalyst);
        }

        let quote_record = quote.remove(&ticker);
        if let Some(ref q) = quote_record {
            record.spread_pct_today = q.spread_pct_today;
            record.halted_today = q.halted_today;
        }
        let minute = minute_bars.remove(&ticker).map(|b| b.bars).unwrap_or_default();
        let daily = daily_bars.remove(&ticker).map(|b| b.bars).unwrap_or_default();

        record.price = quote_record
            .as_ref()
            .and_then(|q| q.last_price)
            .or_else(|| minute.first().map(|b| b.close))
            .or_else(|| daily.last().map(|b| b.close));

        record.technicals.vwap = squeeze_technicals::vwap(&minute);
        record.technicals.ema9 = squeeze_technicals::ema_latest(&daily.iter().map(|b| b.close).collect::<Vec<_>>(), 9);
        record.technicals.ema20 = squeeze_technicals::ema_latest(&daily.iter().map(|b| b.close).collect::<Vec<_>>(), 20);
        record.technicals.rsi = squeeze_technicals::rsi_latest(&daily.iter().map(|b| b.close).collect::<Vec<_>>(), 14);
        record.technicals.atr_pct = squeeze_technicals::atr_pct(&daily, 14);
        record.technicals.rel_volume = squeeze_technicals::relative_volume(&minute, record.adv_30d_shares);
        record.technicals.volume = quote_record.as_ref().and_then(|q| q.day_volume);
        record.technicals.price_change_1d_pct = squeeze_technicals::price_change_pct(&daily, 1);
        record.technicals.price_change_5d_pct = squeeze_technicals::price_change_pct(&daily, 5);
        record.technicals.price_change_30d_pct = squeeze_technicals::price_change_pct(&daily, 30);
        record.technicals.vwap_held_or_reclaimed = matches!(
            (record.price, record.technicals.vwap),
            (Some(p), Some(v)) if squeeze_technicals::vwap_held_or_reclaimed(p, v)
        );

        if record.short_interest_pct.is_none() || record.days_to_cover.is_none() {
            if let Some((short_volume, total_volume)) = providers.finra.get_for_symbol(&ticker, asof).await {
                if let (Some(float_shares), Some(adv)) = (record.float_shares, record.adv_30d_shares) {
                    if let Some(proxy) = finra_proxy(short_volume, total_volume, float_shares, adv) {
                        record.short_interest_pct.get_or_insert(proxy.short_interest_pct);
                        record.days_to_cover.get_or_insert(proxy.days_to_cover);
                    }
                }
            }
        }
        if record.short_interest_pct.is_none() {
            // No direct provider hit and no FINRA proxy: fall through to the
            // estimator ladder using whatever technicals/fundamentals came in.
            // `volatility_30d_pct` has no dedicated provider field; the 30-day
            // price swing magnitude stands in for it here.
            tracing::debug!(ticker = %ticker, "short interest absent from provider and FINRA; falling through to estimator");
            let inputs = ShortInterestInputs {
                days_to_cover: record.days_to_cover.as_ref().map(|e| e.value),
                float_shares: record.float_shares,
                borrow_fee_pct: record.borrow_fee_pct.as_ref().map(|e| e.value),
                utilization_pct: record.utilization_pct,
                options_cp_ratio: record.options.as_ref().and_then(|o| o.call_put_ratio),
                rel_volume: record.technicals.rel_volume,
                volatility_30d_pct: record.technicals.price_change_30d_pct.map(f64::abs),
                price: record.price,
            };
            record.short_interest_pct = Some(estimate_short_interest_pct(&inputs));
        }

        if record.days_to_cover.is_none() {
            if let (Some(si), Some(float_shares), Some(adv)) =
                (&record.short_interest_pct, record.float_shares, record.adv_30d_shares)
            {
                let implied_short_shares = si.value / 100.0 * float_shares;
                record.days_to_cover = Some(Estimated {
                    value: estimate_days_to_cover(implied_short_shares, adv, float_shares),
                    provenance: Provenance::Estimate,
                    confidence: 0.3,
                });
            }
        }

        if record.catalyst.is_none() {
            tracing::debug!(ticker = %ticker, "catalyst absent from provider; synthesizing from technicals");
            let inputs = CatalystInputs {
                rel_volume: record.technicals.rel_volume,
                price_change_1d_pct: record.technicals.price_change_1d_pct,
                price_change_5d_pct: record.technicals.price_change_5d_pct,
                rsi: record.technicals.rsi,
                volatility_30d_pct: record.technicals.price_change_30d_pct.map(f64::abs),
            };
            record.catalyst = Some(estimate_catalyst(&inputs, asof));
        }

        if record.borrow_fee_pct.is_none() {
            let inputs = BorrowFeeInputs {
                volatility_30d_pct: record.technicals.price_change_30d_pct.map(f64::abs),
                float_shares: record.float_shares,
                price_change_30d_pct: record.technicals.price_change_30d_pct,
                turnover_high: record.technicals.rel_volume.is_some_and(|rv| rv >= 3.0),
                price: record.price,
            };
            record.borrow_fee_pct = Some(Estimated {
                value: squeeze_estimator::estimate_borrow_fee_pct(&inputs),
                provenance: Provenance::Estimate,
                confidence: 0.3,
            });
        }

        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use squeeze_core::Bar;
    use squeeze_providers::{BarsRecord, BorrowRecord, CatalystRecord, FundamentalsRecord, LiquidityRecord, QuoteRecord, ShortInterestRecord};
    use std::collections::HashMap;

    struct FixedFundamentals(HashMap<String, FundamentalsRecord>);
    #[async_trait]
    impl FundamentalsProvider for FixedFundamentals {
        async fn get(&self, ticker: &str) -> Option<FundamentalsRecord> {
            self.0.get(ticker).cloned()
        }
    }
    struct Empty;
    #[async_trait]
    impl LiquidityProvider for Empty {
        async fn get(&self, _ticker: &str) -> Option<LiquidityRecord> {
            None
        }
    }
    #[async_trait]
    impl BorrowProvider for Empty {
        async fn get(&self, _ticker: &str) -> Option<BorrowRecord> {
            None
        }
    }
    #[async_trait]
    impl ShortInterestProvider for Empty {
        async fn get(&self, _ticker: &str) -> Option<ShortInterestRecord> {
            None
        }
    }
    #[async_trait]
    impl CatalystProvider for Empty {
        async fn get(&self, _ticker: &str) -> Option<CatalystRecord> {
            None
        }
    }
    struct FixedQuote(HashMap<String, QuoteRecord>);
    #[async_trait]
    impl QuoteProvider for FixedQuote {
        async fn get(&self, ticker: &str) -> Option<QuoteRecord> {
            self.0.get(ticker).cloned()
        }
    }
    struct NoBars;
    #[async_trait]
    impl BarsProvider for NoBars {
        async fn get_minute_bars(&self, _ticker: &str) -> Option<BarsRecord> {
            None
        }
        async fn get_daily_bars(&self, _ticker: &str) -> Option<BarsRecord> {
            None
        }
    }
    struct NoFinra;
    #[async_trait]
    impl FinraTapeProvider for NoFinra {
        async fn get_for_symbol(&self, _ticker: &str, _asof: DateTime<Utc>) -> Option<(f64, f64)> {
            None
        }
    }

    fn bundle(fundamentals: HashMap<String, FundamentalsRecord>, quotes: HashMap<String, QuoteRecord>) -> ProviderBundle {
        ProviderBundle {
            fundamentals: Arc::new(FixedFundamentals(fundamentals)),
            liquidity: Arc::new(Empty),
            borrow: Arc::new(Empty),
            short_interest: Arc::new(Empty),
            catalyst: Arc::new(Empty),
            quote: Arc::new(FixedQuote(quotes)),
            bars: Arc::new(NoBars),
            finra: Arc::new(NoFinra),
        }
    }

    #[tokio::test]
    async fn falls_back_to_estimator_when_no_provider_or_finra_hit() {
        let mut fundamentals = HashMap::new();
        fundamentals.insert(
            "BAZ".to_string(),
            FundamentalsRecord { float_shares: Some(20_000_000.0), market_cap: Some(1.0), shares_outstanding: Some(1.0), asof: Utc::now() },
        );
        let mut quotes = HashMap::new();
        quotes.insert(
            "BAZ".to_string(),
            QuoteRecord { last_price: Some(3.0), spread_pct_today: Some(0.5), halted_today: false, day_volume: Some(1_000_000.0), day_change_pct: Some(5.0), day_dollar_volume: Some(3_000_000.0) },
        );
        let bundle = bundle(fundamentals, quotes);
        let harness = ConcurrencyHarness::new(4, Duration::from_secs(1));
        let records = enrich(vec!["BAZ".to_string()], &HashSet::new(), &bundle, &harness, Duration::from_secs(2), Utc::now()).await;
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert!(r.short_interest_pct.is_some());
        assert!(r.catalyst.is_some());
        assert!(r.borrow_fee_pct.is_some());
        let dtc = r.days_to_cover.as_ref().unwrap();
        assert_eq!(dtc.provenance, Provenance::Estimate);
    }

    #[tokio::test]
    async fn held_ticker_is_flagged() {
        let bundle = bundle(HashMap::new(), HashMap::new());
        let harness = ConcurrencyHarness::new(4, Duration::from_secs(1));
        let holdings: HashSet<String> = ["FOO".to_string()].into_iter().collect();
        let records = enrich(vec!["FOO".to_string()], &holdings, &bundle, &harness, Duration::from_secs(2), Utc::now()).await;
        assert!(records[0].held);
    }

    #[tokio::test]
    async fn price_falls_back_to_daily_bar_close_when_no_quote() {
        struct DailyBarsOnly;
        #[async_trait]
        impl BarsProvider for DailyBarsOnly {
            async fn get_minute_bars(&self, _ticker: &str) -> Option<BarsRecord> {
                None
            }
            async fn get_daily_bars(&self, _ticker: &str) -> Option<BarsRecord> {
                Some(BarsRecord {
                    bars: vec![Bar { timestamp: Utc::now(), open: 9.0, high: 9.5, low: 8.5, close: 9.2, volume: 1000.0 }],
                })
            }
        }
        let mut b = bundle(HashMap::new(), HashMap::new());
        b.bars = Arc::new(DailyBarsOnly);
        let harness = ConcurrencyHarness::new(4, Duration::from_secs(1));
        let records = enrich(vec!["NOQ".to_string()], &HashSet::new(), &b, &harness, Duration::from_secs(2), Utc::now()).await;
        assert_eq!(records[0].price, Some(9.2));
    }
}
