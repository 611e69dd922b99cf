//! Stage A hard elimination, Stage B soft scoring with the two momentum
//! readiness tiers, and the cold-tape detector.

pub mod cold_tape;

pub use cold_tape::ColdTapeDetector;

use squeeze_config::EngineConfig;
use squeeze_core::{FeatureRecord, GateStageCounts, Provenance};
use std::collections::HashMap;

/// Stage A: any reason present drops the ticker. Returns an empty vec when the
/// record survives.
pub fn hard_eliminate(record: &FeatureRecord, config: &EngineConfig) -> Vec<String> {
    let mut reasons = Vec::new();

    if record.held {
        reasons.push("portfolio_exclusion".to_string());
    }

    match record.price {
        None => reasons.push("no_price_data".to_string()),
        Some(price) if price <= config.thresholds.price_min => reasons.push("price_below_minimum".to_string()),
        _ => {}
    }

    if let Some(liquidity) = record.avg_dollar_liquidity_30d {
        if liquidity > 0.0 && liquidity <= 500_000.0 {
            reasons.push("insufficient_liquidity".to_string());
        }
    }

    if let Some(float_shares) = record.float_shares {
        if float_shares > config.thresholds.float_shares_max {
            reasons.push("float_exceeds_max".to_string());
        }
    }

    if config.exclusions.exclude_halts_today && record.halted_today {
        reasons.push("halts_today".to_string());
    }

    if let Some(spread) = record.spread_pct_today {
        if spread > config.exclusions.max_spread_pct {
            reasons.push("excessive_spread".to_string());
        }
    }

    reasons
}

fn vwap_reclaim(price: Option<f64>, vwap: Option<f64>) -> bool {
    matches!((price, vwap), (Some(p), Some(v)) if v > 0.0 && p > v)
}

/// Stage B: soft scoring on a hard-elimination survivor. Mutates the record's
/// `gate_score`, `flags`, and `pass_trade_ready`/`pass_early` in place.
/// `cold_tape_active` both relaxes several thresholds and disables the
/// TRADE_READY tier outright.
pub fn score_survivor(record: &mut FeatureRecord, config: &EngineConfig, cold_tape_active: bool) {
    let relax = &config.cold_tape.relaxation;
    let rel_vol_early_threshold =
        if cold_tape_active { config.momentum.rel_vol_early - relax.rel_vol_early_delta } else { config.momentum.rel_vol_early };
    let rsi_min_threshold = if cold_tape_active { config.thresholds.rsi_min - relax.rsi_min_delta } else { config.thresholds.rsi_min };
    let atr_pct_min_threshold =
        if cold_tape_active { config.thresholds.atr_pct_min - relax.atr_pct_min_delta } else { config.thresholds.atr_pct_min };

    let rel_volume = record.technicals.rel_volume;
    let day_change_1d = record.technicals.price_change_1d_pct;
    let above_vwap = vwap_reclaim(record.price, record.technicals.vwap);

    let mut score = 50.0_f64;

    let trade_ready_momentum = !cold_tape_active
        && rel_volume.is_some_and(|rv| rv >= config.momentum.rel_vol_trade_ready)
        && day_change_1d.is_some_and(|d| d.abs() >= 3.5)
        && above_vwap;
    if trade_ready_momentum {
        score += 20.0;
        record.pass_trade_ready = true;
        record.flags.vwap_reclaim = true;
    }

    let early_ready_momentum =
        !trade_ready_momentum && rel_volume.is_some_and(|rv| rv >= rel_vol_early_threshold) && record.catalyst.is_some();
    if early_ready_momentum {
        score += 10.0;
        record.pass_early = true;
    }

    if let Some(rv) = rel_volume {
        if rv >= config.momentum.high_priority_rel_vol {
            score += 15.0;
            record.flags.high_volume_spike = true;
            record.flags.high_priority = true;
        } else if rv >= 1.5 {
            score += 5.0;
        } else {
            score -= 10.0;
        }
    }

    if let Some(rsi) = record.technicals.rsi {
        if rsi <= 35.0 && rel_volume.is_some_and(|rv| rv >= 2.0) {
            score += 8.0;
            record.flags.oversold_bounce = true;
        }
        if rsi >= rsi_min_threshold && rsi <= config.thresholds.rsi_max {
            score += 5.0;
            record.flags.good_technicals = true;
        }
    }

    if let Some(atr) = record.technicals.atr_pct {
        if atr >= atr_pct_min_threshold {
            record.flags.good_technicals = true;
        }
    }

    if let Some(d1) = day_change_1d {
        if d1 > 5.0 {
            score += 15.0;
            record.flags.momentum_breakout = true;
        }
    }

    if let Some(si) = &record.short_interest_pct {
        if si.value >= config.thresholds.short_interest_pct_preferred {
            score += 20.0;
        } else if si.value >= config.thresholds.short_interest_pct_min {
            score += 8.0;
        } else if si.value < 5.0 {
            score -= 5.0;
        }
    }

    if let Some(dtc) = &record.days_to_cover {
        if dtc.value >= 3.0 {
            score += 10.0;
        } else if dtc.value < 1.0 {
            score -= 5.0;
        }
    }

    if let Some(fee) = &record.borrow_fee_pct {
        if fee.value >= config.thresholds.borrow_fee_pct_preferred {
            score += 12.0;
        }
    }
    if let Some(trend) = record.borrow_fee_trend_pp7d {
        if trend > 0.0 {
            score += 10.0;
        }
    }

    if let Some(catalyst) = &record.catalyst {
        if catalyst.verified_in_window {
            score += 12.0;
        } else {
            score += 5.0;
        }
    }

    if let Some(liquidity) = record.avg_dollar_liquidity_30d {
        if liquidity >= 10_000_000.0 {
            score += 8.0;
        } else if liquidity >= 5_000_000.0 {
            score += 4.0;
        }
    }

    if let Some(age) = record.freshness.short_interest_age_days {
        if age > 30.0 {
            score -= 5.0;
        }
    }
    if let Some(si) = &record.short_interest_pct {
        if si.provenance != Provenance::Real {
            score -= 3.0;
        }
    }

    record.gate_score = score.max(0.0);
}

pub struct GateOutput {
    pub survivors: Vec<FeatureRecord>,
    pub drops: HashMap<String, Vec<String>>,
    pub counts: GateStageCounts,
}

/// Runs Stage A then Stage B over every record, tallying the per-stage counts the
/// cold-tape detector and the run's audit record both need.
pub fn apply_gates(records: Vec<FeatureRecord>, config: &EngineConfig, cold_tape_active: bool) -> GateOutput {
    let mut survivors = Vec::new();
    let mut drops = HashMap::new();
    let mut counts = GateStageCounts::default();

    for mut record in records {
        let reasons = hard_eliminate(&record, config);
        if !reasons.is_empty() {
            drops.insert(record.ticker.clone(), reasons);
            continue;
        }

        score_survivor(&mut record, config, cold_tape_active);

        if record.pass_trade_ready {
            counts.trade_ready += 1;
        }
        if record.flags.good_technicals {
            counts.technical += 1;
        }
        if record.short_interest_pct.as_ref().is_some_and(|si| si.value >= config.thresholds.short_interest_pct_min) {
            counts.squeeze += 1;
        }
        if record.catalyst.is_some() {
            counts.catalyst += 1;
        }

        survivors.push(record);
    }

    GateOutput { survivors, drops, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeeze_core::{Estimated, Technicals};

    fn base_record() -> FeatureRecord {
        let mut r = FeatureRecord::new("FOO");
        r.price = Some(10.0);
        r
    }

    #[test]
    fn held_ticker_is_portfolio_excluded() {
        let mut r = base_record();
        r.held = true;
        assert!(hard_eliminate(&r, &EngineConfig::default()).contains(&"portfolio_exclusion".to_string()));
    }

    #[test]
    fn missing_price_is_eliminated() {
        let mut r = base_record();
        r.price = None;
        assert!(hard_eliminate(&r, &EngineConfig::default()).contains(&"no_price_data".to_string()));
    }

    #[test]
    fn price_below_minimum_is_eliminated() {
        let mut r = base_record();
        r.price = Some(0.25);
        let reasons = hard_eliminate(&r, &EngineConfig::default());
        assert!(reasons.contains(&"price_below_minimum".to_string()));
    }

    #[test]
    fn unknown_liquidity_is_not_eliminated() {
        let r = base_record();
        assert!(hard_eliminate(&r, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn low_liquidity_is_eliminated_but_zero_liquidity_is_not_penalized() {
        let mut config = EngineConfig::default();
        config.thresholds.price_min = 0.0;
        let mut low = base_record();
        low.avg_dollar_liquidity_30d = Some(100_000.0);
        assert!(hard_eliminate(&low, &config).contains(&"insufficient_liquidity".to_string()));

        let mut unknown = base_record();
        unknown.avg_dollar_liquidity_30d = Some(0.0);
        assert!(!hard_eliminate(&unknown, &config).contains(&"insufficient_liquidity".to_string()));
    }

    #[test]
    fn float_exceeding_max_is_eliminated() {
        let mut r = base_record();
        r.float_shares = Some(600_000_000.0);
        assert!(hard_eliminate(&r, &EngineConfig::default()).contains(&"float_exceeds_max".to_string()));
    }

    #[test]
    fn trade_ready_momentum_requires_all_three_conditions() {
        let mut r = base_record();
        r.technicals = Technicals { rel_volume: Some(4.0), price_change_1d_pct: Some(6.0), vwap: Some(4.8), ..Default::default() };
        r.price = Some(5.0);
        score_survivor(&mut r, &EngineConfig::default(), false);
        assert!(r.pass_trade_ready);
        assert!(r.gate_score > 50.0);
    }

    #[test]
    fn trade_ready_is_disabled_while_cold_tape_active() {
        let mut r = base_record();
        r.technicals = Technicals { rel_volume: Some(4.0), price_change_1d_pct: Some(6.0), vwap: Some(4.8), ..Default::default() };
        r.price = Some(5.0);
        score_survivor(&mut r, &EngineConfig::default(), true);
        assert!(!r.pass_trade_ready);
    }

    #[test]
    fn early_ready_requires_catalyst_presence() {
        let mut r = base_record();
        r.technicals = Technicals { rel_volume: Some(2.0), ..Default::default() };
        r.catalyst = Some(squeeze_core::Catalyst {
            catalyst_type: squeeze_core::CatalystType::VolumeBreakout,
            verified_in_window: false,
            date_valid: false,
            days_to_event: None,
            strength: 0.5,
            items: vec![],
            placeholder: false,
        });
        score_survivor(&mut r, &EngineConfig::default(), false);
        assert!(r.pass_early);
        assert!(!r.pass_trade_ready);
    }

    #[test]
    fn provenance_other_than_real_is_penalized() {
        let mut real = base_record();
        real.short_interest_pct = Some(Estimated::real(25.0));
        score_survivor(&mut real, &EngineConfig::default(), false);

        let mut estimated = base_record();
        estimated.short_interest_pct = Some(Estimated { value: 25.0, provenance: squeeze_core::Provenance::Estimate, confidence: 0.5 });
        score_survivor(&mut estimated, &EngineConfig::default(), false);

        assert!(estimated.gate_score < real.gate_score);
    }

    #[test]
    fn apply_gates_tallies_drops_and_survivors() {
        let mut trade_ready = base_record();
        trade_ready.ticker = "BAR".to_string();
        trade_ready.price = Some(5.0);
        trade_ready.technicals = Technicals { rel_volume: Some(4.0), price_change_1d_pct: Some(6.0), vwap: Some(4.8), ..Default::default() };

        let mut eliminated = base_record();
        eliminated.ticker = "FOO".to_string();
        eliminated.price = Some(0.25);

        let output = apply_gates(vec![trade_ready, eliminated], &EngineConfig::default(), false);
        assert_eq!(output.survivors.len(), 1);
        assert_eq!(output.survivors[0].ticker, "BAR");
        assert!(output.drops.contains_key("FOO"));
        assert_eq!(output.counts.trade_ready, 1);
    }
}
