//! Five weighted components renormalized over whichever have at least one
//! present input, plus the total-order tie-break comparator used for final
//! ranking.

use squeeze_config::EngineConfig;
use squeeze_core::{CatalystType, ComponentExplain, FeatureRecord, ScoreExplain};
use std::cmp::Ordering;

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Relative volume saturating at 10x, `price` vs `vwap` via a tanh curve, and EMA9
/// vs EMA20 slope with a bump on a bullish cross.
fn score_momentum(record: &FeatureRecord) -> Option<f64> {
    let mut parts = Vec::new();

    if let Some(rv) = record.technicals.rel_volume {
        let saturating = (rv / 10.0).min(1.0) * 100.0;
        let bump = if rv >= 3.0 { 10.0 } else { 0.0 };
        parts.push((saturating + bump).min(100.0));
    }

    if let (Some(price), Some(vwap)) = (record.price, record.technicals.vwap) {
        if vwap > 0.0 {
            let deviation = (price - vwap) / vwap;
            let scaled = (deviation * 5.0).tanh();
            parts.push(((scaled + 1.0) / 2.0) * 100.0);
        }
    }

    if let (Some(ema9), Some(ema20)) = (record.technicals.ema9, record.technicals.ema20) {
        if ema20 != 0.0 {
            let slope = (ema9 - ema20) / ema20;
            let scaled = (slope * 10.0).tanh();
            let mut sub = ((scaled + 1.0) / 2.0) * 100.0;
            if ema9 >= ema20 {
                sub = (sub + 10.0).min(100.0);
            }
            parts.push(sub);
        }
    }

    mean(&parts)
}

/// Short-interest percentage used directly as a 0..100 proxy, days-to-cover
/// saturating at 3+ days, borrow fee scaled ×10 and capped at 100.
fn score_squeeze(record: &FeatureRecord) -> Option<f64> {
    let mut parts = Vec::new();

    if let Some(si) = &record.short_interest_pct {
        parts.push(si.value.clamp(0.0, 100.0));
    }
    if let Some(dtc) = &record.days_to_cover {
        let sub = if dtc.value >= 3.0 { 80.0 } else { (dtc.value / 3.0 * 80.0).clamp(0.0, 80.0) };
        parts.push(sub);
    }
    if let Some(fee) = &record.borrow_fee_pct {
        parts.push((fee.value * 10.0).min(100.0));
    }

    mean(&parts)
}

/// Catalyst type base score, a recency bonus for near-term events, and a
/// `verified_in_window` multiplier.
fn score_catalyst(record: &FeatureRecord) -> Option<f64> {
    let catalyst = record.catalyst.as_ref()?;

    let base = match catalyst.catalyst_type {
        CatalystType::Earnings | CatalystType::EarningsApproach => 80.0,
        CatalystType::News => 60.0,
        _ => 40.0,
    };
    let recency_bonus = match catalyst.days_to_event {
        Some(d) if d <= 7.0 => 15.0,
        Some(d) if d <= 14.0 => 8.0,
        _ => 0.0,
    };
    let mut sub = base + recency_bonus;
    if catalyst.verified_in_window {
        sub *= 1.2;
    }
    Some(sub.clamp(0.0, 100.0))
}

/// Provider sentiment score (assumed `[-1, 1]`, mapped to `[0, 100]`) plus social
/// velocity (`mentionsToday / max(eps, avgMentions7d)`, clipped at 5x).
fn score_sentiment(record: &FeatureRecord) -> Option<f64> {
    let mut parts = Vec::new();

    if let Some(sentiment) = &record.sentiment {
        if let Some(score) = sentiment.score {
            parts.push(((score.clamp(-1.0, 1.0) + 1.0) / 2.0) * 100.0);
        }
    }
    if let Some(social) = &record.social {
        if let Some(today) = social.mentions_today {
            let avg = social.avg_mentions_7d.unwrap_or(0.0).max(1e-6);
            let velocity = (today / avg).min(5.0);
            parts.push((velocity / 5.0) * 100.0);
        }
    }

    mean(&parts)
}

/// RSI sweet spot 55-70 (peak 100, decays outside), ATR% sweet spot 3-8 (+bump at
/// ≥8), options call/put signal, and a flat bump for the gate engine's technical
/// flags.
fn score_technical(record: &FeatureRecord) -> Option<f64> {
    let mut parts = Vec::new();

    if let Some(rsi) = record.technicals.rsi {
        let sub = if (55.0..=70.0).contains(&rsi) {
            100.0
        } else {
            let distance = if rsi < 55.0 { 55.0 - rsi } else { rsi - 70.0 };
            (100.0 - distance * 4.0).max(0.0)
        };
        parts.push(sub);
    }

    if let Some(atr) = record.technicals.atr_pct {
        let mut sub = if (3.0..=8.0).contains(&atr) {
            80.0
        } else if atr < 3.0 {
            (atr / 3.0 * 80.0).max(0.0)
        } else {
            (80.0 - (atr - 8.0) * 5.0).max(0.0)
        };
        if atr >= 8.0 {
            sub = (sub + 10.0).min(100.0);
        }
        parts.push(sub);
    }

    if let Some(options) = &record.options {
        if let Some(cp_ratio) = options.call_put_ratio {
            let sub = (((1.0 - cp_ratio).clamp(-1.0, 1.0) + 1.0) / 2.0) * 100.0;
            parts.push(sub);
        }
    }

    if record.flags.good_technicals {
        parts.push(100.0);
    }
    if record.flags.momentum_breakout {
        parts.push(100.0);
    }

    mean(&parts)
}

/// Computes the weighted composite over whichever of the five components has at
/// least one present input, renormalizing over the present weights, applies the
/// cold-tape ceiling, and records the explain trail.
pub fn score_composite(record: &mut FeatureRecord, config: &EngineConfig, cold_tape_active: bool) {
    let components: [(&str, f64, Option<f64>); 5] = [
        ("momentum", config.weights.momentum, score_momentum(record)),
        ("squeeze", config.weights.squeeze, score_squeeze(record)),
        ("catalyst", config.weights.catalyst, score_catalyst(record)),
        ("sentiment", config.weights.sentiment, score_sentiment(record)),
        ("technical", config.weights.technical, score_technical(record)),
    ];

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut explains = Vec::new();
    let mut missing_fields = Vec::new();

    for (name, weight, subscore) in components {
        match subscore {
            Some(value) => {
                weighted_sum += value * weight;
                weight_sum += weight;
                explains.push(ComponentExplain { name: name.to_string(), subscore: value, weight });
            }
            None => missing_fields.push(name.to_string()),
        }
    }

    let mut composite = if weight_sum > 0.0 { (weighted_sum / weight_sum).round() } else { 0.0 };
    composite = composite.clamp(0.0, 100.0);
    if cold_tape_active {
        composite = composite.min(config.cold_tape.score_ceiling);
    }

    record.composite_score = composite;
    record.score_explain = ScoreExplain { components: explains, gate_flags: Vec::new(), missing_fields };
}

/// Total order over candidates: composite desc, rel_volume desc, catalyst
/// strength desc, catalyst freshness (lower days_to_event first), ATR% desc,
/// price asc.
pub fn tie_break_cmp(a: &FeatureRecord, b: &FeatureRecord) -> Ordering {
    b.composite_score
        .partial_cmp(&a.composite_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let a_rv = a.technicals.rel_volume.unwrap_or(0.0);
            let b_rv = b.technicals.rel_volume.unwrap_or(0.0);
            b_rv.partial_cmp(&a_rv).unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            let a_strength = a.catalyst.as_ref().map(|c| c.strength).unwrap_or(0.0);
            let b_strength = b.catalyst.as_ref().map(|c| c.strength).unwrap_or(0.0);
            b_strength.partial_cmp(&a_strength).unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            let a_freshness = a.catalyst.as_ref().and_then(|c| c.days_to_event).unwrap_or(f64::INFINITY);
            let b_freshness = b.catalyst.as_ref().and_then(|c| c.days_to_event).unwrap_or(f64::INFINITY);
            a_freshness.partial_cmp(&b_freshness).unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            let a_atr = a.technicals.atr_pct.unwrap_or(0.0);
            let b_atr = b.technicals.atr_pct.unwrap_or(0.0);
            b_atr.partial_cmp(&a_atr).unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            let a_price = a.price.unwrap_or(f64::INFINITY);
            let b_price = b.price.unwrap_or(f64::INFINITY);
            a_price.partial_cmp(&b_price).unwrap_or(Ordering::Equal)
        })
}
