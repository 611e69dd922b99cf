//! Pure bar-array → scalar/series functions, reused by the enrichment
//! orchestrator (to populate `Technicals`) and by the scorer's technical
//! component. No I/O, no async, so every function here is directly
//! unit-testable with literal fixtures.

use squeeze_core::Bar;

#[inline]
fn finite_or(val: f64, default: f64) -> f64 {
    if val.is_finite() {
        val
    } else {
        default
    }
}

/// Cumulative typical-price-weighted VWAP over the given bars, session-scoped
/// (callers pass only today's bars). Returns the running VWAP as of the last bar.
pub fn vwap(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    let mut cumulative_tpv = 0.0;
    let mut cumulative_volume = 0.0;
    for bar in bars {
        let typical_price = (bar.high + bar.low + bar.close) / 3.0;
        cumulative_tpv += typical_price * bar.volume;
        cumulative_volume += bar.volume;
    }
    if cumulative_volume <= 0.0 {
        return None;
    }
    Some(finite_or(cumulative_tpv / cumulative_volume, bars.last()?.close))
}

/// Exponential moving average series: SMA-seeded warm-up, then exponential
/// smoothing. The first `period` slots are filled with the seed SMA so the
/// output length matches the input length.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return vec![];
    }
    if values.len() < period {
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        return vec![finite_or(avg, 0.0)];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let sma_seed = finite_or(values[..period].iter().sum::<f64>() / period as f64, 0.0);

    let mut result = Vec::with_capacity(values.len());
    for _ in 0..period {
        result.push(sma_seed);
    }
    for i in period..values.len() {
        let prev = result[i - 1];
        let next = (values[i] - prev) * multiplier + prev;
        result.push(finite_or(next, prev));
    }
    result
}

/// Latest value of an EMA series, or `None` if there isn't enough data.
pub fn ema_latest(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

/// Wilder-smoothed RSI series (period defaults to 14).
pub fn rsi_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(values.len() - 1);
    let mut losses = Vec::with_capacity(values.len() - 1);
    for i in 1..values.len() {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(gains.len().saturating_sub(period));
    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        let rs = if avg_loss == 0.0 { 100.0 } else { avg_gain / avg_loss };
        out.push(finite_or(100.0 - (100.0 / (1.0 + rs)), 50.0));
    }
    out
}

pub fn rsi_latest(values: &[f64], period: usize) -> Option<f64> {
    rsi_series(values, period).last().copied()
}

/// Wilder-smoothed ATR expressed as a percentage of the latest close.
pub fn atr_pct(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let mut true_ranges = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let high_low = bars[i].high - bars[i].low;
        let high_close = (bars[i].high - bars[i - 1].close).abs();
        let low_close = (bars[i].low - bars[i - 1].close).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    for tr in &true_ranges[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
    }

    let last_close = bars.last()?.close;
    if last_close <= 0.0 {
        return None;
    }
    Some(finite_or(100.0 * atr / last_close, 0.0))
}

/// Relative volume: session-to-date volume divided by ADV30. Returns `None`
/// when `adv_30d_shares` is absent or non-positive — relative volume is
/// never silently defaulted to zero.
pub fn relative_volume(minute_bars_today: &[Bar], adv_30d_shares: Option<f64>) -> Option<f64> {
    let adv = adv_30d_shares?;
    if adv <= 0.0 {
        return None;
    }
    let session_volume: f64 = minute_bars_today.iter().map(|b| b.volume).sum();
    Some(session_volume / adv)
}

/// Simple percentage price change over the last `lookback` bars (typically a
/// 1/5/30-day lookback). `bars` is assumed to be ordered oldest-to-newest
/// daily bars; returns `None` if there isn't enough history.
pub fn price_change_pct(bars: &[Bar], lookback: usize) -> Option<f64> {
    if bars.len() <= lookback {
        return None;
    }
    let now = bars.last()?.close;
    let then = bars[bars.len() - 1 - lookback].close;
    if then == 0.0 {
        return None;
    }
    Some(100.0 * (now - then) / then)
}

/// `price > vwap > 0` — the single boolean signal several gates and the
/// action mapper key off of.
pub fn vwap_held_or_reclaimed(price: f64, vwap: f64) -> bool {
    vwap > 0.0 && price > vwap
}
