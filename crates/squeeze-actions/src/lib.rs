//! First-match-wins tier rules, the strong-tape guard override, and the
//! technical-confirmation downgrade check.

use squeeze_config::EngineConfig;
use squeeze_core::{Action, FeatureRecord, Tier};

fn price_at_or_above_vwap(record: &FeatureRecord) -> bool {
    matches!((record.price, record.technicals.vwap), (Some(p), Some(v)) if v > 0.0 && p >= v)
}

fn technical_confirmation_count(record: &FeatureRecord, config: &EngineConfig) -> usize {
    let checks = [
        record.technicals.vwap_held_or_reclaimed,
        record.technicals.ema9.zip(record.technicals.ema20).is_some_and(|(e9, e20)| e9 >= e20),
        record.technicals.atr_pct.is_some_and(|atr| atr >= config.thresholds.atr_pct_min),
        record
            .technicals
            .rsi
            .is_some_and(|rsi| rsi >= config.thresholds.rsi_buy_min && rsi <= config.thresholds.rsi_buy_max),
    ];
    checks.iter().filter(|&&c| c).count()
}

/// Maps the record's composite/tier-flags/catalyst/cold-tape state to a tier and
/// action, applying the strong-tape guard and technical-confirmation downgrade
/// last. Mutates `record.tier` and `record.action` in place.
pub fn map_action(record: &mut FeatureRecord, config: &EngineConfig, cold_tape_active: bool) {
    let composite = record.composite_score;
    let above_vwap = record.technicals.vwap_held_or_reclaimed;

    let (tier, mut action) = if composite >= config.tiers.trade_ready.score_min
        && above_vwap
        && record.pass_trade_ready
        && !cold_tape_active
    {
        (Tier::TradeReady, Action::Buy)
    } else if composite >= config.tiers.early_ready.score_min
        && composite <= config.tiers.early_ready.score_max
        && record.pass_early
    {
        (Tier::EarlyReady, Action::EarlyReady)
    } else if composite >= config.tiers.watch.score_min {
        (Tier::Watch, Action::Watchlist)
    } else if composite >= config.tiers.monitor.score_min
        || (record.technicals.rel_volume.is_some_and(|rv| rv >= 3.0) && above_vwap)
    {
        (Tier::Monitor, Action::Monitor)
    } else {
        (Tier::None, Action::NoAction)
    };

    let strong_tape = record.technicals.rel_volume.is_some_and(|rv| rv >= 5.0)
        && price_at_or_above_vwap(record)
        && composite >= config.tiers.watch.score_min - 5.0;
    if strong_tape {
        action = Action::Buy;
    }

    if action == Action::Buy && technical_confirmation_count(record, config) < 2 {
        action = Action::Watchlist;
    }

    record.tier = tier;
    record.action = action;
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeeze_core::Technicals;

    fn candidate(composite: f64) -> FeatureRecord {
        let mut r = FeatureRecord::new("TEST");
        r.composite_score = composite;
        r.price = Some(5.0);
        r
    }

    #[test]
    fn trade_ready_maps_to_buy_when_all_conditions_hold() {
        let mut r = candidate(80.0);
        r.pass_trade_ready = true;
        r.technicals = Technicals {
            vwap_held_or_reclaimed: true,
            vwap: Some(4.8),
            ema9: Some(5.1),
            ema20: Some(5.0),
            atr_pct: Some(6.0),
            rsi: Some(68.0),
            ..Default::default()
        };
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.tier, Tier::TradeReady);
        assert_eq!(r.action, Action::Buy);
    }

    #[test]
    fn cold_tape_blocks_trade_ready_even_with_strong_signals() {
        let mut r = candidate(80.0);
        r.pass_trade_ready = true;
        r.technicals.vwap_held_or_reclaimed = true;
        map_action(&mut r, &EngineConfig::default(), true);
        assert_ne!(r.tier, Tier::TradeReady);
    }

    #[test]
    fn early_ready_maps_within_its_score_band() {
        let mut r = candidate(65.0);
        r.pass_early = true;
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.tier, Tier::EarlyReady);
        assert_eq!(r.action, Action::EarlyReady);
    }

    #[test]
    fn watch_tier_below_early_ready_band() {
        let mut r = candidate(50.0);
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.tier, Tier::Watch);
        assert_eq!(r.action, Action::Watchlist);
    }

    #[test]
    fn monitor_tier_fires_on_relvolume_and_vwap_even_below_monitor_floor() {
        let mut r = candidate(10.0);
        r.technicals.rel_volume = Some(4.0);
        r.technicals.vwap_held_or_reclaimed = true;
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.tier, Tier::Monitor);
    }

    #[test]
    fn no_action_below_every_floor() {
        let mut r = candidate(5.0);
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.tier, Tier::None);
        assert_eq!(r.action, Action::NoAction);
    }

    #[test]
    fn strong_tape_guard_upgrades_to_buy_regardless_of_tier() {
        let mut r = candidate(42.0);
        r.technicals.rel_volume = Some(6.0);
        r.technicals.vwap = Some(4.0);
        r.price = Some(4.5);
        r.technicals.vwap_held_or_reclaimed = true;
        r.technicals.ema9 = Some(4.6);
        r.technicals.ema20 = Some(4.4);
        r.technicals.atr_pct = Some(5.0);
        r.technicals.rsi = Some(65.0);
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.action, Action::Buy);
    }

    #[test]
    fn buy_without_two_technical_confirmations_downgrades_to_watchlist() {
        let mut r = candidate(80.0);
        r.pass_trade_ready = true;
        r.technicals.vwap_held_or_reclaimed = true;
        // No EMA cross, no ATR floor, no RSI band: only one confirmation present.
        map_action(&mut r, &EngineConfig::default(), false);
        assert_eq!(r.action, Action::Watchlist);
    }
}
