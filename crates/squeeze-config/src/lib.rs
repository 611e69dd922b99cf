//! Typed preset/threshold/weight/tier bundle loaded from environment
//! variables, optionally overridden by a preset JSON file, with a stable
//! SHA-256 digest for run audits.

use serde::{Deserialize, Serialize};
use squeeze_core::EngineError;
use std::env;
use std::path::Path;

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    pub price_min: f64,
    pub float_shares_max: f64,
    pub short_interest_pct_min: f64,
    pub short_interest_pct_preferred: f64,
    pub days_to_cover_min: f64,
    pub days_to_cover_preferred: f64,
    pub borrow_fee_pct_min: f64,
    pub borrow_fee_pct_preferred: f64,
    pub borrow_fee_trend_min_pp_7d: f64,
    pub avg_dollar_liquidity_min: f64,
    pub catalyst_window_days_min: f64,
    pub catalyst_window_days_max: f64,
    pub rsi_buy_min: f64,
    pub rsi_buy_max: f64,
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub atr_pct_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            price_min: env_f64("SQUEEZE_PRICE_MIN", 0.50),
            float_shares_max: env_f64("SQUEEZE_FLOAT_SHARES_MAX", 500_000_000.0),
            short_interest_pct_min: env_f64("SQUEEZE_SI_PCT_MIN", 10.0),
            short_interest_pct_preferred: env_f64("SQUEEZE_SI_PCT_PREFERRED", 20.0),
            days_to_cover_min: env_f64("SQUEEZE_DTC_MIN", 1.0),
            days_to_cover_preferred: env_f64("SQUEEZE_DTC_PREFERRED", 3.0),
            borrow_fee_pct_min: env_f64("SQUEEZE_BORROW_FEE_MIN", 5.0),
            borrow_fee_pct_preferred: env_f64("SQUEEZE_BORROW_FEE_PREFERRED", 8.0),
            borrow_fee_trend_min_pp_7d: env_f64("SQUEEZE_BORROW_FEE_TREND_MIN", 0.0),
            avg_dollar_liquidity_min: env_f64("SQUEEZE_LIQUIDITY_MIN", 500_000.0),
            catalyst_window_days_min: env_f64("SQUEEZE_CATALYST_WINDOW_MIN", 0.0),
            catalyst_window_days_max: env_f64("SQUEEZE_CATALYST_WINDOW_MAX", 30.0),
            rsi_buy_min: env_f64("SQUEEZE_RSI_BUY_MIN", 60.0),
            rsi_buy_max: env_f64("SQUEEZE_RSI_BUY_MAX", 75.0),
            rsi_min: env_f64("SQUEEZE_RSI_MIN", 60.0),
            rsi_max: env_f64("SQUEEZE_RSI_MAX", 75.0),
            atr_pct_min: env_f64("SQUEEZE_ATR_PCT_MIN", 4.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Momentum {
    pub rel_vol_trade_ready: f64,
    pub rel_vol_early: f64,
    pub high_priority_rel_vol: f64,
}

impl Default for Momentum {
    fn default() -> Self {
        Self {
            rel_vol_trade_ready: env_f64("SQUEEZE_REL_VOL_TRADE_READY", 3.0),
            rel_vol_early: env_f64("SQUEEZE_REL_VOL_EARLY", 1.8),
            high_priority_rel_vol: env_f64("SQUEEZE_HIGH_PRIORITY_REL_VOL", 3.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weights {
    pub momentum: f64,
    pub squeeze: f64,
    pub catalyst: f64,
    pub sentiment: f64,
    pub technical: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            momentum: env_f64("SQUEEZE_WEIGHT_MOMENTUM", 0.25),
            squeeze: env_f64("SQUEEZE_WEIGHT_SQUEEZE", 0.20),
            catalyst: env_f64("SQUEEZE_WEIGHT_CATALYST", 0.30),
            sentiment: env_f64("SQUEEZE_WEIGHT_SENTIMENT", 0.15),
            technical: env_f64("SQUEEZE_WEIGHT_TECHNICAL", 0.10),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierRange {
    pub score_min: f64,
    pub score_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tiers {
    pub trade_ready: TierRange,
    pub early_ready: TierRange,
    pub watch: TierRange,
    pub monitor: TierRange,
}

impl Default for Tiers {
    fn default() -> Self {
        Self {
            trade_ready: TierRange {
                score_min: env_f64("SQUEEZE_TIER_TRADE_READY_MIN", 75.0),
                score_max: 100.0,
            },
            early_ready: TierRange {
                score_min: env_f64("SQUEEZE_TIER_EARLY_READY_MIN", 60.0),
                score_max: env_f64("SQUEEZE_TIER_EARLY_READY_MAX", 80.0),
            },
            watch: TierRange { score_min: env_f64("SQUEEZE_TIER_WATCH_MIN", 45.0), score_max: 100.0 },
            monitor: TierRange { score_min: env_f64("SQUEEZE_TIER_MONITOR_MIN", 30.0), score_max: 100.0 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdTapeRelaxation {
    pub rel_vol_trade_ready_delta: f64,
    pub rel_vol_early_delta: f64,
    pub rsi_min_delta: f64,
    pub atr_pct_min_delta: f64,
}

impl Default for ColdTapeRelaxation {
    fn default() -> Self {
        Self {
            rel_vol_trade_ready_delta: env_f64("SQUEEZE_COLDTAPE_RELAX_REL_VOL_TRADE_READY", 0.5),
            rel_vol_early_delta: env_f64("SQUEEZE_COLDTAPE_RELAX_REL_VOL_EARLY", 0.3),
            rsi_min_delta: env_f64("SQUEEZE_COLDTAPE_RELAX_RSI_MIN", 5.0),
            atr_pct_min_delta: env_f64("SQUEEZE_COLDTAPE_RELAX_ATR_PCT_MIN", 1.0),
        }
    }
}

/// Cold-tape trigger/duration config. The *trigger* is a rolling count of
/// consecutive runs, not wall-clock time (see DESIGN.md); `window_sec` only
/// bounds how long a triggered relaxation stays in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdTape {
    pub consecutive_runs_required: usize,
    pub stage_count_ceiling: usize,
    pub window_sec: i64,
    pub score_ceiling: f64,
    pub relaxation: ColdTapeRelaxation,
}

impl Default for ColdTape {
    fn default() -> Self {
        Self {
            consecutive_runs_required: env_usize("SQUEEZE_COLDTAPE_RUNS", 3),
            stage_count_ceiling: env_usize("SQUEEZE_COLDTAPE_STAGE_CEILING", 2),
            window_sec: env_u64("SQUEEZE_COLDTAPE_WINDOW_SECS", 3600) as i64,
            score_ceiling: env_f64("SQUEEZE_COLDTAPE_SCORE_CEILING", 82.0),
            relaxation: ColdTapeRelaxation::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusions {
    pub exclude_halts_today: bool,
    pub max_spread_pct: f64,
}

impl Default for Exclusions {
    fn default() -> Self {
        Self {
            exclude_halts_today: env_bool("SQUEEZE_EXCLUDE_HALTS", true),
            max_spread_pct: env_f64("SQUEEZE_MAX_SPREAD_PCT", 5.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Freshness {
    pub short_interest_max_age_days: f64,
}

impl Default for Freshness {
    fn default() -> Self {
        Self { short_interest_max_age_days: env_f64("SQUEEZE_SI_MAX_AGE_DAYS", 14.0) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub preset: String,
    pub thresholds: Thresholds,
    pub momentum: Momentum,
    pub weights: Weights,
    pub tiers: Tiers,
    pub cold_tape: ColdTape,
    pub exclusions: Exclusions,
    pub freshness: Freshness,

    /// `SCAN_MAX_TICKERS` — caps pre-filter output (default 1200).
    pub scan_max_tickers: usize,
    /// `SKIP_CACHE_WRITES` — disables the provider disk cache mirror.
    pub skip_cache_writes: bool,
    /// Strict-mode: demotes absent-provider from `null` to a startup-fatal
    /// `StrictModeMissingCredential` (fail closed at startup only, never
    /// mid-run — see DESIGN.md).
    pub strict_mode: bool,
    /// `SQUEEZE_REFRESH_INTERVAL_SECS` — scheduler tick cadence.
    pub refresh_interval_secs: u64,
    /// `SQUEEZE_DATA_DIR` — root for `JsonFileSink` and the provider disk cache.
    pub data_dir: String,
    /// `ENGINE_TEST_SYMBOLS` — overrides the universe with a fixed symbol list.
    pub test_symbols: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preset: env_string("SQUEEZE_PRESET", "default"),
            thresholds: Thresholds::default(),
            momentum: Momentum::default(),
            weights: Weights::default(),
            tiers: Tiers::default(),
            cold_tape: ColdTape::default(),
            exclusions: Exclusions::default(),
            freshness: Freshness::default(),
            scan_max_tickers: env_usize("SCAN_MAX_TICKERS", 1_200),
            skip_cache_writes: env_bool("SKIP_CACHE_WRITES", false),
            strict_mode: env_bool("SQUEEZE_STRICT_MODE", false),
            refresh_interval_secs: env_u64("SQUEEZE_REFRESH_INTERVAL_SECS", 60),
            data_dir: env_string("SQUEEZE_DATA_DIR", "./data"),
            test_symbols: env::var("ENGINE_TEST_SYMBOLS").ok().map(|v| {
                v.split(',').map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()).collect()
            }),
        }
    }
}

impl EngineConfig {
    /// Build the config bundle from environment variables, then — if
    /// `SQUEEZE_CONFIG_PATH` is set — merge a preset JSON file over it. A
    /// missing env var never fails; a malformed preset file is `ConfigInvalid`.
    pub fn from_env() -> Result<Self, EngineError> {
        let base = Self::default();
        match env::var("SQUEEZE_CONFIG_PATH") {
            Ok(path) => {
                tracing::info!(path, "loading preset file override");
                base.merge_preset_file(Path::new(&path))
            }
            Err(_) => Ok(base),
        }
    }

    fn merge_preset_file(self, path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigInvalid(format!("cannot read {}: {e}", path.display())))?;
        let overrides: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| EngineError::ConfigInvalid(format!("malformed preset JSON {}: {e}", path.display())))?;

        let mut base_value = serde_json::to_value(&self)
            .map_err(|e| EngineError::ConfigInvalid(format!("internal config serialization error: {e}")))?;
        merge_json(&mut base_value, &overrides);

        let merged = serde_json::from_value(base_value)
            .map_err(|e| EngineError::ConfigInvalid(format!("preset override produced invalid config: {e}")))?;
        tracing::debug!(path = %path.display(), "preset file merged into config");
        Ok(merged)
    }

    /// Stable SHA-256 hex fingerprint of the fully-resolved config bundle,
    /// recorded on `Run` for audit reproducibility.
    pub fn digest(&self) -> String {
        use sha2::{Digest, Sha256};
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Recursive merge: every key present in `overrides` replaces or deep-merges
/// into `base`. Arrays and scalars are replaced wholesale; objects merge key-by-key.
fn merge_json(base: &mut serde_json::Value, overrides: &serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(override_map)) => {
            for (k, v) in override_map {
                merge_json(base_map.entry(k.clone()).or_insert(serde_json::Value::Null), v);
            }
        }
        (base_slot, v) => {
            *base_slot = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_across_two_loads_of_the_same_env() {
        let a = EngineConfig::default();
        let b = EngineConfig::default();
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn digest_changes_when_a_weight_changes() {
        let mut a = EngineConfig::default();
        let b = a.clone();
        a.weights.momentum += 0.01;
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn malformed_preset_file_is_config_invalid_not_a_panic() {
        let path = tempfile_with(b"{ not json").unwrap();
        let err = EngineConfig::default().merge_preset_file(&path).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));
    }

    #[test]
    fn preset_file_overrides_a_single_threshold() {
        let path = tempfile_with(br#"{"thresholds":{"price_min":1.25}}"#).unwrap();
        let cfg = EngineConfig::default().merge_preset_file(&path).unwrap();
        assert_eq!(cfg.thresholds.price_min, 1.25);
        // Untouched fields survive the merge.
        assert_eq!(cfg.thresholds.float_shares_max, 500_000_000.0);
    }

    fn tempfile_with(bytes: &[u8]) -> std::io::Result<std::path::PathBuf> {
        use std::io::Write as _;
        let path = std::env::temp_dir().join(format!(
            "squeeze-config-test-{}-{}.json",
            std::process::id(),
            bytes.len()
        ));
        let mut f = std::fs::File::create(&path)?;
        f.write_all(bytes)?;
        Ok(path)
    }
}
