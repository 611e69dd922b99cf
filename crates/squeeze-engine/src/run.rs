//! Sequences universe selection, pre-filtering, enrichment, gating, scoring,
//! and action mapping into one audited `Run`.

use crate::sink::DiscoverySink;
use chrono::{DateTime, Utc};
use squeeze_actions::map_action;
use squeeze_config::EngineConfig;
use squeeze_core::{EntryHint, RiskLevels, Run};
use squeeze_gates::{apply_gates, ColdTapeDetector};
use squeeze_orchestrator::{build_universe, enrich, prefilter_heuristic, prefilter_snapshot, ProviderBundle};
use squeeze_providers::ConcurrencyHarness;
use squeeze_scorer::{score_composite, tie_break_cmp};
use std::collections::HashSet;
use std::time::Duration;

/// Everything a run needs beyond the config bundle: provider façades, the
/// concurrency harness they share, the broker's tradeable-symbol listing and
/// current holdings, the cold-tape detector's rolling state, and the sink the
/// finished run is persisted through.
pub struct RunContext<'a> {
    pub providers: &'a ProviderBundle,
    pub harness: &'a ConcurrencyHarness,
    pub broker_symbols: Vec<String>,
    pub holdings: HashSet<String>,
    pub cold_tape: &'a mut ColdTapeDetector,
    pub sink: &'a dyn DiscoverySink,
}

const SNAPSHOT_BUDGET: Duration = Duration::from_secs(10);
const ENRICHMENT_BUDGET: Duration = Duration::from_secs(30);

pub async fn run(asof: DateTime<Utc>, config: &EngineConfig, ctx: &mut RunContext<'_>) -> Run {
    let config_digest = config.digest();

    let universe = build_universe(ctx.broker_symbols.clone(), &ctx.holdings, config.test_symbols.as_deref());
    let universe_count = universe.len();

    let quote_provider = ctx.providers.quote.clone();
    let snapshots = ctx
        .harness
        .fetch_all(&universe, SNAPSHOT_BUDGET, move |t| {
            let quote_provider = quote_provider.clone();
            async move { quote_provider.get(&t).await }
        })
        .await;

    let prefiltered = if snapshots.is_empty() {
        prefilter_heuristic(&universe, config.scan_max_tickers)
    } else {
        prefilter_snapshot(&universe, &snapshots, config.scan_max_tickers)
    };
    let prefiltered_count = prefiltered.len();

    let enriched = enrich(prefiltered, &ctx.holdings, ctx.providers, ctx.harness, ENRICHMENT_BUDGET, asof).await;
    let enriched_count = enriched.len();

    let relaxation_active = ctx.cold_tape.is_relaxation_active();
    let mut gate_output = apply_gates(enriched, config, relaxation_active);

    for record in &mut gate_output.survivors {
        score_composite(record, config, relaxation_active);
        map_action(record, config, relaxation_active);

        record.entry_hint = Some(if record.technicals.vwap_held_or_reclaimed {
            EntryHint::VwapReclaim
        } else {
            EntryHint::BaseBreakout
        });
        record.risk = record.price.map(|price| RiskLevels {
            stop_loss: 0.90 * price,
            tp1: 1.20 * price,
            tp2: 1.50 * price,
        });
    }
    gate_output.survivors.sort_by(tie_break_cmp);

    ctx.cold_tape.record_run(gate_output.counts.clone());

    let run = Run {
        run_id: format!("run-{}", asof.timestamp_millis()),
        asof,
        preset: config.preset.clone(),
        config_digest,
        universe_count,
        prefiltered_count,
        enriched_count,
        passed_count: gate_output.survivors.len(),
        gate_counts: gate_output.counts,
        relaxation_active,
        candidates: gate_output.survivors,
        drops: gate_output.drops,
        cancelled: false,
    };

    if let Err(e) = ctx.sink.record(&run).await {
        tracing::warn!(error = %e, run_id = %run.run_id, "discovery sink failed to persist run");
    }

    run
}
