//! Boots the discovery engine and ticks `run()` on a refresh cadence: dotenv,
//! tracing init, panic hook, config load, then a `tokio::time::interval` loop
//! racing `tokio::select!` against SIGINT/SIGTERM.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use squeeze_config::EngineConfig;
use squeeze_engine::{run, JsonFileSink, NullSink, RunContext};
use squeeze_gates::ColdTapeDetector;
use squeeze_orchestrator::ProviderBundle;
use squeeze_providers::{CacheRegistry, ConcurrencyHarness, FileFinraTapeProvider, HttpProviderClient};
use tokio::signal::unix::SignalKind;
use tokio::time;

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting squeeze discovery engine");

    let config = EngineConfig::from_env()?;
    tracing::info!(preset = %config.preset, digest = %config.digest(), "configuration loaded");

    // The provider vendor(s) are an external collaborator named only by interface;
    // `SQUEEZE_PROVIDER_BASE_URL` points at whatever gateway fronts
    // fundamentals/liquidity/borrow/short-interest/catalyst/quotes/bars for this
    // deployment. Strict mode fails closed here, at startup, never mid-run.
    let base_url = std::env::var("SQUEEZE_PROVIDER_BASE_URL").unwrap_or_else(|_| "https://example-provider.invalid".to_string());
    let api_key = std::env::var("SQUEEZE_PROVIDER_API_KEY").ok();
    squeeze_providers::http_provider::require_credential_in_strict_mode(config.strict_mode, &api_key, "market-data-provider")?;

    let cache = Arc::new(CacheRegistry::new(Some(config.data_dir.clone()), config.skip_cache_writes));
    let client = Arc::new(HttpProviderClient::new(base_url, api_key, cache, 4)?);
    let finra = Arc::new(FileFinraTapeProvider::new(format!("{}/finra", config.data_dir)));

    let providers = ProviderBundle {
        fundamentals: client.clone(),
        liquidity: client.clone(),
        borrow: client.clone(),
        short_interest: client.clone(),
        catalyst: client.clone(),
        quote: client.clone(),
        bars: client.clone(),
        finra,
    };
    let harness = ConcurrencyHarness::new(4, Duration::from_secs(10));

    let sink: Arc<dyn squeeze_engine::DiscoverySink> = if config.data_dir.is_empty() {
        Arc::new(NullSink)
    } else {
        Arc::new(JsonFileSink::new(config.data_dir.clone()))
    };

    let mut cold_tape = ColdTapeDetector::new(config.cold_tape.consecutive_runs_required, config.cold_tape.stage_count_ceiling);

    // Broker-provided tradeable-symbol listing is out of scope here: absent
    // an `ENGINE_TEST_SYMBOLS` override the universe is empty until an external
    // broker façade is wired in by the deploying team.
    let broker_symbols = config.test_symbols.clone().unwrap_or_default();
    let holdings: HashSet<String> = HashSet::new();

    let run_in_flight = Arc::new(AtomicBool::new(false));
    let mut interval = time::interval(Duration::from_secs(config.refresh_interval_secs));
    // A run that overruns the refresh cadence should skip the backlog of ticks it
    // missed, not replay them back-to-back once it finishes.
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { tracing::info!("received SIGINT"); }
            _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if run_in_flight.swap(true, Ordering::SeqCst) {
                    tracing::warn!("previous run still in flight; coalescing this tick");
                    continue;
                }

                let asof = chrono::Utc::now();
                let mut ctx = RunContext {
                    providers: &providers,
                    harness: &harness,
                    broker_symbols: broker_symbols.clone(),
                    holdings: holdings.clone(),
                    cold_tape: &mut cold_tape,
                    sink: sink.as_ref(),
                };
                let result = run(asof, &config, &mut ctx).await;
                tracing::info!(
                    run_id = %result.run_id,
                    universe = result.universe_count,
                    prefiltered = result.prefiltered_count,
                    enriched = result.enriched_count,
                    passed = result.passed_count,
                    relaxation_active = result.relaxation_active,
                    "run complete"
                );
                run_in_flight.store(false, Ordering::SeqCst);
            }
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
