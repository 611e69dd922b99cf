//! Turns a broker ticker listing into a fully-enriched `FeatureRecord` per
//! candidate, ready for the gate engine.

pub mod enrichment;
pub mod universe;

pub use enrichment::{enrich, ProviderBundle};
pub use universe::{build_universe, exclude_non_standard_tickers, prefilter_heuristic, prefilter_snapshot, BrokerUniverseProvider};
