//! Typed façades over each external market-data source, an owned
//! per-engine-instance cache registry, and the bounded-concurrency fan-out
//! primitive the enrichment orchestrator runs every provider batch through.

pub mod cache_registry;
pub mod concurrency;
pub mod finra;
pub mod http_provider;
pub mod ports;
pub mod records;

pub use cache_registry::CacheRegistry;
pub use concurrency::ConcurrencyHarness;
pub use finra::{aggregate_short_volume, FileFinraTapeProvider};
pub use http_provider::HttpProviderClient;
pub use ports::{
    BarsProvider, BorrowProvider, CatalystProvider, FinraTapeProvider, FundamentalsProvider,
    LiquidityProvider, QuoteProvider, ShortInterestProvider,
};
pub use records::{
    BarsRecord, BorrowRecord, CatalystRecord, FinraTapeRow, FundamentalsRecord, LiquidityRecord,
    QuoteRecord, ShortInterestRecord,
};
