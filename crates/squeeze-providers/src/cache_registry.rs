//! Owned per-engine-instance cache state, never a global or static. One
//! `TtlCache` per provider kind, plus an optional disk mirror for the
//! long-TTL kinds (fundamentals, liquidity, borrow, short interest,
//! catalyst) following the `<root>/data/providers/<name>.json` file
//! convention.

use crate::records::{
    BorrowRecord, CatalystRecord, FundamentalsRecord, LiquidityRecord, ShortInterestRecord,
};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use squeeze_core::TtlCache;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const FUNDAMENTALS_TTL_SECS: i64 = 4 * 3600;
const LIQUIDITY_TTL_SECS: i64 = 24 * 3600;
const BORROW_TTL_SECS: i64 = 4 * 3600;
const SHORT_INTEREST_TTL_SECS: i64 = 24 * 3600;
const CATALYST_TTL_SECS: i64 = 12 * 3600;

pub struct CacheRegistry {
    pub fundamentals: TtlCache<FundamentalsRecord>,
    pub liquidity: TtlCache<LiquidityRecord>,
    pub borrow: TtlCache<BorrowRecord>,
    pub short_interest: TtlCache<ShortInterestRecord>,
    pub catalyst: TtlCache<CatalystRecord>,

    data_dir: Option<PathBuf>,
    skip_cache_writes: bool,
    file_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheRegistry {
    pub fn new(data_dir: Option<impl Into<PathBuf>>, skip_cache_writes: bool) -> Self {
        Self {
            fundamentals: TtlCache::new(FUNDAMENTALS_TTL_SECS),
            liquidity: TtlCache::new(LIQUIDITY_TTL_SECS),
            borrow: TtlCache::new(BORROW_TTL_SECS),
            short_interest: TtlCache::new(SHORT_INTEREST_TTL_SECS),
            catalyst: TtlCache::new(CATALYST_TTL_SECS),
            data_dir: data_dir.map(Into::into),
            skip_cache_writes,
            file_locks: DashMap::new(),
        }
    }

    fn mirror_path(&self, provider_name: &str) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|root| root.join("providers").join(format!("{provider_name}.json")))
    }

    /// Upsert `ticker -> value` into `<data_dir>/providers/<provider_name>.json`,
    /// writing via a temp-file-then-rename so a crash mid-write never corrupts the
    /// mirror. No-op when `skip_cache_writes` is set or the directory can't be created.
    pub async fn mirror_to_disk<T: Serialize + DeserializeOwned + Clone>(
        &self,
        provider_name: &str,
        ticker: &str,
        value: &T,
    ) {
        if self.skip_cache_writes {
            return;
        }
        let Some(path) = self.mirror_path(provider_name) else { return };

        let lock = self
            .file_locks
            .entry(provider_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                return;
            }
        }

        let mut map: std::collections::BTreeMap<String, T> = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => std::collections::BTreeMap::new(),
        };
        map.insert(ticker.to_uppercase(), value.clone());

        let Ok(rendered) = serde_json::to_string_pretty(&map) else { return };
        let tmp_path = path.with_extension("json.tmp");
        if tokio::fs::write(&tmp_path, rendered).await.is_ok() {
            let _ = tokio::fs::rename(&tmp_path, &path).await;
        }
    }
}
