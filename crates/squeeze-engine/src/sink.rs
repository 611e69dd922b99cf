//! The run controller calls this at the end of a run to persist the result.
//! A real database-backed sink is an external collaborator; two in-tree
//! implementations cover tests and the file-backed default.

use async_trait::async_trait;
use squeeze_core::Run;
use std::path::PathBuf;

#[async_trait]
pub trait DiscoverySink: Send + Sync {
    async fn record(&self, run: &Run) -> anyhow::Result<()>;
}

/// Default sink for tests and for any caller that doesn't need persistence.
pub struct NullSink;

#[async_trait]
impl DiscoverySink for NullSink {
    async fn record(&self, _run: &Run) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes one pretty-printed JSON file per run under `<data_dir>/providers/`,
/// matching the provider disk cache's file-layout convention.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { dir: data_dir.into().join("providers") }
    }
}

#[async_trait]
impl DiscoverySink for JsonFileSink {
    async fn record(&self, run: &Run) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("run-{}.json", run.run_id));
        let body = serde_json::to_string_pretty(run)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}
