//! FINRA short-volume tape: a file keyed by trading day, stepped back up to 5
//! market days when the latest file or the symbol's row within it is absent.
//! `aggregate_short_volume` is the pure dedup-by-summing rule, tested
//! independently of file I/O.

use crate::ports::FinraTapeProvider;
use crate::records::FinraTapeRow;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use std::path::PathBuf;

/// Sums `short_volume`/`total_volume` across every row matching `symbol` *before*
/// computing the ratio, so multiple same-day venue rows for one symbol don't
/// overwrite one another.
pub fn aggregate_short_volume(rows: &[FinraTapeRow], symbol: &str) -> Option<(f64, f64)> {
    let matching: Vec<&FinraTapeRow> = rows.iter().filter(|r| r.symbol.eq_ignore_ascii_case(symbol)).collect();
    if matching.is_empty() {
        return None;
    }
    let short: f64 = matching.iter().map(|r| r.short_volume).sum();
    let total: f64 = matching.iter().map(|r| r.total_volume).sum();
    Some((short, total))
}

fn step_back_one_trading_day(date: NaiveDate) -> NaiveDate {
    let mut d = date - chrono::Duration::days(1);
    while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
        d -= chrono::Duration::days(1);
    }
    d
}

pub struct FileFinraTapeProvider {
    dir: PathBuf,
}

impl FileFinraTapeProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("finra_shortvol_{}.json", date.format("%Y%m%d")))
    }

    async fn load_rows(&self, date: NaiveDate) -> Option<Vec<FinraTapeRow>> {
        let contents = tokio::fs::read_to_string(self.file_path(date)).await.ok()?;
        serde_json::from_str(&contents).ok()
    }
}

#[async_trait]
impl FinraTapeProvider for FileFinraTapeProvider {
    async fn get_for_symbol(&self, ticker: &str, asof: DateTime<Utc>) -> Option<(f64, f64)> {
        let mut date = asof.date_naive();
        for attempt in 0..5 {
            if attempt > 0 {
                date = step_back_one_trading_day(date);
            }
            if let Some(rows) = self.load_rows(date).await {
                if let Some(agg) = aggregate_short_volume(&rows, ticker) {
                    return Some(agg);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, short: f64, total: f64) -> FinraTapeRow {
        FinraTapeRow { symbol: symbol.to_string(), short_volume: short, total_volume: total }
    }

    #[test]
    fn sums_duplicate_same_day_rows_before_computing_the_ratio() {
        let rows = vec![row("QUX", 10_000_000.0, 30_000_000.0), row("QUX", 20_000_000.0, 50_000_000.0)];
        let (short, total) = aggregate_short_volume(&rows, "QUX").unwrap();
        assert_eq!(short, 30_000_000.0);
        assert_eq!(total, 80_000_000.0);
        assert!((short / total - 0.375).abs() < 1e-9);
    }

    #[test]
    fn ignores_rows_for_other_symbols() {
        let rows = vec![row("AAA", 1.0, 2.0), row("BBB", 100.0, 200.0)];
        let (short, total) = aggregate_short_volume(&rows, "AAA").unwrap();
        assert_eq!((short, total), (1.0, 2.0));
    }

    #[test]
    fn absent_symbol_is_none() {
        let rows = vec![row("AAA", 1.0, 2.0)];
        assert!(aggregate_short_volume(&rows, "ZZZ").is_none());
    }

    #[test]
    fn step_back_skips_weekends() {
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 18).unwrap();
        assert_eq!(saturday.weekday(), Weekday::Sat);
        let monday = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        assert_eq!(step_back_one_trading_day(monday), NaiveDate::from_ymd_opt(2025, 1, 17).unwrap());
    }

    #[tokio::test]
    async fn steps_back_through_missing_files_to_find_the_symbol() {
        let dir = std::env::temp_dir().join(format!("squeeze-finra-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let provider = FileFinraTapeProvider::new(dir.clone());

        let asof = Utc::now();
        let two_days_back = step_back_one_trading_day(step_back_one_trading_day(asof.date_naive()));
        let path = dir.join(format!("finra_shortvol_{}.json", two_days_back.format("%Y%m%d")));
        tokio::fs::write(&path, serde_json::to_string(&vec![row("QUX", 30_000_000.0, 80_000_000.0)]).unwrap())
            .await
            .unwrap();

        let result = provider.get_for_symbol("QUX", asof).await;
        assert_eq!(result, Some((30_000_000.0, 80_000_000.0)));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
