//! Artifact and report writing port trait.

use crate::domain::backtest::BacktestRun;
use crate::domain::candle::RawRecord;
use crate::domain::error::BacktestError;
use crate::domain::metrics::{Metrics, SummaryRow};
use std::path::Path;

/// Port for persisting backtest output.
///
/// Every write replaces what a previous run left at the same path.
pub trait ReportPort {
    /// Writes the per-(coin, timeframe) artifacts and status record.
    fn persist(
        &self,
        run: &BacktestRun,
        coin: &str,
        timeframe: &str,
        metrics: &Metrics,
        raw_rows: &[RawRecord],
        started_at: i64,
    ) -> Result<(), BacktestError>;

    /// Writes `backtest_report.csv` under `output_root`.
    fn write_summary(&self, output_root: &Path, rows: &[SummaryRow]) -> Result<(), BacktestError>;

    /// Writes `<coin>/backtest_log.csv`; does nothing for an empty `entries`.
    fn write_coin_log(
        &self,
        output_root: &Path,
        coin: &str,
        entries: &[SummaryRow],
    ) -> Result<(), BacktestError>;
}
