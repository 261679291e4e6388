//! Offline backtest pipeline: catalog, load, parse, aggregate, persist.

use super::candle::parse_candles;
use super::catalog::discover;
use super::error::BacktestError;
use super::metrics::{Metrics, SummaryRow};
use crate::ports::history_port::{HistoryPort, HistoryWindow};
use crate::ports::report_port::ReportPort;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub const SUMMARY_FILE: &str = "backtest_report.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub data_root: PathBuf,
    pub output_root: PathBuf,
    pub per_coin_logs: bool,
    /// Coin directory names to keep; `None` keeps every coin.
    pub coins: Option<BTreeSet<String>>,
}

/// One orchestrator invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub output_root: PathBuf,
}

impl BacktestRun {
    pub fn begin(output_root: PathBuf) -> Self {
        Self {
            started_at: now_epoch(),
            finished_at: None,
            output_root,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(now_epoch());
    }
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub run: BacktestRun,
    pub rows: Vec<SummaryRow>,
    pub summary_path: PathBuf,
}

/// Current time in whole epoch seconds.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Runs the full pipeline over every dataset under `config.data_root`.
///
/// Aborts with [`BacktestError::NoDatasetsFound`] before writing anything
/// when discovery comes back empty. Loader failures only affect their own
/// dataset, which is then reported with zero samples. Write failures end
/// the run.
pub fn run_backtest(
    config: &BacktestConfig,
    history: &dyn HistoryPort,
    writer: &dyn ReportPort,
) -> Result<BacktestReport, BacktestError> {
    let mut run = BacktestRun::begin(config.output_root.clone());
    let catalog = discover(&config.data_root, config.coins.as_ref())?;

    log::info!(
        "Backtesting {} datasets from {} ({} source)",
        catalog.len(),
        config.data_root.display(),
        history.source()
    );

    let mut rows: Vec<SummaryRow> = Vec::with_capacity(catalog.len());
    let mut per_coin: BTreeMap<String, Vec<SummaryRow>> = BTreeMap::new();

    for (timeframe, coin) in catalog.datasets() {
        let started_at = now_epoch();
        let raw_rows = match history.load_history(coin, timeframe, HistoryWindow::full()) {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("{coin} {timeframe}: {e}");
                Vec::new()
            }
        };

        let candles = parse_candles(&raw_rows);
        log::debug!(
            "{coin} {timeframe}: {} candles parsed, {} rows dropped",
            candles.len(),
            raw_rows.len() - candles.len()
        );
        let metrics = Metrics::aggregate(&candles);
        log::info!(
            "{coin} {timeframe}: {} samples, win rate {:.4}",
            metrics.samples,
            metrics.win_rate
        );

        let row = SummaryRow::new(coin, timeframe, metrics);
        per_coin.entry(coin.to_string()).or_default().push(row.clone());
        rows.push(row);

        writer.persist(&run, coin, timeframe, &metrics, &raw_rows, started_at)?;
    }

    writer.write_summary(&config.output_root, &rows)?;

    if config.per_coin_logs {
        for (coin, entries) in &per_coin {
            writer.write_coin_log(&config.output_root, coin, entries)?;
        }
    }

    run.finish();
    Ok(BacktestReport {
        run,
        rows,
        summary_path: config.output_root.join(SUMMARY_FILE),
    })
}
