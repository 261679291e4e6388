//! Filesystem writer for backtest artifacts and reports.
//!
//! Layout under the run's output root:
//!
//! ```text
//! backtest_report.csv
//! <coin>/backtest_log.csv
//! <coin>/<timeframe>/memories_<timeframe>.txt
//! <coin>/<timeframe>/memory_weights_<timeframe>.txt
//! <coin>/<timeframe>/neural_perfect_threshold_<timeframe>.txt
//! <coin>/<timeframe>/trainer_status.json
//! ```

use crate::domain::backtest::{BacktestRun, SUMMARY_FILE, now_epoch};
use crate::domain::candle::RawRecord;
use crate::domain::error::BacktestError;
use crate::domain::metrics::{Metrics, SUMMARY_HEADER, SummaryRow};
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const COIN_LOG_FILE: &str = "backtest_log.csv";
pub const STATUS_FILE: &str = "trainer_status.json";
pub const MEMORY_DELIMITER: &str = "~";
pub const WEIGHT_COUNT: usize = 10;

#[derive(Debug, Serialize)]
struct StatusRecord<'a> {
    coin: &'a str,
    state: &'static str,
    started_at: i64,
    finished_at: i64,
    timestamp: i64,
    mode: &'static str,
}

/// Shortest round-trip form, keeping `.0` on integral values. Exponents are
/// signed and at least two digits wide (`5e-05`, `1e+16`).
fn format_value(value: f64) -> String {
    let repr = format!("{value:?}");
    match repr.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            Err(_) => repr,
        },
        None => repr,
    }
}

fn write_file(path: PathBuf, contents: &str) -> Result<(), BacktestError> {
    fs::write(&path, contents).map_err(|e| BacktestError::unwritable(path, e))
}

fn create_dir(path: &Path) -> Result<(), BacktestError> {
    fs::create_dir_all(path).map_err(|e| BacktestError::unwritable(path, e))
}

fn write_csv<const N: usize>(
    path: &Path,
    header: &[&str],
    records: impl Iterator<Item = [String; N]>,
) -> Result<(), BacktestError> {
    let unwritable = |e: csv::Error| BacktestError::unwritable(path, std::io::Error::from(e));
    let mut wtr = csv::Writer::from_path(path).map_err(unwritable)?;
    wtr.write_record(header).map_err(unwritable)?;
    for record in records {
        wtr.write_record(&record).map_err(unwritable)?;
    }
    wtr.flush().map_err(|e| BacktestError::unwritable(path, e))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileArtifactWriter;

impl FileArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for FileArtifactWriter {
    fn persist(
        &self,
        run: &BacktestRun,
        coin: &str,
        timeframe: &str,
        metrics: &Metrics,
        raw_rows: &[RawRecord],
        started_at: i64,
    ) -> Result<(), BacktestError> {
        let dir = run.output_root.join(coin).join(timeframe);
        create_dir(&dir)?;

        let threshold = format_value(metrics.avg_threshold);

        write_file(
            dir.join(format!("memories_{timeframe}.txt")),
            &raw_rows.join(MEMORY_DELIMITER),
        )?;
        write_file(
            dir.join(format!("memory_weights_{timeframe}.txt")),
            &vec![threshold.as_str(); WEIGHT_COUNT].join(" "),
        )?;
        write_file(
            dir.join(format!("neural_perfect_threshold_{timeframe}.txt")),
            &threshold,
        )?;

        let now = now_epoch();
        let status = StatusRecord {
            coin,
            state: "FINISHED",
            started_at,
            finished_at: now,
            timestamp: now,
            mode: "backtest",
        };
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| BacktestError::unwritable(dir.join(STATUS_FILE), e.into()))?;
        write_file(dir.join(STATUS_FILE), &json)
    }

    fn write_summary(&self, output_root: &Path, rows: &[SummaryRow]) -> Result<(), BacktestError> {
        create_dir(output_root)?;
        write_csv(
            &output_root.join(SUMMARY_FILE),
            &SUMMARY_HEADER,
            rows.iter().map(SummaryRow::record),
        )
    }

    fn write_coin_log(
        &self,
        output_root: &Path,
        coin: &str,
        entries: &[SummaryRow],
    ) -> Result<(), BacktestError> {
        if entries.is_empty() {
            return Ok(());
        }
        let coin_dir = output_root.join(coin);
        create_dir(&coin_dir)?;
        write_csv(
            &coin_dir.join(COIN_LOG_FILE),
            &SUMMARY_HEADER[1..],
            entries.iter().map(SummaryRow::log_record),
        )
    }
}
