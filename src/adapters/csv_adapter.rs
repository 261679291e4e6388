//! CSV history adapter over `<root>/<timeframe>/<coin>/*.csv`.

use crate::domain::candle::RawRecord;
use crate::domain::error::BacktestError;
use crate::ports::history_port::{HistoryPort, HistoryWindow};
use std::fs;
use std::path::{Path, PathBuf};

/// Timeframe folders created by [`ensure_timeframe_dirs`] when none are given.
pub const TIMEFRAME_FOLDERS: [&str; 7] = [
    "1hour", "2hour", "4hour", "8hour", "12hour", "1day", "1week",
];

const GITKEEP: &str = ".gitkeep";

pub struct CsvHistoryAdapter {
    root: PathBuf,
}

/// Separators and brackets would shift columns in the raw record.
fn breaks_record(field: &str) -> bool {
    field.contains([',', '[', ']', '(', ')'])
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Option<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Some(Self {
            time: find("time")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume"),
        })
    }
}

impl CsvHistoryAdapter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The coin directory, matched case-insensitively when the exact
    /// spelling is absent.
    fn coin_dir(&self, symbol: &str, timeframe: &str) -> Option<PathBuf> {
        let tf_dir = self.root.join(timeframe);
        let exact = tf_dir.join(symbol);
        if exact.is_dir() {
            return Some(exact);
        }
        fs::read_dir(&tf_dir)
            .ok()?
            .filter_map(Result::ok)
            .find(|entry| {
                entry.path().is_dir()
                    && entry
                        .file_name()
                        .to_string_lossy()
                        .eq_ignore_ascii_case(symbol)
            })
            .map(|entry| entry.path())
    }

    fn csv_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(
        path: &Path,
        window: HistoryWindow,
        rows: &mut Vec<RawRecord>,
    ) -> Result<(), String> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

        let headers = rdr
            .headers()
            .map_err(|e| format!("failed to read header of {}: {}", path.display(), e))?;
        let cols = Columns::from_headers(headers).ok_or_else(|| {
            format!(
                "{} must have time,open,high,low,close columns",
                path.display()
            )
        })?;

        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    log::debug!("skipping row in {}: {}", path.display(), e);
                    continue;
                }
            };
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let selected = [cols.time, cols.open, cols.high, cols.low, cols.close]
                .into_iter()
                .chain(cols.volume);
            if let Some(bad) = selected.map(field).find(|v| breaks_record(v)) {
                log::debug!(
                    "skipping row in {}: field {:?} cannot be encoded",
                    path.display(),
                    bad
                );
                continue;
            }

            let time = field(cols.time);
            if let Ok(ts) = time.parse::<f64>() {
                if !window.contains(ts) {
                    continue;
                }
            }

            let volume = cols
                .volume
                .map(field)
                .filter(|v| !v.is_empty())
                .unwrap_or("0.0");

            rows.push(format!(
                "[{}, {}, {}, {}, {}, {}]",
                time,
                field(cols.open),
                field(cols.close),
                field(cols.high),
                field(cols.low),
                volume
            ));
        }
        Ok(())
    }
}

impl HistoryPort for CsvHistoryAdapter {
    /// Concatenates every CSV file of the coin in filename order. A coin
    /// without a directory has no history.
    fn load_history(
        &self,
        symbol: &str,
        timeframe: &str,
        window: HistoryWindow,
    ) -> Result<Vec<RawRecord>, BacktestError> {
        let history_error = |reason: String| BacktestError::History {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            reason,
        };

        let Some(dir) = self.coin_dir(symbol, timeframe) else {
            log::debug!(
                "no {} directory for {} under {}",
                timeframe,
                symbol,
                self.root.display()
            );
            return Ok(Vec::new());
        };

        let files = Self::csv_files(&dir)
            .map_err(|e| history_error(format!("failed to list {}: {}", dir.display(), e)))?;

        let mut rows = Vec::new();
        for path in &files {
            Self::read_file(path, window, &mut rows).map_err(history_error)?;
        }
        Ok(rows)
    }

    fn source(&self) -> &str {
        "csv"
    }
}

/// Creates `base_root/<timeframe>` folders with a `.gitkeep` marker.
///
/// Folder creation errors are returned; marker files are best effort.
pub fn ensure_timeframe_dirs(base_root: &Path, timeframes: &[String]) -> std::io::Result<()> {
    let defaults: Vec<String> = TIMEFRAME_FOLDERS.iter().map(|tf| tf.to_string()).collect();
    let timeframes = if timeframes.is_empty() {
        &defaults
    } else {
        timeframes
    };

    for timeframe in timeframes {
        let tf_dir = base_root.join(timeframe);
        fs::create_dir_all(&tf_dir)?;
        let keep = tf_dir.join(GITKEEP);
        if !keep.exists() {
            if let Err(e) = fs::OpenOptions::new().create(true).append(true).open(&keep) {
                log::debug!("could not create {}: {}", keep.display(), e);
            }
        }
    }
    Ok(())
}
