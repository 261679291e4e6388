#![allow(dead_code)]

use candle_replay::domain::backtest::BacktestConfig;
use candle_replay::domain::candle::RawRecord;
use candle_replay::domain::error::BacktestError;
use candle_replay::ports::history_port::{HistoryPort, HistoryWindow};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// In-memory history keyed by `(symbol, timeframe)`.
pub struct MockHistoryPort {
    pub rows: HashMap<(String, String), Vec<RawRecord>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(String, String, HistoryWindow)>>,
}

impl MockHistoryPort {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_rows(mut self, symbol: &str, timeframe: &str, rows: &[&str]) -> Self {
        self.rows.insert(
            (symbol.to_string(), timeframe.to_string()),
            rows.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl HistoryPort for MockHistoryPort {
    fn load_history(
        &self,
        symbol: &str,
        timeframe: &str,
        window: HistoryWindow,
    ) -> Result<Vec<RawRecord>, BacktestError> {
        self.requests
            .borrow_mut()
            .push((symbol.to_string(), timeframe.to_string(), window));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::History {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .rows
            .get(&(symbol.to_string(), timeframe.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn source(&self) -> &str {
        "mock"
    }
}

/// Creates empty `root/<timeframe>/<coin>` directories.
pub fn make_dataset_dirs(root: &Path, layout: &[(&str, &str)]) {
    for (timeframe, coin) in layout {
        fs::create_dir_all(root.join(timeframe).join(coin)).unwrap();
    }
}

/// Writes one CSV file for a dataset, creating its directory.
pub fn write_csv(root: &Path, timeframe: &str, coin: &str, file: &str, content: &str) {
    let dir = root.join(timeframe).join(coin);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

pub fn sample_config(data_root: &Path, output_root: &Path) -> BacktestConfig {
    BacktestConfig {
        data_root: data_root.to_path_buf(),
        output_root: output_root.to_path_buf(),
        per_coin_logs: false,
        coins: None,
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
