//! Backtest settings shared with child processes through the environment.

use std::path::PathBuf;

pub const MODE: &str = "MODE";
pub const CSV_ROOT: &str = "BACKTEST_CSV_ROOT";
pub const TIMEFRAME: &str = "BACKTEST_TIMEFRAME";
pub const OUTPUT: &str = "BACKTEST_OUTPUT";
pub const GUI_SETTINGS: &str = "GUI_SETTINGS";

pub const BACKTEST_MODE: &str = "backtest";
pub const DEFAULT_TIMEFRAME: &str = "1hour";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestEnv {
    pub csv_root: PathBuf,
    pub timeframe: String,
    pub output: PathBuf,
    pub gui_settings: Option<PathBuf>,
}

impl BacktestEnv {
    /// Variables to set on a child process, `MODE` first.
    pub fn to_vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (MODE, BACKTEST_MODE.to_string()),
            (CSV_ROOT, self.csv_root.display().to_string()),
            (TIMEFRAME, self.timeframe.clone()),
            (OUTPUT, self.output.display().to_string()),
        ];
        if let Some(settings) = &self.gui_settings {
            vars.push((GUI_SETTINGS, settings.display().to_string()));
        }
        vars
    }

    /// Reads the settings back; `None` unless `MODE` is `backtest` and a CSV
    /// root is set. A missing timeframe falls back to `1hour`.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = lookup(MODE)?;
        if !mode.trim().eq_ignore_ascii_case(BACKTEST_MODE) {
            return None;
        }
        let csv_root = lookup(CSV_ROOT).filter(|v| !v.trim().is_empty())?;
        Some(Self {
            csv_root: PathBuf::from(csv_root),
            timeframe: lookup(TIMEFRAME)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string()),
            output: lookup(OUTPUT).map(PathBuf::from).unwrap_or_default(),
            gui_settings: lookup(GUI_SETTINGS)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn from_process_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
