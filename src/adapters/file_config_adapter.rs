//! INI configuration for the `backtest` and `replay` commands.
//!
//! ```ini
//! [backtest]
//! data_dir = data/backtesting
//! output_dir = backtest_output
//! per_coin_logs = true
//! coins = BTC, SOL
//!
//! [replay]
//! csv_root = data/csv
//! timeframe = 4hour
//! ticks = 25
//! ```
//!
//! Section and key names are case-insensitive. A key set to an empty value
//! counts as unset, so command-line and environment fallbacks still apply.

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
    origin: String,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let origin = path.as_ref().display().to_string();
        let mut ini = Ini::new();
        ini.load(path.as_ref())
            .map_err(|reason| BacktestError::ConfigParse {
                file: origin.clone(),
                reason,
            })?;
        Ok(Self { ini, origin })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let origin = "<inline>".to_string();
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: origin.clone(),
                reason,
            })?;
        Ok(Self { ini, origin })
    }

    /// Where the settings came from, for log lines.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn parse_flag(value: &str) -> Option<bool> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        let Some(raw) = self.get_string(section, key) else {
            return default;
        };
        raw.parse().unwrap_or_else(|_| {
            log::warn!(
                "{}: [{section}] {key} = {raw:?} is not an integer, using {default}",
                self.origin
            );
            default
        })
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        let Some(raw) = self.get_string(section, key) else {
            return default;
        };
        Self::parse_flag(&raw).unwrap_or_else(|| {
            log::warn!(
                "{}: [{section}] {key} = {raw:?} is not a flag, using {default}",
                self.origin
            );
            default
        })
    }
}
