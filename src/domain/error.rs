//! Domain error types.
//!
//! Malformed records and empty datasets are not errors: decoders return
//! `Option` and an empty dataset aggregates to zero-state metrics.

use std::path::PathBuf;

/// Top-level error type for candle-replay.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no datasets found in {}", root.display())]
    NoDatasetsFound { root: PathBuf },

    #[error("failed to load {timeframe} history for {symbol}: {reason}")]
    History {
        symbol: String,
        timeframe: String,
        reason: String,
    },

    #[error("cannot write {}: {source}", path.display())]
    UnwritableOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("child process {name} failed: {reason}")]
    ChildProcess { name: String, reason: String },

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BacktestError::UnwritableOutput {
            path: path.into(),
            source,
        }
    }

    /// Process exit status reported for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            BacktestError::Io(_) | BacktestError::UnwritableOutput { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::History { .. } => 3,
            BacktestError::NoDatasetsFound { .. } => 5,
            BacktestError::ChildProcess { .. } => 6,
            BacktestError::Interrupted => 130,
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
