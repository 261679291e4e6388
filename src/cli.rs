//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::artifact_adapter::FileArtifactWriter;
use crate::adapters::csv_adapter::{CsvHistoryAdapter, ensure_timeframe_dirs};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, run_backtest};
use crate::domain::environment::{BacktestEnv, DEFAULT_TIMEFRAME};
use crate::domain::error::BacktestError;
use crate::domain::replay::PriceReplay;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_OUTPUT_DIR: &str = "backtest_output";
pub const DEFAULT_SIGNALS_DIR: &str = "backtest_signals";
pub const DEFAULT_REPLAY_TICKS: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "candle-replay", about = "CSV candle replay and offline backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute metrics and artifacts for every timeframe/coin dataset
    Backtest {
        /// Root folder laid out as <timeframe>/<COIN>/*.csv
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Folder where backtest artifacts are written
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Also write <COIN>/backtest_log.csv
        #[arg(long)]
        per_coin_logs: bool,
        /// Limit the run to these coin directories (repeatable)
        #[arg(long = "coin")]
        coins: Vec<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print replayed close prices, one per coin per tick
    Replay {
        #[arg(long)]
        csv_root: Option<PathBuf>,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long = "coin", required = true)]
        coins: Vec<String>,
        #[arg(long)]
        ticks: Option<usize>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the thinker and trader processes in backtest mode
    Launch {
        #[arg(long)]
        csv_root: PathBuf,
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
        #[arg(long, default_value = DEFAULT_SIGNALS_DIR)]
        output_dir: PathBuf,
        /// Settings file shared with both processes
        #[arg(long)]
        gui_settings: Option<PathBuf>,
        #[arg(long)]
        no_thinker: bool,
        #[arg(long)]
        no_trader: bool,
        #[arg(long)]
        thinker_cmd: Option<String>,
        #[arg(long)]
        trader_cmd: Option<String>,
    },
    /// Create the standard timeframe folders under a CSV root
    InitDirs {
        #[arg(long)]
        root: PathBuf,
        #[arg(long = "timeframe")]
        timeframes: Vec<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            data_dir,
            output_dir,
            per_coin_logs,
            coins,
            config,
        } => run_backtest_command(
            BacktestArgs {
                data_dir,
                output_dir,
                per_coin_logs,
                coins,
            },
            config.as_ref(),
        ),
        Command::Replay {
            csv_root,
            timeframe,
            coins,
            ticks,
            config,
        } => run_replay(
            ReplayArgs {
                csv_root,
                timeframe,
                coins,
                ticks,
            },
            config.as_ref(),
        ),
        Command::Launch {
            csv_root,
            timeframe,
            output_dir,
            gui_settings,
            no_thinker,
            no_trader,
            thinker_cmd,
            trader_cmd,
        } => run_launch(LaunchArgs {
            csv_root,
            timeframe,
            output_dir,
            gui_settings,
            no_thinker,
            no_trader,
            thinker_cmd,
            trader_cmd,
        }),
        Command::InitDirs { root, timeframes } => run_init_dirs(&root, &timeframes),
    }
}

/// Command-line values for `backtest`, before config file fallback.
#[derive(Debug, Clone, Default)]
pub struct BacktestArgs {
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub per_coin_logs: bool,
    pub coins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayArgs {
    pub csv_root: Option<PathBuf>,
    pub timeframe: Option<String>,
    pub coins: Vec<String>,
    pub ticks: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    pub csv_root: PathBuf,
    pub timeframe: String,
    pub coins: Vec<String>,
    pub ticks: usize,
}

#[derive(Debug, Clone)]
pub struct LaunchArgs {
    pub csv_root: PathBuf,
    pub timeframe: String,
    pub output_dir: PathBuf,
    pub gui_settings: Option<PathBuf>,
    pub no_thinker: bool,
    pub no_trader: bool,
    pub thinker_cmd: Option<String>,
    pub trader_cmd: Option<String>,
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_optional_config(path: Option<&PathBuf>) -> Result<Option<FileConfigAdapter>, ExitCode> {
    match path {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            load_config(path).map(Some)
        }
        None => Ok(None),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Merges command-line values over the `[backtest]` config section.
pub fn build_backtest_config(
    args: &BacktestArgs,
    config: Option<&dyn ConfigPort>,
) -> Result<BacktestConfig, BacktestError> {
    let from_config = |key: &str| config.and_then(|c| c.get_string("backtest", key));

    let data_root = args
        .data_dir
        .clone()
        .or_else(|| from_config("data_dir").map(PathBuf::from))
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })?;

    let output_root = args
        .output_dir
        .clone()
        .or_else(|| from_config("output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let per_coin_logs = args.per_coin_logs
        || config.is_some_and(|c| c.get_bool("backtest", "per_coin_logs", false));

    let coins: BTreeSet<String> = if args.coins.is_empty() {
        config
            .map(|c| c.get_list("backtest", "coins"))
            .unwrap_or_default()
            .into_iter()
            .collect()
    } else {
        args.coins.iter().cloned().collect()
    };

    Ok(BacktestConfig {
        data_root: absolutize(&data_root),
        output_root: absolutize(&output_root),
        per_coin_logs,
        coins: if coins.is_empty() { None } else { Some(coins) },
    })
}

/// Resolves replay settings: command line, then `[replay]` config section,
/// then the backtest environment handed down by a launcher.
pub fn build_replay_settings(
    args: &ReplayArgs,
    config: Option<&dyn ConfigPort>,
    env: Option<&BacktestEnv>,
) -> Result<ReplaySettings, BacktestError> {
    let from_config = |key: &str| config.and_then(|c| c.get_string("replay", key));

    let csv_root = args
        .csv_root
        .clone()
        .or_else(|| from_config("csv_root").map(PathBuf::from))
        .or_else(|| env.map(|e| e.csv_root.clone()))
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: "replay".into(),
            key: "csv_root".into(),
        })?;

    let timeframe = args
        .timeframe
        .clone()
        .or_else(|| from_config("timeframe"))
        .or_else(|| env.map(|e| e.timeframe.clone()))
        .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string());

    let ticks = match args.ticks {
        Some(ticks) => ticks,
        None => {
            let configured = config
                .map(|c| c.get_int("replay", "ticks", DEFAULT_REPLAY_TICKS as i64))
                .unwrap_or(DEFAULT_REPLAY_TICKS as i64);
            usize::try_from(configured).map_err(|_| BacktestError::ConfigInvalid {
                section: "replay".into(),
                key: "ticks".into(),
                reason: format!("must not be negative, got {configured}"),
            })?
        }
    };

    Ok(ReplaySettings {
        csv_root,
        timeframe,
        coins: args.coins.clone(),
        ticks,
    })
}

fn run_backtest_command(args: BacktestArgs, config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_backtest_config(&args, adapter.as_ref().map(|a| a as &dyn ConfigPort))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let history = CsvHistoryAdapter::new(config.data_root.clone());
    match run_backtest(&config, &history, &FileArtifactWriter::new()) {
        Ok(report) => {
            println!(
                "Backtest complete. Summary written to {}",
                report.summary_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_replay(args: ReplayArgs, config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let env = BacktestEnv::from_process_env();

    let settings = match build_replay_settings(
        &args,
        adapter.as_ref().map(|a| a as &dyn ConfigPort),
        env.as_ref(),
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    log::info!(
        "Replaying {} from {} for {} ticks",
        settings.timeframe,
        settings.csv_root.display(),
        settings.ticks
    );

    let history = CsvHistoryAdapter::new(absolutize(&settings.csv_root));
    let mut replay = PriceReplay::new(history, &settings.timeframe, &settings.coins);
    let coins = replay.coins().to_vec();

    for _ in 0..settings.ticks {
        for coin in &coins {
            let price = replay.next_price(coin);
            println!("{coin}\t{price}");
        }
    }
    ExitCode::SUCCESS
}

/// Builds the environment hand-off and child commands for `launch`.
#[cfg(feature = "launcher")]
pub fn build_launch_plan(
    args: &LaunchArgs,
) -> Result<
    (
        BacktestEnv,
        Vec<crate::adapters::process_launcher::ChildSpec>,
    ),
    BacktestError,
> {
    use crate::adapters::process_launcher::{ChildSpec, DEFAULT_THINKER_CMD, DEFAULT_TRADER_CMD};

    let env = BacktestEnv {
        csv_root: absolutize(&args.csv_root),
        timeframe: args.timeframe.clone(),
        output: absolutize(&args.output_dir),
        gui_settings: args.gui_settings.as_deref().map(absolutize),
    };

    let mut specs = Vec::new();
    let wanted = [
        ("thinker", !args.no_thinker, &args.thinker_cmd, DEFAULT_THINKER_CMD),
        ("trader", !args.no_trader, &args.trader_cmd, DEFAULT_TRADER_CMD),
    ];
    for (name, enabled, command, default) in wanted {
        if !enabled {
            continue;
        }
        let command = command.as_deref().unwrap_or(default);
        let spec = ChildSpec::from_command_line(name, command).ok_or_else(|| {
            BacktestError::ConfigInvalid {
                section: "launch".into(),
                key: format!("{name}_cmd"),
                reason: "command is empty".into(),
            }
        })?;
        specs.push(spec);
    }

    Ok((env, specs))
}

fn run_launch(args: LaunchArgs) -> ExitCode {
    #[cfg(feature = "launcher")]
    {
        use crate::adapters::process_launcher;

        let (env, specs) = match build_launch_plan(&args) {
            Ok(plan) => plan,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        if specs.is_empty() {
            log::warn!("Both processes disabled; nothing to launch");
            return ExitCode::SUCCESS;
        }

        match process_launcher::launch(&env, &specs) {
            Ok(exits) => {
                for exit in exits.iter().filter(|e| !e.status.success()) {
                    log::warn!("{} exited with {}", exit.name, exit.status);
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "launcher"))]
    {
        let _ = args;
        eprintln!("error: launcher feature is required for launch");
        ExitCode::from(1)
    }
}

fn run_init_dirs(root: &Path, timeframes: &[String]) -> ExitCode {
    match ensure_timeframe_dirs(root, timeframes) {
        Ok(()) => {
            log::info!("Timeframe folders ready under {}", root.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let err = BacktestError::unwritable(root, e);
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}
