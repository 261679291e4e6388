//! Integration tests for the offline backtest pipeline.
//!
//! Tests cover:
//! - Full pipeline with a mock history port and the filesystem writer
//! - Loader failures and malformed rows contained to their dataset
//! - Coin filtering and per-coin logs
//! - The no-datasets path leaving no report behind
//! - Re-running over the same output root
//! - End-to-end over real CSV files with the CSV history adapter

mod common;

use approx::assert_relative_eq;
use candle_replay::adapters::artifact_adapter::FileArtifactWriter;
use candle_replay::adapters::csv_adapter::CsvHistoryAdapter;
use candle_replay::domain::backtest::{SUMMARY_FILE, run_backtest};
use candle_replay::domain::error::BacktestError;
use candle_replay::domain::replay::PriceReplay;
use candle_replay::ports::history_port::HistoryWindow;
use common::*;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

mod pipeline {
    use super::*;

    #[test]
    fn full_pipeline_writes_summary_and_artifacts() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("1hour", "BTC"), ("1hour", "ETH")]);

        let history = MockHistoryPort::new()
            .with_rows(
                "BTC",
                "1hour",
                &["[2, 10, 8, 11, 7, 0]", "[1, 10, 12, 13, 9, 0]"],
            )
            .with_rows("ETH", "1hour", &["[1, 5, 5, 5, 5]"]);
        let config = sample_config(data.path(), out.path());

        let report = run_backtest(&config, &history, &FileArtifactWriter::new()).unwrap();

        assert_eq!(report.rows.len(), 2);
        let btc = &report.rows[0];
        assert_eq!(btc.coin, "BTC");
        assert_eq!(btc.metrics.samples, 2);
        assert_relative_eq!(btc.metrics.win_rate, 0.5);
        assert_relative_eq!(btc.metrics.hit_rate, 1.0);
        assert_relative_eq!(btc.metrics.avg_threshold, 2.0);

        assert_eq!(report.summary_path, out.path().join(SUMMARY_FILE));
        assert_eq!(
            read_lines(&report.summary_path),
            vec![
                "coin,timeframe,samples,win_rate,hit_rate,avg_threshold",
                "BTC,1hour,2,0.5000,1.0000,2.00000000",
                "ETH,1hour,1,0.0000,0.0000,0.00000000",
            ]
        );

        let btc_dir = out.path().join("BTC").join("1hour");
        assert_eq!(
            fs::read_to_string(btc_dir.join("memories_1hour.txt")).unwrap(),
            "[2, 10, 8, 11, 7, 0]~[1, 10, 12, 13, 9, 0]"
        );
        assert!(btc_dir.join("trainer_status.json").is_file());
        assert!(out.path().join("ETH").join("1hour").join("memory_weights_1hour.txt").is_file());
        assert!(!out.path().join("BTC").join("backtest_log.csv").exists());

        let finished = report.run.finished_at.unwrap();
        assert!(finished >= report.run.started_at);
    }

    #[test]
    fn loader_requests_widest_window() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("4hour", "SOL")]);
        let history = MockHistoryPort::new();

        run_backtest(
            &sample_config(data.path(), out.path()),
            &history,
            &FileArtifactWriter::new(),
        )
        .unwrap();

        let requests = history.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "SOL");
        assert_eq!(requests[0].1, "4hour");
        assert_eq!(requests[0].2, HistoryWindow::full());
    }

    #[test]
    fn datasets_processed_timeframe_major_in_order() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(
            data.path(),
            &[("4hour", "ETH"), ("1hour", "SOL"), ("1hour", "BTC"), ("4hour", "ADA")],
        );

        let report = run_backtest(
            &sample_config(data.path(), out.path()),
            &MockHistoryPort::new(),
            &FileArtifactWriter::new(),
        )
        .unwrap();

        let order: Vec<(&str, &str)> = report
            .rows
            .iter()
            .map(|r| (r.timeframe.as_str(), r.coin.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("1hour", "BTC"), ("1hour", "SOL"), ("4hour", "ADA"), ("4hour", "ETH")]
        );
    }
}

mod degraded_datasets {
    use super::*;

    #[test]
    fn loader_error_yields_zero_state_row() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("1hour", "BTC"), ("1hour", "ETH")]);
        let history = MockHistoryPort::new()
            .with_error("BTC", "disk on fire")
            .with_rows("ETH", "1hour", &["[1, 1, 2, 2, 1]"]);

        let report = run_backtest(
            &sample_config(data.path(), out.path()),
            &history,
            &FileArtifactWriter::new(),
        )
        .unwrap();

        assert_eq!(report.rows[0].coin, "BTC");
        assert_eq!(report.rows[0].metrics.samples, 0);
        assert_eq!(report.rows[1].metrics.samples, 1);
        let memories = out.path().join("BTC").join("1hour").join("memories_1hour.txt");
        assert_eq!(fs::read_to_string(memories).unwrap(), "");
    }

    #[test]
    fn malformed_rows_are_dropped_but_kept_in_memories() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("1day", "BTC")]);
        let rows = [
            "[3, 10, 11, 12, 9]",
            "broken",
            "[1, 10, 11, 12, 9]",
            "[2, 10, nope, 12, 9]",
            "[2, 10, 9, 12, 9]",
        ];
        let history = MockHistoryPort::new().with_rows("BTC", "1day", &rows);

        let report = run_backtest(
            &sample_config(data.path(), out.path()),
            &history,
            &FileArtifactWriter::new(),
        )
        .unwrap();

        assert_eq!(report.rows[0].metrics.samples, 3);
        assert_relative_eq!(report.rows[0].metrics.win_rate, 2.0 / 3.0);
        let memories = out.path().join("BTC").join("1day").join("memories_1day.txt");
        assert_eq!(fs::read_to_string(memories).unwrap(), rows.join("~"));
    }
}

mod filtering_and_logs {
    use super::*;

    #[test]
    fn allowed_coins_limit_the_run() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(
            data.path(),
            &[("1hour", "BTC"), ("1hour", "ETH"), ("1hour", "SOL"), ("1day", "ETH")],
        );
        let mut config = sample_config(data.path(), out.path());
        config.coins = Some(BTreeSet::from(["BTC".to_string(), "SOL".to_string()]));

        let report =
            run_backtest(&config, &MockHistoryPort::new(), &FileArtifactWriter::new()).unwrap();

        let coins: Vec<&str> = report.rows.iter().map(|r| r.coin.as_str()).collect();
        assert_eq!(coins, vec!["BTC", "SOL"]);
        assert!(!out.path().join("ETH").exists());
    }

    #[test]
    fn per_coin_logs_cover_every_timeframe() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("1hour", "BTC"), ("4hour", "BTC"), ("4hour", "ETH")]);
        let history = MockHistoryPort::new().with_rows("BTC", "4hour", &["[1, 1, 2, 2, 1]"]);
        let mut config = sample_config(data.path(), out.path());
        config.per_coin_logs = true;

        run_backtest(&config, &history, &FileArtifactWriter::new()).unwrap();

        assert_eq!(
            read_lines(&out.path().join("BTC").join("backtest_log.csv")),
            vec![
                "timeframe,samples,win_rate,hit_rate,avg_threshold",
                "1hour,0,0.0000,0.0000,0.00000000",
                "4hour,1,1.0000,1.0000,1.00000000",
            ]
        );
        assert_eq!(read_lines(&out.path().join("ETH").join("backtest_log.csv")).len(), 2);
    }
}

mod fatal_paths {
    use super::*;

    #[test]
    fn empty_root_aborts_without_summary() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let err = run_backtest(
            &sample_config(data.path(), out.path()),
            &MockHistoryPort::new(),
            &FileArtifactWriter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, BacktestError::NoDatasetsFound { .. }));
        assert_ne!(err.exit_status(), 0);
        assert!(!out.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn missing_root_aborts_without_summary() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let err = run_backtest(
            &sample_config(&data.path().join("nope"), out.path()),
            &MockHistoryPort::new(),
            &FileArtifactWriter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, BacktestError::NoDatasetsFound { .. }));
        assert!(!out.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn unwritable_output_fails_the_run() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("1hour", "BTC")]);
        let blocker = out.path().join("blocked");
        fs::write(&blocker, "not a directory").unwrap();

        let err = run_backtest(
            &sample_config(data.path(), &blocker),
            &MockHistoryPort::new(),
            &FileArtifactWriter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, BacktestError::UnwritableOutput { .. }));
    }
}

mod rerun {
    use super::*;

    #[test]
    fn second_run_replaces_artifacts() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        make_dataset_dirs(data.path(), &[("1hour", "BTC")]);
        let config = sample_config(data.path(), out.path());

        let first = MockHistoryPort::new().with_rows("BTC", "1hour", &["[1, 10, 14, 15, 9]"]);
        run_backtest(&config, &first, &FileArtifactWriter::new()).unwrap();
        let second = MockHistoryPort::new().with_rows("BTC", "1hour", &["[1, 10, 11, 12, 9]"]);
        run_backtest(&config, &second, &FileArtifactWriter::new()).unwrap();

        let dir = out.path().join("BTC").join("1hour");
        assert_eq!(
            fs::read_to_string(dir.join("memories_1hour.txt")).unwrap(),
            "[1, 10, 11, 12, 9]"
        );
        assert_eq!(
            fs::read_to_string(dir.join("neural_perfect_threshold_1hour.txt")).unwrap(),
            "1.0"
        );
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 4);
        assert_eq!(read_lines(&out.path().join(SUMMARY_FILE)).len(), 2);
    }
}

mod csv_end_to_end {
    use super::*;

    const BTC_JAN: &str = "time,open,high,low,close,volume\n\
        1704067200,100.0,110.0,95.0,105.0,10\n\
        1704070800,105.0,106.0,100.0,101.0,12\n";
    const BTC_FEB: &str = "time,open,high,low,close\n\
        1706745600,101.0,101.0,101.0,101.0\n";

    #[test]
    fn backtest_over_csv_files() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_csv(data.path(), "1hour", "BTC", "2024-01.csv", BTC_JAN);
        write_csv(data.path(), "1hour", "BTC", "2024-02.csv", BTC_FEB);
        write_csv(data.path(), "1hour", "ETH", "2024-01.csv", "time,open,high,low,close\n");

        let history = CsvHistoryAdapter::new(data.path().to_path_buf());
        let report = run_backtest(
            &sample_config(data.path(), out.path()),
            &history,
            &FileArtifactWriter::new(),
        )
        .unwrap();

        let btc = &report.rows[0].metrics;
        assert_eq!(btc.samples, 3);
        assert_relative_eq!(btc.win_rate, 1.0 / 3.0);
        assert_relative_eq!(btc.hit_rate, 2.0 / 3.0);
        assert_relative_eq!(btc.avg_threshold, 3.0);
        assert_eq!(report.rows[1].coin, "ETH");
        assert_eq!(report.rows[1].metrics.samples, 0);
    }

    #[test]
    fn replay_over_csv_files() {
        let data = TempDir::new().unwrap();
        write_csv(data.path(), "1hour", "BTC", "2024-02.csv", BTC_FEB);
        write_csv(data.path(), "1hour", "BTC", "2024-01.csv", BTC_JAN);

        let history = CsvHistoryAdapter::new(data.path().to_path_buf());
        let mut replay = PriceReplay::new(history, "1hour", ["btc"]);

        let prices: Vec<f64> = (0..5).map(|_| replay.next_price("btc")).collect();
        assert_eq!(prices, vec![105.0, 101.0, 101.0, 101.0, 101.0]);
        assert_eq!(replay.next_price("DOGE"), 0.0);
    }
}
