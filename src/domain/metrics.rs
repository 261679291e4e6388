//! Candle-level backtest metrics and report rows.

use super::candle::Candle;

pub const SUMMARY_HEADER: [&str; 6] = [
    "coin",
    "timeframe",
    "samples",
    "win_rate",
    "hit_rate",
    "avg_threshold",
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub samples: usize,
    pub win_rate: f64,
    pub hit_rate: f64,
    pub avg_threshold: f64,
}

impl Metrics {
    /// Aggregates a candle sequence. An empty sequence gives all zeros.
    ///
    /// A win is `close > open`, a hit is a strictly positive intraday move
    /// and the threshold is the candle body `|close - open|`. No rounding.
    pub fn aggregate(candles: &[Candle]) -> Self {
        if candles.is_empty() {
            return Metrics::default();
        }

        let mut wins = 0usize;
        let mut hits = 0usize;
        let mut threshold_sum = 0.0_f64;

        for candle in candles {
            if candle.close > candle.open {
                wins += 1;
            }
            if candle.intraday_move() > 0.0 {
                hits += 1;
            }
            threshold_sum += candle.body();
        }

        let samples = candles.len();
        let n = samples as f64;
        Metrics {
            samples,
            win_rate: wins as f64 / n,
            hit_rate: hits as f64 / n,
            avg_threshold: threshold_sum / n,
        }
    }
}

/// One (coin, timeframe) line of the summary report.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub coin: String,
    pub timeframe: String,
    pub metrics: Metrics,
}

impl SummaryRow {
    pub fn new(coin: &str, timeframe: &str, metrics: Metrics) -> Self {
        Self {
            coin: coin.to_string(),
            timeframe: timeframe.to_string(),
            metrics,
        }
    }

    /// Summary record in [`SUMMARY_HEADER`] order: rates to 4 places,
    /// threshold to 8.
    pub fn record(&self) -> [String; 6] {
        [
            self.coin.clone(),
            self.timeframe.clone(),
            self.metrics.samples.to_string(),
            format!("{:.4}", self.metrics.win_rate),
            format!("{:.4}", self.metrics.hit_rate),
            format!("{:.8}", self.metrics.avg_threshold),
        ]
    }

    /// Per-coin log record: the summary record without `coin`.
    pub fn log_record(&self) -> [String; 5] {
        let [_, timeframe, samples, win_rate, hit_rate, avg_threshold] = self.record();
        [timeframe, samples, win_rate, hit_rate, avg_threshold]
    }
}
