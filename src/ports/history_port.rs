//! History loading port trait.

use crate::domain::candle::RawRecord;
use crate::domain::error::BacktestError;

/// Time bounds for a history request.
///
/// `start` is the newest timestamp and `end` the oldest: history is walked
/// backwards from `start`. A row belongs to the window when
/// `end <= time <= start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow {
    pub start: f64,
    pub end: f64,
}

impl HistoryWindow {
    /// The widest window, covering every stored row.
    pub fn full() -> Self {
        Self {
            start: f64::INFINITY,
            end: 0.0,
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time <= self.start && time >= self.end
    }
}

pub trait HistoryPort {
    /// Raw rows for one symbol and timeframe, in storage order.
    fn load_history(
        &self,
        symbol: &str,
        timeframe: &str,
        window: HistoryWindow,
    ) -> Result<Vec<RawRecord>, BacktestError>;

    /// Source tag of this loader, e.g. `"csv"`.
    fn source(&self) -> &str;
}
