//! Per-symbol close-price replay for simulated live runs.

use super::candle::parse_prices;
use crate::ports::history_port::{HistoryPort, HistoryWindow};
use std::collections::HashMap;

/// Infinite, forward-only price sequence.
///
/// Yields the recorded closes oldest first, then repeats the last one on
/// every further pull. Never returns `None`.
#[derive(Debug, Clone)]
pub struct ReplaySeries {
    prices: std::vec::IntoIter<f64>,
    consumed: usize,
    last_price: f64,
}

impl ReplaySeries {
    /// A series over `closes`; an empty input replays a single `0.0`.
    pub fn new(closes: Vec<f64>) -> Self {
        let closes = if closes.is_empty() { vec![0.0] } else { closes };
        Self {
            prices: closes.into_iter(),
            consumed: 0,
            last_price: 0.0,
        }
    }

    /// Number of recorded prices handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    /// True once the recorded prices are used up.
    pub fn is_exhausted(&self) -> bool {
        self.prices.len() == 0
    }
}

impl Iterator for ReplaySeries {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if let Some(price) = self.prices.next() {
            self.consumed += 1;
            self.last_price = price;
        }
        Some(self.last_price)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// Trims and upper-cases a symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Hands out one close price per call and per symbol, loading each
/// symbol's history on first use.
///
/// Each symbol's series belongs to this instance; consumers that need the
/// same symbol must share one `PriceReplay`.
pub struct PriceReplay<H: HistoryPort> {
    history: H,
    timeframe: String,
    coins: Vec<String>,
    series: HashMap<String, ReplaySeries>,
}

impl<H: HistoryPort> PriceReplay<H> {
    pub fn new<I, S>(history: H, timeframe: &str, coins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let coins = coins
            .into_iter()
            .map(|c| normalize_symbol(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            history,
            timeframe: timeframe.to_string(),
            coins,
            series: HashMap::new(),
        }
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn coins(&self) -> &[String] {
        &self.coins
    }

    /// Next close for `symbol`. Symbols without usable history replay `0.0`.
    pub fn next_price(&mut self, symbol: &str) -> f64 {
        let symbol = normalize_symbol(symbol);
        if !self.series.contains_key(&symbol) {
            let series = self.load_series(&symbol);
            self.series.insert(symbol.clone(), series);
        }
        self.series
            .get_mut(&symbol)
            .and_then(|series| series.next())
            .unwrap_or(0.0)
    }

    /// Last price handed out for `symbol`, if it has been requested before.
    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.series
            .get(&normalize_symbol(symbol))
            .filter(|s| s.consumed() > 0)
            .map(ReplaySeries::last_price)
    }

    fn load_series(&self, symbol: &str) -> ReplaySeries {
        let rows = match self
            .history
            .load_history(symbol, &self.timeframe, HistoryWindow::full())
        {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("replaying {symbol} without history: {e}");
                Vec::new()
            }
        };
        let closes: Vec<f64> = parse_prices(&rows).into_iter().map(|p| p.close).collect();
        log::debug!(
            "{symbol} {}: {} of {} rows usable for replay",
            self.timeframe,
            closes.len(),
            rows.len()
        );
        ReplaySeries::new(closes)
    }
}
