//! Candle records and the decode-or-drop parsers that produce them.
//!
//! A raw record is a bracketed list literal such as
//! `[1700000000, 10.0, 12.0, 13.0, 9.0, 1500.0]` laid out as
//! `[time, open, close, high, low, volume]`. Two narrow decoders read it:
//! [`decode_price`] for the replay path and [`decode_candle`] for metrics.

/// Serialized candle row as handed out by a history loader.
pub type RawRecord = String;

const TIME: usize = 0;
const OPEN: usize = 1;
const CLOSE: usize = 2;
const HIGH: usize = 3;
const LOW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: f64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

impl Candle {
    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// max(|high - open|, |open - low|)
    pub fn intraday_move(&self) -> f64 {
        (self.high - self.open).abs().max((self.open - self.low).abs())
    }
}

/// Timestamp and close, all the replay path needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: f64,
    pub close: f64,
}

fn split_fields(raw: &str) -> Option<Vec<&str>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')))?;
    let inner = inner.trim();
    let inner = inner.strip_suffix(',').unwrap_or(inner);
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(inner.split(',').map(str::trim).collect())
}

fn number(fields: &[&str], index: usize) -> Option<f64> {
    let field = *fields.get(index)?;
    let unquoted = field
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| field.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(field);
    let value: f64 = unquoted.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Decodes `(timestamp, close)`; `None` when the record is unusable.
pub fn decode_price(raw: &str) -> Option<PricePoint> {
    let fields = split_fields(raw)?;
    Some(PricePoint {
        timestamp: number(&fields, TIME)?,
        close: number(&fields, CLOSE)?,
    })
}

/// Decodes `(timestamp, open, close, high, low)`. Volume is not read.
pub fn decode_candle(raw: &str) -> Option<Candle> {
    let fields = split_fields(raw)?;
    Some(Candle {
        timestamp: number(&fields, TIME)?,
        open: number(&fields, OPEN)?,
        close: number(&fields, CLOSE)?,
        high: number(&fields, HIGH)?,
        low: number(&fields, LOW)?,
        volume: 0.0,
    })
}

/// Decodes every record, drops the ones that fail, and sorts oldest first.
pub fn parse_prices<R: AsRef<str>>(raw_records: &[R]) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = raw_records
        .iter()
        .filter_map(|raw| decode_price(raw.as_ref()))
        .collect();
    // sort_by is stable, ties keep input order
    points.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    points
}

/// Decodes every record, drops the ones that fail, and sorts oldest first.
pub fn parse_candles<R: AsRef<str>>(raw_records: &[R]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = raw_records
        .iter()
        .filter_map(|raw| decode_candle(raw.as_ref()))
        .collect();
    candles.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    candles
}
