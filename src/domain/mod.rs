//! Core domain types and logic.

pub mod candle;
pub mod replay;
pub mod catalog;
pub mod metrics;
pub mod backtest;
pub mod environment;
pub mod error;
