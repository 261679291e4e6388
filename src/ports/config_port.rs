//! Read access to the `[backtest]` and `[replay]` settings.
//!
//! Getters never fail: absent or unusable values yield `None`, an empty
//! list, or the caller's default, and the CLI layers its own fallbacks on
//! top.

pub trait ConfigPort {
    /// Trimmed value, `None` when absent or blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Comma-separated value split into trimmed, non-empty items, such as
    /// `coins = BTC, ETH`.
    fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get_string(section, key)
            .map(|value| {
                value
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
