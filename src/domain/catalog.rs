//! Dataset discovery over a `<root>/<timeframe>/<coin>/` tree.

use super::error::BacktestError;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Timeframe -> coins, both levels sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    datasets: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    pub fn timeframes(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn coins(&self, timeframe: &str) -> &[String] {
        self.datasets
            .get(timeframe)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every `(timeframe, coin)` pair, timeframe-major.
    pub fn datasets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.datasets.iter().flat_map(|(timeframe, coins)| {
            coins
                .iter()
                .map(move |coin| (timeframe.as_str(), coin.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.datasets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn sorted_dir_names(path: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() || entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Walks `root/<timeframe>/<coin>` two levels deep.
///
/// With `allowed_coins`, only coin directories named in the set survive and
/// timeframes left without coins are omitted. A missing root or an empty
/// result is reported as [`BacktestError::NoDatasetsFound`].
pub fn discover(
    root: &Path,
    allowed_coins: Option<&BTreeSet<String>>,
) -> Result<Catalog, BacktestError> {
    let no_datasets = || BacktestError::NoDatasetsFound {
        root: root.to_path_buf(),
    };

    let timeframes = sorted_dir_names(root).map_err(|e| {
        log::debug!("cannot list {}: {e}", root.display());
        no_datasets()
    })?;

    let mut datasets = BTreeMap::new();
    for timeframe in timeframes {
        let tf_path = root.join(&timeframe);
        let coins = match sorted_dir_names(&tf_path) {
            Ok(coins) => coins,
            Err(e) => {
                log::warn!("skipping {}: {e}", tf_path.display());
                continue;
            }
        };
        let coins: Vec<String> = coins
            .into_iter()
            .filter(|coin| allowed_coins.is_none_or(|allowed| allowed.contains(coin)))
            .collect();
        if !coins.is_empty() {
            datasets.insert(timeframe, coins);
        }
    }

    if datasets.is_empty() {
        return Err(no_datasets());
    }
    Ok(Catalog { datasets })
}
