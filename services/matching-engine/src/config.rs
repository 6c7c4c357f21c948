//! Trading pair classification
//!
//! Tracks which symbols are configured for the high-volume path. One
//! shared instance is injected into every manager that routes on it, so
//! routing decisions and reconfiguration always agree.

use dashmap::DashSet;
use types::ids::Symbol;

/// Concurrent registry of high-volume pairs
#[derive(Debug, Default)]
pub struct PairConfigurationManager {
    high_volume: DashSet<Symbol>,
}

impl PairConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pair as high-volume. Returns false if it already was.
    pub fn mark_high_volume(&self, symbol: Symbol) -> bool {
        self.high_volume.insert(symbol)
    }

    /// Revert a pair to the standard path. Returns false if it was not
    /// high-volume.
    pub fn clear_high_volume(&self, symbol: &Symbol) -> bool {
        self.high_volume.remove(symbol).is_some()
    }

    pub fn is_high_volume(&self, symbol: &Symbol) -> bool {
        self.high_volume.contains(symbol)
    }

    /// Snapshot of all high-volume pairs
    pub fn high_volume_pairs(&self) -> Vec<Symbol> {
        self.high_volume.iter().map(|entry| entry.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let config = PairConfigurationManager::new();
        let symbol = Symbol::new("BTC/USDT");

        assert!(!config.is_high_volume(&symbol));
        assert!(config.mark_high_volume(symbol.clone()));
        assert!(!config.mark_high_volume(symbol.clone()));
        assert!(config.is_high_volume(&symbol));

        assert!(config.clear_high_volume(&symbol));
        assert!(!config.clear_high_volume(&symbol));
        assert!(!config.is_high_volume(&symbol));
    }

    #[test]
    fn test_snapshot_lists_marked_pairs() {
        let config = PairConfigurationManager::new();
        config.mark_high_volume(Symbol::new("BTC/USDT"));
        config.mark_high_volume(Symbol::new("ETH/USDT"));

        let mut pairs = config.high_volume_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![Symbol::new("BTC/USDT"), Symbol::new("ETH/USDT")]
        );
    }
}
