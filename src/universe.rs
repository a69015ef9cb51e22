//! Pair universe lookup.
//!
//! The trading universe hands strategies cycle-local numeric pair ids.
//! Those ids are not stable across universe reloads, so this interface
//! exists only to turn an id back into full pair metadata within one cycle;
//! anything durable must key on `PairKey` instead.

use crate::domain::TradingPairIdentifier;
use std::collections::HashMap;

pub trait PairUniverse: Send + Sync {
    /// Resolve a cycle-local numeric id to pair metadata.
    fn get_pair_by_id(&self, pair_id: u64) -> Option<&TradingPairIdentifier>;
}

/// Fixed in-memory universe for tests and backtests.
#[derive(Debug, Clone, Default)]
pub struct StaticPairUniverse {
    pairs: HashMap<u64, TradingPairIdentifier>,
}

impl StaticPairUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair under its internal id. Pairs without one are
    /// ignored: they cannot be looked up numerically anyway.
    pub fn with_pair(mut self, pair: TradingPairIdentifier) -> Self {
        if let Some(id) = pair.internal_id {
            self.pairs.insert(id, pair);
        }
        self
    }
}

impl PairUniverse for StaticPairUniverse {
    fn get_pair_by_id(&self, pair_id: u64) -> Option<&TradingPairIdentifier> {
        self.pairs.get(&pair_id)
    }
}
