//! The portfolio: open positions, closed positions and reserve cash.
//!
//! Open positions are keyed by the pair's durable identity, which makes
//! "at most one open position per pair" a structural property rather than a
//! runtime check. Closed positions are kept by position id for audit and
//! for `get_last_closed_position`.

use crate::domain::{AssetIdentifier, Decimal, PairKey, TradingPairIdentifier, TradingPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Reserve currency holdings a strategy keeps between positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservePosition {
    pub asset: AssetIdentifier,
    pub quantity: Decimal,
    /// USD price of the reserve asset on the last sync; 1.0 for the usual
    /// stablecoin reserves.
    pub last_usd_price: f64,
    pub last_pricing_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    next_position_id: u64,
    next_trade_id: u64,

    pub open_positions: HashMap<PairKey, TradingPosition>,
    /// Closed positions by monotonically increasing position id.
    pub closed_positions: BTreeMap<u64, TradingPosition>,
    pub reserve: ReservePosition,
}

impl Portfolio {
    pub fn new(reserve_asset: AssetIdentifier, initial_cash: Decimal, reserve_price: f64) -> Self {
        Self {
            next_position_id: 1,
            next_trade_id: 1,
            open_positions: HashMap::new(),
            closed_positions: BTreeMap::new(),
            reserve: ReservePosition {
                asset: reserve_asset,
                quantity: initial_cash,
                last_usd_price: reserve_price,
                last_pricing_at: None,
            },
        }
    }

    /// The designated reserve currency and its last known USD price.
    pub fn get_default_reserve(&self) -> (&AssetIdentifier, f64) {
        (&self.reserve.asset, self.reserve.last_usd_price)
    }

    /// Cash in hand, in US dollars.
    pub fn get_current_cash(&self) -> f64 {
        self.reserve.quantity.to_f64() * self.reserve.last_usd_price
    }

    /// Total equity: open position values plus reserve cash.
    pub fn get_total_equity(&self) -> f64 {
        let positions: f64 = self.open_positions.values().map(|p| p.get_value()).sum();
        positions + self.get_current_cash()
    }

    pub fn get_open_position_for_pair(
        &self,
        pair: &TradingPairIdentifier,
    ) -> Option<&TradingPosition> {
        self.open_positions.get(&pair.key())
    }

    pub fn get_open_position_by_id(&self, position_id: u64) -> Option<&TradingPosition> {
        self.open_positions
            .values()
            .find(|p| p.position_id == position_id)
    }

    /// Look a position up in either the open or the closed book.
    pub fn get_position_by_id(&self, position_id: u64) -> Option<&TradingPosition> {
        self.get_open_position_by_id(position_id)
            .or_else(|| self.closed_positions.get(&position_id))
    }

    /// The most recently closed position.
    ///
    /// Ties on `closed_at` are broken by the lowest position id, so the
    /// answer is deterministic across runs.
    pub fn get_last_closed_position(&self) -> Option<&TradingPosition> {
        self.closed_positions
            .values()
            .filter(|p| p.closed_at.is_some())
            .max_by(|a, b| {
                a.closed_at
                    .cmp(&b.closed_at)
                    // Reversed id comparison: on equal timestamps the
                    // lower-id position compares greater and wins.
                    .then(b.position_id.cmp(&a.position_id))
            })
    }

    /// Open position ids in ascending order; the deterministic iteration
    /// order for close-all sweeps.
    pub fn open_position_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.open_positions.values().map(|p| p.position_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Move reserve cash by `delta` (negative when a buy settles).
    pub(crate) fn adjust_reserves(&mut self, delta: Decimal) {
        self.reserve.quantity += delta;
    }

    pub(crate) fn allocate_position_id(&mut self) -> u64 {
        let id = self.next_position_id;
        self.next_position_id += 1;
        id
    }

    pub(crate) fn allocate_trade_id(&mut self) -> u64 {
        let id = self.next_trade_id;
        self.next_trade_id += 1;
        id
    }

    pub(crate) fn open_position_mut(&mut self, key: &PairKey) -> Option<&mut TradingPosition> {
        self.open_positions.get_mut(key)
    }

    pub(crate) fn open_position_mut_by_id(
        &mut self,
        position_id: u64,
    ) -> Option<&mut TradingPosition> {
        self.open_positions
            .values_mut()
            .find(|p| p.position_id == position_id)
    }

    pub(crate) fn insert_open_position(&mut self, position: TradingPosition) {
        self.open_positions.insert(position.pair.key(), position);
    }

    /// Retire an open position into the closed book.
    pub(crate) fn move_to_closed(&mut self, key: &PairKey, at: DateTime<Utc>) {
        if let Some(mut position) = self.open_positions.remove(key) {
            position.mark_closed(at);
            self.closed_positions.insert(position.position_id, position);
        }
    }
}
