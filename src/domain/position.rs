//! An open or closed position on a single trading pair.
//!
//! A position is born with its first trade, grows and shrinks by appending
//! further trades, and is closed the moment its executed quantity reaches
//! exactly zero. It never outlives its portfolio and is only ever mutated
//! through the ledger's entry points.

use crate::domain::{AssetIdentifier, Decimal, TradeExecution, TradingPairIdentifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPosition {
    pub position_id: u64,
    pub pair: TradingPairIdentifier,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,

    /// Constituent trades in creation order, keyed by trade id. Trade ids
    /// are allocated monotonically by the portfolio, so iteration order is
    /// chronological.
    pub trades: BTreeMap<u64, TradeExecution>,

    /// Absolute trigger prices, set from percentage inputs at open time.
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,

    /// Last valuation written by `revalue_positions`.
    pub last_token_price: f64,
    pub last_mid_price: Option<f64>,
    pub last_pricing_at: DateTime<Utc>,

    pub reserve_currency: AssetIdentifier,
    pub notes: Option<String>,
}

impl TradingPosition {
    pub(crate) fn open_new(
        position_id: u64,
        pair: TradingPairIdentifier,
        opened_at: DateTime<Utc>,
        assumed_price: f64,
        reserve_currency: AssetIdentifier,
    ) -> Self {
        Self {
            position_id,
            pair,
            opened_at,
            closed_at: None,
            trades: BTreeMap::new(),
            stop_loss: None,
            take_profit: None,
            last_token_price: assumed_price,
            last_mid_price: None,
            last_pricing_at: opened_at,
            reserve_currency,
            notes: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Net quantity of successfully executed trades. Non-negative for the
    /// spot-long positions this ledger holds; exactly zero means the
    /// position is ready to be recognized as closed.
    pub fn get_quantity(&self) -> Decimal {
        self.trades
            .values()
            .map(TradeExecution::get_executed_quantity)
            .sum()
    }

    /// Net quantity including trades that are planned or in flight.
    ///
    /// This is what a close must look at: a previous close may have queued
    /// a sell that has not confirmed yet, and selling that quantity again
    /// would overdraw the position.
    pub fn get_live_quantity(&self) -> Decimal {
        self.trades
            .values()
            .map(TradeExecution::get_live_quantity)
            .sum()
    }

    /// Position value in reserve currency at the last recorded price.
    pub fn get_value(&self) -> f64 {
        self.get_quantity().to_f64() * self.last_token_price
    }

    /// Price recorded on the last valuation sync.
    pub fn get_current_price(&self) -> f64 {
        self.last_token_price
    }

    /// Executed price of the first trade, or its planned price while the
    /// entry is still in flight.
    pub fn get_opening_price(&self) -> Option<f64> {
        self.trades
            .values()
            .next()
            .map(|t| t.executed_price.unwrap_or(t.planned_price))
    }

    pub fn has_pending_trades(&self) -> bool {
        self.trades.values().any(TradeExecution::is_pending)
    }

    pub fn get_trade(&self, trade_id: u64) -> Option<&TradeExecution> {
        self.trades.get(&trade_id)
    }

    pub(crate) fn get_trade_mut(&mut self, trade_id: u64) -> Option<&mut TradeExecution> {
        self.trades.get_mut(&trade_id)
    }

    pub(crate) fn add_trade(&mut self, trade: TradeExecution) {
        self.trades.insert(trade.trade_id, trade);
    }

    pub(crate) fn revalue(&mut self, at: DateTime<Utc>, price: f64, mid_price: f64) {
        self.last_token_price = price;
        self.last_mid_price = Some(mid_price);
        self.last_pricing_at = at;
    }

    pub(crate) fn mark_closed(&mut self, at: DateTime<Utc>) {
        self.closed_at = Some(at);
    }
}

impl std::fmt::Display for TradingPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position #{} {} ({} trades)",
            self.position_id,
            self.pair.slug(),
            self.trades.len()
        )
    }
}
