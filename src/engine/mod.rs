//! Deterministic ledger logic: trade creation, execution write-back and
//! position valuation.

pub mod ledger;
pub mod valuation;

pub use ledger::{CreatedTrade, Ledger, LedgerError, TradeOptions, TradeSize};
pub use valuation::{revalue_positions, PositionValuation, ValuationError};
