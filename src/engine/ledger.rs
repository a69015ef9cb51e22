//! The ledger: the single choke point through which portfolio state moves.
//!
//! Every trade record is born in `create_trade` and finalized through the
//! execution write-back methods here. Nothing else mutates positions, which
//! is what keeps the invariants — one open position per pair, non-negative
//! live quantity, equity = positions + cash — enforceable in one place.

use crate::domain::{
    Decimal, DecimalConversionError, Portfolio, TradeExecution, TradeType, TradingPairIdentifier,
};
use crate::engine::valuation::PositionValuation;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

/// How a trade is sized. Exactly one form, by construction: `Quantity` for
/// sells (negative) and direct-quantity buys, `Reserve` for buys sized in
/// reserve-currency terms and converted via the assumed price.
#[derive(Debug, Clone, Copy)]
pub enum TradeSize {
    Quantity(Decimal),
    Reserve(Decimal),
}

/// Optional fields attached to a new trade.
#[derive(Debug, Clone, Default)]
pub struct TradeOptions {
    pub planned_mid_price: Option<f64>,
    pub lp_fees_estimated: Option<Decimal>,
    pub pair_fee: Option<f64>,
    pub notes: Option<String>,
}

/// Outcome of `create_trade`: which position the trade landed on and
/// whether that position was opened by this very trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedTrade {
    pub position_id: u64,
    pub trade_id: u64,
    pub created: bool,
}

/// Error type for ledger mutations. These are programming or configuration
/// errors — they abort the current decision and leave no partial state.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot sell {pair}: no open position")]
    NoOpenPosition { pair: String },
    #[error("unknown position #{0}")]
    UnknownPosition(u64),
    #[error("unknown trade #{trade_id} on position #{position_id}")]
    UnknownTrade { position_id: u64, trade_id: u64 },
    #[error("trade #{trade_id} is already finalized")]
    TradeAlreadyFinalized { trade_id: u64 },
    #[error("a reserve-sized trade must be a positive buy, got {0}")]
    InvalidReserveSize(Decimal),
    #[error("trade quantity must be non-zero")]
    ZeroQuantity,
    #[error("assumed price must be positive, got {0}")]
    InvalidPrice(f64),
    #[error("executing trade #{trade_id} would take position #{position_id} negative")]
    NegativeQuantity { position_id: u64, trade_id: u64 },
    #[error(transparent)]
    Conversion(#[from] DecimalConversionError),
}

pub struct Ledger {
    portfolio: Portfolio,
}

impl Ledger {
    pub fn new(portfolio: Portfolio) -> Self {
        Self { portfolio }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Consume the ledger, handing the portfolio to a persistence layer.
    pub fn into_portfolio(self) -> Portfolio {
        self.portfolio
    }

    /// The sole entry point for recording a new trade.
    ///
    /// Opens a position if none exists for the pair, otherwise appends to
    /// the existing one; `created` in the result tells which happened.
    /// All validation runs before any state is touched, so an `Err` leaves
    /// the ledger exactly as it was.
    pub fn create_trade(
        &mut self,
        at: DateTime<Utc>,
        pair: &TradingPairIdentifier,
        size: TradeSize,
        assumed_price: f64,
        trade_type: TradeType,
        opts: TradeOptions,
    ) -> Result<CreatedTrade, LedgerError> {
        if !(assumed_price.is_finite() && assumed_price > 0.0) {
            return Err(LedgerError::InvalidPrice(assumed_price));
        }
        let price = Decimal::from_f64(assumed_price)?;

        let (planned_quantity, planned_reserve) = match size {
            TradeSize::Quantity(quantity) => {
                if quantity.is_zero() {
                    return Err(LedgerError::ZeroQuantity);
                }
                if quantity.is_negative()
                    && self.portfolio.get_open_position_for_pair(pair).is_none()
                {
                    return Err(LedgerError::NoOpenPosition {
                        pair: pair.to_string(),
                    });
                }
                (quantity, quantity.abs() * price)
            }
            TradeSize::Reserve(reserve) => {
                if !reserve.is_positive() {
                    return Err(LedgerError::InvalidReserveSize(reserve));
                }
                (reserve / price, reserve)
            }
        };

        let (reserve_currency, reserve_currency_price) = {
            let (asset, price) = self.portfolio.get_default_reserve();
            (asset.clone(), price)
        };

        let created = self.portfolio.get_open_position_for_pair(pair).is_none();
        let position_id = if created {
            let position_id = self.portfolio.allocate_position_id();
            let position = crate::domain::TradingPosition::open_new(
                position_id,
                pair.clone(),
                at,
                assumed_price,
                reserve_currency.clone(),
            );
            self.portfolio.insert_open_position(position);
            position_id
        } else {
            // Checked non-empty above.
            self.portfolio
                .get_open_position_for_pair(pair)
                .map(|p| p.position_id)
                .ok_or_else(|| LedgerError::NoOpenPosition {
                    pair: pair.to_string(),
                })?
        };

        let trade_id = self.portfolio.allocate_trade_id();
        let trade = TradeExecution {
            trade_id,
            position_id,
            pair: pair.clone(),
            trade_type,
            created_at: at,
            planned_quantity,
            planned_reserve,
            planned_price: assumed_price,
            planned_mid_price: opts.planned_mid_price,
            reserve_currency,
            reserve_currency_price,
            lp_fees_estimated: opts.lp_fees_estimated,
            pair_fee: opts.pair_fee,
            started_at: None,
            executed_at: None,
            failed_at: None,
            executed_quantity: None,
            executed_price: None,
            executed_reserve: None,
            blockchain_transactions: Vec::new(),
            notes: opts.notes,
        };

        info!(
            trade_id,
            position_id,
            created,
            pair = %pair,
            quantity = %planned_quantity,
            price = assumed_price,
            "trade created"
        );

        if let Some(position) = self.portfolio.open_position_mut(&pair.key()) {
            position.add_trade(trade);
        }

        Ok(CreatedTrade {
            position_id,
            trade_id,
            created,
        })
    }

    /// Set absolute trigger levels on an open position.
    pub fn set_position_triggers(
        &mut self,
        position_id: u64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<(), LedgerError> {
        let position = self
            .portfolio
            .open_position_mut_by_id(position_id)
            .ok_or(LedgerError::UnknownPosition(position_id))?;
        if stop_loss.is_some() {
            position.stop_loss = stop_loss;
        }
        if take_profit.is_some() {
            position.take_profit = take_profit;
        }
        Ok(())
    }

    /// Attach free-form notes to an open position.
    pub fn set_position_notes(
        &mut self,
        position_id: u64,
        notes: Option<String>,
    ) -> Result<(), LedgerError> {
        let position = self
            .portfolio
            .open_position_mut_by_id(position_id)
            .ok_or(LedgerError::UnknownPosition(position_id))?;
        position.notes = notes;
        Ok(())
    }

    /// Note that a trade's transactions went out for broadcast.
    pub fn mark_trade_started(
        &mut self,
        position_id: u64,
        trade_id: u64,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let trade = self.pending_trade_mut(position_id, trade_id)?;
        trade.mark_started(at);
        Ok(())
    }

    /// Finalize a trade with its confirmed execution figures.
    ///
    /// Settles reserve cash — buys debit the executed reserve, sells credit
    /// it — and recognizes the position as closed if its executed quantity
    /// has reached exactly zero. Returns the closed position's id when that
    /// happens.
    pub fn record_trade_success(
        &mut self,
        position_id: u64,
        trade_id: u64,
        at: DateTime<Utc>,
        executed_price: f64,
        executed_quantity: Decimal,
        executed_reserve: Decimal,
        txs: Vec<crate::domain::BlockchainTransaction>,
    ) -> Result<Option<u64>, LedgerError> {
        let (pair_key, is_buy, new_quantity) = {
            let position = self
                .portfolio
                .open_position_mut_by_id(position_id)
                .ok_or(LedgerError::UnknownPosition(position_id))?;
            let pair_key = position.pair.key();
            let new_quantity = position.get_quantity() + executed_quantity;
            if new_quantity.is_negative() {
                return Err(LedgerError::NegativeQuantity {
                    position_id,
                    trade_id,
                });
            }

            let trade = position
                .get_trade_mut(trade_id)
                .ok_or(LedgerError::UnknownTrade {
                    position_id,
                    trade_id,
                })?;
            if !trade.is_pending() {
                return Err(LedgerError::TradeAlreadyFinalized { trade_id });
            }
            let is_buy = trade.is_buy();
            trade.mark_success(at, executed_price, executed_quantity, executed_reserve, txs);
            (pair_key, is_buy, new_quantity)
        };

        let cash_delta = if is_buy {
            -executed_reserve
        } else {
            executed_reserve
        };
        self.portfolio.adjust_reserves(cash_delta);

        info!(
            trade_id,
            position_id,
            quantity = %executed_quantity,
            price = executed_price,
            "trade executed"
        );

        if new_quantity.is_zero() {
            self.portfolio.move_to_closed(&pair_key, at);
            info!(position_id, "position closed");
            return Ok(Some(position_id));
        }
        Ok(None)
    }

    /// Record an execution failure. The trade stays in the ledger for
    /// audit; quantity and cash accounting ignore it.
    pub fn record_trade_failure(
        &mut self,
        position_id: u64,
        trade_id: u64,
        at: DateTime<Utc>,
        txs: Vec<crate::domain::BlockchainTransaction>,
    ) -> Result<(), LedgerError> {
        let trade = self.pending_trade_mut(position_id, trade_id)?;
        trade.mark_failed(at, txs);
        warn!(trade_id, position_id, "trade execution failed");
        Ok(())
    }

    /// Store a valuation pass over the open positions. Applying the same
    /// valuations twice for the same timestamp is a no-op the second time.
    pub fn apply_valuations(
        &mut self,
        at: DateTime<Utc>,
        valuations: &[PositionValuation],
    ) -> Result<(), LedgerError> {
        for valuation in valuations {
            let position = self
                .portfolio
                .open_position_mut_by_id(valuation.position_id)
                .ok_or(LedgerError::UnknownPosition(valuation.position_id))?;
            position.revalue(at, valuation.price, valuation.mid_price);
        }
        Ok(())
    }

    fn pending_trade_mut(
        &mut self,
        position_id: u64,
        trade_id: u64,
    ) -> Result<&mut TradeExecution, LedgerError> {
        let position = self
            .portfolio
            .open_position_mut_by_id(position_id)
            .ok_or(LedgerError::UnknownPosition(position_id))?;
        let trade = position
            .get_trade_mut(trade_id)
            .ok_or(LedgerError::UnknownTrade {
                position_id,
                trade_id,
            })?;
        if !trade.is_pending() {
            return Err(LedgerError::TradeAlreadyFinalized { trade_id });
        }
        Ok(trade)
    }
}
