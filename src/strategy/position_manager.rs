//! Opening, adjusting and closing of positions.
//!
//! The position manager hides price fetching and trade-record bookkeeping
//! from strategy code: a strategy says "put $9,500 into this pair" or
//! "take this position to weight zero", the manager turns that into ledger
//! trades with the right decimal handling.
//!
//! One manager is constructed per decision cycle, pinned to that cycle's
//! timestamp so every quote and trade record carries the same clock.

use crate::domain::{
    AssetIdentifier, Decimal, TradeType, TradingPairIdentifier, TradingPosition, UsDollarAmount,
};
use crate::engine::{Ledger, TradeOptions, TradeSize};
use crate::error::ExecutorError;
use crate::pricing::{PriceStructure, PricingModel};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

/// Error type for strategy-facing preconditions.
#[derive(Debug, Error)]
pub enum PositionManagerError {
    #[error("pair {pair} already has an open position")]
    PositionAlreadyOpen { pair: String },
    #[error("cannot sell {pair}: no open position")]
    NoOpenPosition { pair: String },
    #[error("position #{0} is not open")]
    PositionNotOpen(u64),
    #[error("no positions to close")]
    NoPositionsToClose,
    #[error("expected exactly one open position, found {count}")]
    NoSingleOpenPosition { count: usize },
    #[error("target weight must be within [0, 1], got {0}")]
    InvalidWeight(f64),
    #[error("dollar delta must be non-zero")]
    ZeroDelta,
    /// Trigger levels are fractions of the mid price: a stop loss sits
    /// below 1.0, a take profit above it.
    #[error("{kind} of {value} is on the wrong side of 1.0")]
    InvalidTriggerLevel { kind: &'static str, value: f64 },
}

pub struct PositionManager<'a> {
    timestamp: DateTime<Utc>,
    ledger: &'a mut Ledger,
    pricing: &'a dyn PricingModel,
    reserve_currency: AssetIdentifier,
}

impl<'a> PositionManager<'a> {
    pub fn new(
        timestamp: DateTime<Utc>,
        ledger: &'a mut Ledger,
        pricing: &'a dyn PricingModel,
    ) -> Self {
        let (reserve, _) = ledger.portfolio().get_default_reserve();
        let reserve_currency = reserve.clone();
        Self {
            timestamp,
            ledger,
            pricing,
            reserve_currency,
        }
    }

    /// Do we have any positions open.
    pub fn is_any_open(&self) -> bool {
        !self.ledger.portfolio().open_positions.is_empty()
    }

    /// The single open position, for strategies that trade one pair.
    pub fn get_current_position(&self) -> Result<&TradingPosition, PositionManagerError> {
        let open = &self.ledger.portfolio().open_positions;
        if open.len() != 1 {
            return Err(PositionManagerError::NoSingleOpenPosition { count: open.len() });
        }
        open.values()
            .next()
            .ok_or(PositionManagerError::NoSingleOpenPosition { count: 0 })
    }

    pub fn get_current_position_for_pair(
        &self,
        pair: &TradingPairIdentifier,
    ) -> Option<&TradingPosition> {
        self.ledger.portfolio().get_open_position_for_pair(pair)
    }

    /// The most recently closed position; ties resolve to the lowest
    /// position id.
    pub fn get_last_closed_position(&self) -> Option<&TradingPosition> {
        self.ledger.portfolio().get_last_closed_position()
    }

    pub fn reserve_currency(&self) -> &AssetIdentifier {
        &self.reserve_currency
    }

    /// Trading fee estimate for a pair, from the pricing collaborator.
    pub async fn get_pair_fee(
        &self,
        pair: Option<&TradingPairIdentifier>,
    ) -> Result<Option<f64>, ExecutorError> {
        Ok(self.pricing.get_pair_fee(self.timestamp, pair).await?)
    }

    /// Open a spot long sized in reserve currency.
    ///
    /// One entry per pair: increasing an existing position through this
    /// call is a precondition failure, use [`Self::adjust_position`].
    /// Trigger percentages are fractions of the mid price at open time
    /// (`stop_loss_pct` below 1.0, `take_profit_pct` above it) and are
    /// converted to absolute price levels before they are stored.
    pub async fn open_1x_long(
        &mut self,
        pair: &TradingPairIdentifier,
        value: impl Into<UsDollarAmount>,
        take_profit_pct: Option<f64>,
        stop_loss_pct: Option<f64>,
        notes: Option<String>,
    ) -> Result<Vec<u64>, ExecutorError> {
        if self.get_current_position_for_pair(pair).is_some() {
            return Err(PositionManagerError::PositionAlreadyOpen {
                pair: pair.to_string(),
            }
            .into());
        }
        validate_trigger_levels(stop_loss_pct, take_profit_pct)?;

        let value = value.into().into_decimal()?;
        let quote = self.pricing.get_buy_price(self.timestamp, pair, value).await?;

        let created = self.ledger.create_trade(
            self.timestamp,
            pair,
            TradeSize::Reserve(value),
            quote.price,
            TradeType::Rebalance,
            trade_options(&quote, notes.clone()),
        )?;

        self.apply_triggers(created.position_id, &quote, stop_loss_pct, take_profit_pct)?;
        if notes.is_some() {
            self.ledger.set_position_notes(created.position_id, notes)?;
        }

        info!(
            pair = %pair,
            value = %value,
            position_id = created.position_id,
            "opened 1x long"
        );
        Ok(vec![created.trade_id])
    }

    /// Move a position towards a target allocation by a dollar delta.
    ///
    /// A positive delta buys, opening the position if none exists. A
    /// negative delta sells against the position's last recorded price —
    /// except at `weight == 0`, where the exact live quantity is sold so
    /// no dust is left behind by price-conversion error.
    pub async fn adjust_position(
        &mut self,
        pair: &TradingPairIdentifier,
        dollar_delta: impl Into<UsDollarAmount>,
        weight: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<Vec<u64>, ExecutorError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(PositionManagerError::InvalidWeight(weight).into());
        }
        validate_trigger_levels(stop_loss, take_profit)?;

        let delta = dollar_delta.into().into_decimal()?;
        if delta.is_zero() {
            return Err(PositionManagerError::ZeroDelta.into());
        }

        let (created, quote) = if delta.is_positive() {
            let quote = self.pricing.get_buy_price(self.timestamp, pair, delta).await?;
            let created = self.ledger.create_trade(
                self.timestamp,
                pair,
                TradeSize::Reserve(delta),
                quote.price,
                TradeType::Rebalance,
                trade_options(&quote, None),
            )?;
            (created, quote)
        } else {
            let (assumed_price, live_quantity) = {
                let position = self.get_current_position_for_pair(pair).ok_or_else(|| {
                    PositionManagerError::NoOpenPosition {
                        pair: pair.to_string(),
                    }
                })?;
                (position.get_current_price(), position.get_live_quantity())
            };

            let quantity = if weight != 0.0 {
                // Sell quantity derived from the last recorded price.
                let quantity = delta / Decimal::from_f64(assumed_price)?;
                debug_assert!(quantity.is_negative());
                quantity
            } else {
                // Weight zero: sell everything, using the exact live
                // quantity rather than a price-derived estimate.
                -live_quantity
            };

            if quantity.is_zero() {
                warn!(pair = %pair, "nothing left to sell, adjust is a no-op");
                return Ok(Vec::new());
            }

            let quote = self
                .pricing
                .get_sell_price(self.timestamp, pair, quantity.abs())
                .await?;
            let created = self.ledger.create_trade(
                self.timestamp,
                pair,
                TradeSize::Quantity(quantity),
                assumed_price,
                TradeType::Rebalance,
                trade_options(&quote, None),
            )?;
            (created, quote)
        };

        self.apply_triggers(created.position_id, &quote, stop_loss, take_profit)?;
        Ok(vec![created.trade_id])
    }

    /// Sell a position's full live quantity at the current sell quote.
    ///
    /// Safe to repeat: if earlier closes already queued enough selling
    /// trades to take the live quantity to zero, no new trade is created
    /// and an empty sequence is returned.
    pub async fn close_position(
        &mut self,
        position_id: u64,
        trade_type: TradeType,
        notes: Option<String>,
    ) -> Result<Vec<u64>, ExecutorError> {
        let (pair, quantity_left) = {
            let position = self
                .ledger
                .portfolio()
                .get_open_position_by_id(position_id)
                .ok_or(PositionManagerError::PositionNotOpen(position_id))?;
            (position.pair.clone(), position.get_live_quantity())
        };

        if quantity_left.is_zero() {
            warn!(
                position_id,
                "position already has enough selling trades to reach zero"
            );
            return Ok(Vec::new());
        }

        let quote = self
            .pricing
            .get_sell_price(self.timestamp, &pair, quantity_left)
            .await?;

        let created = self.ledger.create_trade(
            self.timestamp,
            &pair,
            TradeSize::Quantity(-quantity_left),
            quote.price,
            trade_type,
            trade_options(&quote, notes),
        )?;

        info!(position_id, pair = %pair, quantity = %quantity_left, "closing position");
        Ok(vec![created.trade_id])
    }

    /// Close every open position.
    pub async fn close_all(&mut self) -> Result<Vec<u64>, ExecutorError> {
        if !self.is_any_open() {
            return Err(PositionManagerError::NoPositionsToClose.into());
        }

        let mut trades = Vec::new();
        for position_id in self.ledger.portfolio().open_position_ids() {
            trades.extend(
                self.close_position(position_id, TradeType::Rebalance, None)
                    .await?,
            );
        }
        Ok(trades)
    }

    fn apply_triggers(
        &mut self,
        position_id: u64,
        quote: &PriceStructure,
        stop_loss_pct: Option<f64>,
        take_profit_pct: Option<f64>,
    ) -> Result<(), ExecutorError> {
        let stop_loss = stop_loss_pct.map(|pct| quote.mid_price * pct);
        let take_profit = take_profit_pct.map(|pct| quote.mid_price * pct);
        if stop_loss.is_some() || take_profit.is_some() {
            self.ledger
                .set_position_triggers(position_id, stop_loss, take_profit)?;
        }
        Ok(())
    }
}

fn trade_options(quote: &PriceStructure, notes: Option<String>) -> TradeOptions {
    TradeOptions {
        planned_mid_price: Some(quote.mid_price),
        lp_fees_estimated: quote.lp_fee,
        pair_fee: quote.pair_fee,
        notes,
    }
}

/// Enforce the trigger-percentage convention instead of trusting callers:
/// a stop loss is a fraction below 1.0, a take profit above it.
fn validate_trigger_levels(
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
) -> Result<(), PositionManagerError> {
    if let Some(value) = stop_loss {
        if !(value > 0.0 && value < 1.0) {
            return Err(PositionManagerError::InvalidTriggerLevel {
                kind: "stop loss",
                value,
            });
        }
    }
    if let Some(value) = take_profit {
        if value <= 1.0 {
            return Err(PositionManagerError::InvalidTriggerLevel {
                kind: "take profit",
                value,
            });
        }
    }
    Ok(())
}
