//! Pricing collaborator interface.
//!
//! A pricing model answers "what would this trade cost right now": an
//! execution price estimate for a concrete size, the mid price, and fee
//! estimates. Implementations must be deterministic for a given
//! (timestamp, pair, amount) when backtesting; live implementations may
//! approximate from market state.

use crate::domain::{Decimal, TradingPairIdentifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

pub mod constant_product;

pub use constant_product::ConstantProductPricing;

/// A quote for one concrete trade size.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStructure {
    /// Estimated execution price for the quoted size, fees included.
    pub price: f64,
    /// Mid price of the pair, independent of trade size.
    pub mid_price: f64,
    /// Estimated liquidity-provider fee in reserve currency.
    pub lp_fee: Option<Decimal>,
    /// The pool's trading fee as a fraction.
    pub pair_fee: Option<f64>,
}

/// Error type for pricing operations.
#[derive(Debug, Clone, Error)]
pub enum PricingError {
    /// No price sample available. Transient in live trading; a data gap in
    /// a backtest.
    #[error("no price sample for {pair} at {at}")]
    PriceUnavailable { pair: String, at: DateTime<Utc> },
    #[error("quote size must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("pricing failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait PricingModel: Send + Sync + fmt::Debug {
    /// Quote buying base asset with `reserve` units of reserve currency.
    async fn get_buy_price(
        &self,
        at: DateTime<Utc>,
        pair: &TradingPairIdentifier,
        reserve: Decimal,
    ) -> Result<PriceStructure, PricingError>;

    /// Quote selling `quantity` units of the base asset.
    async fn get_sell_price(
        &self,
        at: DateTime<Utc>,
        pair: &TradingPairIdentifier,
        quantity: Decimal,
    ) -> Result<PriceStructure, PricingError>;

    /// The trading fee for a pair, when the model knows it. `None` pair is
    /// allowed for exchanges with a flat fee schedule.
    async fn get_pair_fee(
        &self,
        at: DateTime<Utc>,
        pair: Option<&TradingPairIdentifier>,
    ) -> Result<Option<f64>, PricingError>;
}
