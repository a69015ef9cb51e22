//! Deterministic x·y=k pricing over static pool reserves.
//!
//! Quotes reproduce Uniswap v2 execution math: the trading fee is taken on
//! the input side, and the output follows from the constant-product
//! invariant. Reserves are fixed for the model's lifetime, so a quote for a
//! given (pair, amount) is the same no matter when it is asked — which is
//! exactly what a backtest needs.

use super::{PriceStructure, PricingError, PricingModel};
use crate::domain::{Decimal, PairKey, TradingPairIdentifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct PoolReserves {
    base: Decimal,
    quote: Decimal,
    /// Trading fee as a fraction, e.g. 0.003.
    fee: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantProductPricing {
    pools: HashMap<PairKey, PoolReserves>,
}

impl ConstantProductPricing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool with its reserves and fee.
    pub fn with_pool(
        mut self,
        pair: &TradingPairIdentifier,
        base_reserve: Decimal,
        quote_reserve: Decimal,
        fee: f64,
    ) -> Self {
        self.pools.insert(
            pair.key(),
            PoolReserves {
                base: base_reserve,
                quote: quote_reserve,
                fee,
            },
        );
        self
    }

    fn pool(
        &self,
        pair: &TradingPairIdentifier,
        at: DateTime<Utc>,
    ) -> Result<PoolReserves, PricingError> {
        self.pools
            .get(&pair.key())
            .copied()
            .ok_or_else(|| PricingError::PriceUnavailable {
                pair: pair.to_string(),
                at,
            })
    }

    fn fee_decimal(fee: f64) -> Result<Decimal, PricingError> {
        Decimal::from_f64(fee).map_err(|e| PricingError::Other(e.to_string()))
    }
}

#[async_trait]
impl PricingModel for ConstantProductPricing {
    async fn get_buy_price(
        &self,
        at: DateTime<Utc>,
        pair: &TradingPairIdentifier,
        reserve: Decimal,
    ) -> Result<PriceStructure, PricingError> {
        if !reserve.is_positive() {
            return Err(PricingError::NonPositiveAmount(reserve));
        }
        let pool = self.pool(pair, at)?;
        let fee = Self::fee_decimal(pool.fee)?;
        let one = Decimal::from(rust_decimal::Decimal::ONE);

        let in_after_fee = reserve * (one - fee);
        let quantity_out = pool.base * in_after_fee / (pool.quote + in_after_fee);

        Ok(PriceStructure {
            price: reserve.to_f64() / quantity_out.to_f64(),
            mid_price: (pool.quote / pool.base).to_f64(),
            lp_fee: Some(reserve * fee),
            pair_fee: Some(pool.fee),
        })
    }

    async fn get_sell_price(
        &self,
        at: DateTime<Utc>,
        pair: &TradingPairIdentifier,
        quantity: Decimal,
    ) -> Result<PriceStructure, PricingError> {
        if !quantity.is_positive() {
            return Err(PricingError::NonPositiveAmount(quantity));
        }
        let pool = self.pool(pair, at)?;
        let fee = Self::fee_decimal(pool.fee)?;
        let one = Decimal::from(rust_decimal::Decimal::ONE);

        let in_after_fee = quantity * (one - fee);
        let reserve_out = pool.quote * in_after_fee / (pool.base + in_after_fee);
        let mid = pool.quote / pool.base;

        Ok(PriceStructure {
            price: (reserve_out / quantity).to_f64(),
            mid_price: mid.to_f64(),
            lp_fee: Some(quantity * fee * mid),
            pair_fee: Some(pool.fee),
        })
    }

    async fn get_pair_fee(
        &self,
        at: DateTime<Utc>,
        pair: Option<&TradingPairIdentifier>,
    ) -> Result<Option<f64>, PricingError> {
        match pair {
            Some(pair) => Ok(Some(self.pool(pair, at)?.fee)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetIdentifier;
    use alloy_primitives::Address;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_640_000_000, 0).unwrap()
    }

    fn weth_usdc() -> TradingPairIdentifier {
        TradingPairIdentifier::new(
            AssetIdentifier::new(1, Address::repeat_byte(0xbb), "WETH", 18),
            AssetIdentifier::new(1, Address::repeat_byte(0xaa), "USDC", 6),
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
        )
        .with_fee(0.003)
    }

    fn model() -> ConstantProductPricing {
        // 2000 WETH / 3.41M USDC puts the mid price at exactly 1705.
        ConstantProductPricing::new().with_pool(
            &weth_usdc(),
            Decimal::from(dec!(2000)),
            Decimal::from(dec!(3410000)),
            0.003,
        )
    }

    #[tokio::test]
    async fn test_mid_price_from_reserves() {
        let quote = model()
            .get_buy_price(ts(), &weth_usdc(), Decimal::from(dec!(100)))
            .await
            .unwrap();
        assert_eq!(quote.mid_price, 1705.0);
        assert_eq!(quote.pair_fee, Some(0.003));
    }

    #[tokio::test]
    async fn test_buy_price_reflects_fee_and_depth() {
        let quote = model()
            .get_buy_price(ts(), &weth_usdc(), Decimal::from(dec!(9500)))
            .await
            .unwrap();

        // 9500 in with 30 bps fee against 2000/3.41M reserves buys ~5.5397,
        // an execution price a bit under 1715.
        let quantity = 9500.0 / quote.price;
        assert!((quantity - 5.5397).abs() < 0.001, "got {quantity}");
        assert!(quote.price > quote.mid_price);
        assert_eq!(quote.lp_fee, Some(Decimal::from(dec!(28.5))));
    }

    #[tokio::test]
    async fn test_sell_price_below_mid() {
        let quote = model()
            .get_sell_price(ts(), &weth_usdc(), Decimal::from(dec!(5.5)))
            .await
            .unwrap();
        assert!(quote.price < quote.mid_price);
        assert!(quote.price > 1690.0);
    }

    #[tokio::test]
    async fn test_quotes_are_deterministic() {
        let m = model();
        let a = m
            .get_buy_price(ts(), &weth_usdc(), Decimal::from(dec!(9500)))
            .await
            .unwrap();
        let b = m
            .get_buy_price(ts(), &weth_usdc(), Decimal::from(dec!(9500)))
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_unknown_pair_is_price_unavailable() {
        let other = TradingPairIdentifier::new(
            AssetIdentifier::new(1, Address::repeat_byte(0xcc), "AAVE", 18),
            AssetIdentifier::new(1, Address::repeat_byte(0xaa), "USDC", 6),
            Address::repeat_byte(0x33),
            Address::repeat_byte(0x22),
        );
        let err = model()
            .get_buy_price(ts(), &other, Decimal::from(dec!(100)))
            .await
            .unwrap_err();
        match err {
            PricingError::PriceUnavailable { pair, .. } => {
                assert!(pair.contains("AAVE-USDC"), "offending pair named: {pair}")
            }
            other => panic!("expected PriceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let err = model()
            .get_buy_price(ts(), &weth_usdc(), Decimal::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::NonPositiveAmount(_)));
    }
}
