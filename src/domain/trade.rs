//! Trade records: one `TradeExecution` per buy or sell decided by a strategy.
//!
//! A trade is planned at decision time (quantity, price and fees as assumed
//! by the strategy) and finalized exactly once with the executed figures
//! after on-chain confirmation. Failed trades stay in the ledger for audit
//! but contribute nothing to position quantity.

use crate::domain::{AssetIdentifier, Decimal, TradingPairIdentifier};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a trade was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    /// Portfolio rebalance decided by the strategy's target weights.
    Rebalance,
    /// Explicit position entry.
    Open,
    /// Explicit position exit.
    Close,
    /// Exit triggered by a stop-loss level.
    StopLoss,
    /// Exit triggered by a take-profit level.
    TakeProfit,
}

/// Lifecycle state of a trade, derived from its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Decided, not yet handed to the execution layer.
    Planned,
    /// Broadcast in flight.
    Started,
    /// Confirmed on-chain.
    Success,
    /// Reverted or never confirmed.
    Failed,
}

/// A described contract call attached to a trade.
///
/// ABI encoding, signing and broadcast belong to the transaction-building
/// collaborator; the ledger only keeps the description and the resulting
/// hash for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainTransaction {
    pub chain_id: u64,
    pub contract_address: Address,
    pub function_name: String,
    /// Argument tuple in JSON form, as handed to the ABI encoder.
    pub args: serde_json::Value,
    pub gas_limit: u64,
    pub nonce: Option<u64>,
    pub tx_hash: Option<String>,
}

/// A single buy or sell belonging to exactly one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecution {
    pub trade_id: u64,
    pub position_id: u64,
    pub pair: TradingPairIdentifier,
    pub trade_type: TradeType,
    pub created_at: DateTime<Utc>,

    /// Signed quantity decided at creation time; negative means the trade
    /// reduces the position.
    pub planned_quantity: Decimal,
    /// Reserve currency committed to (buy) or expected from (sell) the trade.
    pub planned_reserve: Decimal,
    /// Execution price assumed at planning time.
    pub planned_price: f64,
    /// Mid price of the pair when the trade was decided.
    pub planned_mid_price: Option<f64>,

    pub reserve_currency: AssetIdentifier,
    /// USD exchange rate of the reserve currency at planning time.
    pub reserve_currency_price: f64,

    /// Estimated liquidity-provider fee, in reserve currency.
    pub lp_fees_estimated: Option<Decimal>,
    /// Trading fee of the pool as a fraction, e.g. 0.003.
    pub pair_fee: Option<f64>,

    pub started_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,

    /// Filled after confirmation; differs from the plan by slippage.
    pub executed_quantity: Option<Decimal>,
    pub executed_price: Option<f64>,
    pub executed_reserve: Option<Decimal>,

    pub blockchain_transactions: Vec<BlockchainTransaction>,
    pub notes: Option<String>,
}

impl TradeExecution {
    pub fn status(&self) -> TradeStatus {
        if self.failed_at.is_some() {
            TradeStatus::Failed
        } else if self.executed_at.is_some() {
            TradeStatus::Success
        } else if self.started_at.is_some() {
            TradeStatus::Started
        } else {
            TradeStatus::Planned
        }
    }

    pub fn is_buy(&self) -> bool {
        self.planned_quantity.is_positive()
    }

    pub fn is_sell(&self) -> bool {
        self.planned_quantity.is_negative()
    }

    /// Still waiting for an execution outcome.
    pub fn is_pending(&self) -> bool {
        matches!(self.status(), TradeStatus::Planned | TradeStatus::Started)
    }

    pub fn is_success(&self) -> bool {
        self.status() == TradeStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status() == TradeStatus::Failed
    }

    /// Signed quantity this trade contributed to its position. Zero unless
    /// the trade succeeded.
    pub fn get_executed_quantity(&self) -> Decimal {
        if self.is_success() {
            self.executed_quantity.unwrap_or_else(Decimal::zero)
        } else {
            Decimal::zero()
        }
    }

    /// Quantity to assume for live accounting: executed figures once known,
    /// the plan while the trade is still pending, nothing if it failed.
    pub fn get_live_quantity(&self) -> Decimal {
        match self.status() {
            TradeStatus::Success => self.executed_quantity.unwrap_or_else(Decimal::zero),
            TradeStatus::Planned | TradeStatus::Started => self.planned_quantity,
            TradeStatus::Failed => Decimal::zero(),
        }
    }

    pub(crate) fn mark_started(&mut self, at: DateTime<Utc>) {
        self.started_at = Some(at);
    }

    pub(crate) fn mark_success(
        &mut self,
        at: DateTime<Utc>,
        executed_price: f64,
        executed_quantity: Decimal,
        executed_reserve: Decimal,
        txs: Vec<BlockchainTransaction>,
    ) {
        self.executed_at = Some(at);
        self.executed_price = Some(executed_price);
        self.executed_quantity = Some(executed_quantity);
        self.executed_reserve = Some(executed_reserve);
        self.blockchain_transactions.extend(txs);
    }

    pub(crate) fn mark_failed(&mut self, at: DateTime<Utc>, txs: Vec<BlockchainTransaction>) {
        self.failed_at = Some(at);
        self.blockchain_transactions.extend(txs);
    }
}

impl std::fmt::Display for TradeExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = if self.is_buy() { "buy" } else { "sell" };
        write!(
            f,
            "trade #{} {} {} {} @ {}",
            self.trade_id,
            side,
            self.planned_quantity.abs(),
            self.pair.slug(),
            self.planned_price,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn usdc() -> AssetIdentifier {
        AssetIdentifier::new(1, Address::repeat_byte(0xaa), "USDC", 6)
    }

    fn weth_usdc() -> TradingPairIdentifier {
        TradingPairIdentifier::new(
            AssetIdentifier::new(1, Address::repeat_byte(0xbb), "WETH", 18),
            usdc(),
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
        )
    }

    fn planned_buy() -> TradeExecution {
        TradeExecution {
            trade_id: 1,
            position_id: 1,
            pair: weth_usdc(),
            trade_type: TradeType::Rebalance,
            created_at: ts(1_000),
            planned_quantity: Decimal::from(dec!(5.57)),
            planned_reserve: Decimal::from(dec!(9500)),
            planned_price: 1705.12,
            planned_mid_price: Some(1705.0),
            reserve_currency: usdc(),
            reserve_currency_price: 1.0,
            lp_fees_estimated: Some(Decimal::from(dec!(28.5))),
            pair_fee: Some(0.003),
            started_at: None,
            executed_at: None,
            failed_at: None,
            executed_quantity: None,
            executed_price: None,
            executed_reserve: None,
            blockchain_transactions: Vec::new(),
            notes: None,
        }
    }

    #[test]
    fn test_status_progression() {
        let mut trade = planned_buy();
        assert_eq!(trade.status(), TradeStatus::Planned);
        assert!(trade.is_pending());

        trade.mark_started(ts(1_001));
        assert_eq!(trade.status(), TradeStatus::Started);
        assert!(trade.is_pending());

        trade.mark_success(
            ts(1_002),
            1714.9,
            Decimal::from(dec!(5.54)),
            Decimal::from(dec!(9500)),
            Vec::new(),
        );
        assert_eq!(trade.status(), TradeStatus::Success);
        assert!(!trade.is_pending());
    }

    #[test]
    fn test_failed_trade_contributes_no_quantity() {
        let mut trade = planned_buy();
        trade.mark_started(ts(1_001));
        trade.mark_failed(ts(1_002), Vec::new());

        assert_eq!(trade.status(), TradeStatus::Failed);
        assert!(trade.get_executed_quantity().is_zero());
        assert!(trade.get_live_quantity().is_zero());
    }

    #[test]
    fn test_live_quantity_uses_plan_while_pending() {
        let trade = planned_buy();
        assert_eq!(trade.get_live_quantity(), Decimal::from(dec!(5.57)));
        assert!(trade.get_executed_quantity().is_zero());
    }

    #[test]
    fn test_buy_sell_sign_convention() {
        let buy = planned_buy();
        assert!(buy.is_buy());

        let mut sell = planned_buy();
        sell.planned_quantity = Decimal::from(dec!(-5.57));
        assert!(sell.is_sell());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut trade = planned_buy();
        trade.mark_success(
            ts(1_002),
            1714.9,
            Decimal::from(dec!(5.5406)),
            Decimal::from(dec!(9500)),
            vec![BlockchainTransaction {
                chain_id: 1,
                contract_address: Address::repeat_byte(0x33),
                function_name: "swapExactTokensForTokens".to_string(),
                args: serde_json::json!([]),
                gas_limit: 2_000_000,
                nonce: Some(7),
                tx_hash: Some("0xdeadbeef".to_string()),
            }],
        );

        let json = serde_json::to_string(&trade).unwrap();
        let back: TradeExecution = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
        assert_eq!(back.status(), TradeStatus::Success);
    }
}
