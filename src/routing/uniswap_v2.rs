//! Routing model contract and its Uniswap v2 implementation.
//!
//! A routing model knows which router serves a pair and how to lay a trade
//! out as chain operations. Each exchange family implements the full
//! capability set.

use super::route::{get_base_quote, get_base_quote_intermediary, validate_pairs};
use super::{RoutingError, RoutingState};
use crate::domain::{AssetIdentifier, BlockchainTransaction, TradingPairIdentifier};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Swap deadline passed to the router. Execution-layer timeout policy is
/// out of the core's hands, so the on-chain deadline is effectively never.
const FOREVER_DEADLINE: u64 = u64::MAX;

/// Capability set every exchange-family routing model must provide.
#[async_trait]
pub trait RoutingModel: Send + Sync {
    /// Router contract that serves this pair.
    fn get_router_for_pair(&self, pair: &TradingPairIdentifier)
        -> Result<Address, RoutingError>;

    /// Lay out a direct trade: approvals (if needed) followed by one swap.
    async fn trade_two_way(
        &self,
        state: &mut RoutingState,
        pair: &TradingPairIdentifier,
        reserve: &AssetIdentifier,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<Vec<BlockchainTransaction>, RoutingError>;

    /// Lay out a two-hop trade through an intermediary reserve pair.
    async fn trade_three_way(
        &self,
        state: &mut RoutingState,
        target: &TradingPairIdentifier,
        intermediary: &TradingPairIdentifier,
        reserve: &AssetIdentifier,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<Vec<BlockchainTransaction>, RoutingError>;
}

/// Routing for Uniswap v2 compatible exchanges.
#[derive(Debug, Clone)]
pub struct UniswapV2Routing {
    /// Factory address identifying the exchange; pairs on any other
    /// factory are rejected.
    pub factory_address: Address,
    /// The swap router all trades go through.
    pub router_address: Address,
}

impl UniswapV2Routing {
    pub fn new(factory_address: Address, router_address: Address) -> Self {
        Self {
            factory_address,
            router_address,
        }
    }

    /// Build the swap call for an already validated path.
    async fn build_swap(
        &self,
        state: &RoutingState,
        path: Vec<Address>,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<BlockchainTransaction, RoutingError> {
        let path_json: Vec<String> = path.iter().map(|a| a.to_string()).collect();
        let tx = state
            .transaction_builder()
            .create_transaction(
                self.router_address,
                "swapExactTokensForTokens",
                json!([
                    amount_in.to_string(),
                    min_amount_out.to_string(),
                    path_json,
                    state.wallet_address().to_string(),
                    FOREVER_DEADLINE.to_string(),
                ]),
                state.swap_gas_limit(),
            )
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl RoutingModel for UniswapV2Routing {
    fn get_router_for_pair(
        &self,
        pair: &TradingPairIdentifier,
    ) -> Result<Address, RoutingError> {
        if pair.exchange_address != self.factory_address {
            return Err(RoutingError::UnsupportedExchange {
                pair: pair.to_string(),
                exchange: pair.exchange_address,
            });
        }
        Ok(self.router_address)
    }

    async fn trade_two_way(
        &self,
        state: &mut RoutingState,
        pair: &TradingPairIdentifier,
        reserve: &AssetIdentifier,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<Vec<BlockchainTransaction>, RoutingError> {
        let router = self.get_router_for_pair(pair)?;
        let (acquired, spent) = get_base_quote(pair, reserve)?;

        state.check_has_enough_tokens(&spent, amount_in).await?;

        let mut txs = Vec::new();
        if let Some(approval) = state.ensure_token_approved(spent.address, router).await? {
            txs.push(approval);
        }

        let swap = self
            .build_swap(
                state,
                vec![spent.address, acquired.address],
                amount_in,
                min_amount_out,
            )
            .await?;
        info!(pair = %pair, ops = txs.len() + 1, "routed direct trade");
        txs.push(swap);
        Ok(txs)
    }

    async fn trade_three_way(
        &self,
        state: &mut RoutingState,
        target: &TradingPairIdentifier,
        intermediary: &TradingPairIdentifier,
        reserve: &AssetIdentifier,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<Vec<BlockchainTransaction>, RoutingError> {
        validate_pairs(target, intermediary)?;
        let router = self.get_router_for_pair(target)?;
        let (acquired, spent, hop) = get_base_quote_intermediary(target, intermediary, reserve)?;

        state.check_has_enough_tokens(&spent, amount_in).await?;

        let mut txs = Vec::new();
        if let Some(approval) = state.ensure_token_approved(spent.address, router).await? {
            txs.push(approval);
        }

        let swap = self
            .build_swap(
                state,
                vec![spent.address, hop.address, acquired.address],
                amount_in,
                min_amount_out,
            )
            .await?;
        info!(
            target = %target,
            intermediary = %intermediary,
            ops = txs.len() + 1,
            "routed two-hop trade"
        );
        txs.push(swap);
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockTransactionBuilder;
    use alloy_primitives::utils::parse_units;
    use std::sync::Arc;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn busd() -> AssetIdentifier {
        AssetIdentifier::new(56, addr(0xaa), "BUSD", 18)
    }

    fn wbnb() -> AssetIdentifier {
        AssetIdentifier::new(56, addr(0xbb), "WBNB", 18)
    }

    fn cake() -> AssetIdentifier {
        AssetIdentifier::new(56, addr(0xcc), "Cake", 18)
    }

    fn factory() -> Address {
        addr(0x22)
    }

    fn router() -> Address {
        addr(0x77)
    }

    fn cake_wbnb() -> TradingPairIdentifier {
        TradingPairIdentifier::new(cake(), wbnb(), addr(0x11), factory())
    }

    fn wbnb_busd() -> TradingPairIdentifier {
        TradingPairIdentifier::new(wbnb(), busd(), addr(0x12), factory())
    }

    fn cake_busd() -> TradingPairIdentifier {
        TradingPairIdentifier::new(cake(), busd(), addr(0x13), factory())
    }

    fn routing() -> UniswapV2Routing {
        UniswapV2Routing::new(factory(), router())
    }

    fn funded_state(token: &AssetIdentifier, human_amount: &str) -> RoutingState {
        let wallet = addr(0x01);
        let builder = MockTransactionBuilder::new(56, wallet).with_balance(
            token.address,
            wallet,
            parse_units(human_amount, token.decimals).unwrap().get_absolute(),
        );
        RoutingState::new(Arc::new(builder))
    }

    fn amount(token: &AssetIdentifier, human_amount: &str) -> U256 {
        parse_units(human_amount, token.decimals).unwrap().get_absolute()
    }

    #[tokio::test]
    async fn test_direct_trade_is_approval_then_swap() {
        let mut state = funded_state(&busd(), "10000");
        let txs = routing()
            .trade_two_way(
                &mut state,
                &cake_busd(),
                &busd(),
                amount(&busd(), "9500"),
                U256::ZERO,
            )
            .await
            .unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].function_name, "approve");
        assert_eq!(txs[0].contract_address, busd().address);
        assert_eq!(txs[1].function_name, "swapExactTokensForTokens");
        assert_eq!(txs[1].contract_address, router());

        let path = txs[1].args[2].as_array().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].as_str().unwrap(), busd().address.to_string());
        assert_eq!(path[1].as_str().unwrap(), cake().address.to_string());
    }

    #[tokio::test]
    async fn test_second_trade_reuses_approval() {
        let mut state = funded_state(&busd(), "10000");
        let model = routing();
        let first = model
            .trade_two_way(
                &mut state,
                &cake_busd(),
                &busd(),
                amount(&busd(), "100"),
                U256::ZERO,
            )
            .await
            .unwrap();
        let second = model
            .trade_two_way(
                &mut state,
                &cake_busd(),
                &busd(),
                amount(&busd(), "100"),
                U256::ZERO,
            )
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1, "approval must not be repeated");
        assert_eq!(second[0].function_name, "swapExactTokensForTokens");
    }

    #[tokio::test]
    async fn test_two_hop_path_order() {
        let mut state = funded_state(&busd(), "10000");
        let txs = routing()
            .trade_three_way(
                &mut state,
                &cake_wbnb(),
                &wbnb_busd(),
                &busd(),
                amount(&busd(), "9500"),
                U256::ZERO,
            )
            .await
            .unwrap();

        let swap = txs.last().unwrap();
        let path = swap.args[2].as_array().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].as_str().unwrap(), busd().address.to_string());
        assert_eq!(path[1].as_str().unwrap(), wbnb().address.to_string());
        assert_eq!(path[2].as_str().unwrap(), cake().address.to_string());
    }

    #[tokio::test]
    async fn test_two_hop_rejects_broken_chain() {
        let mut state = funded_state(&busd(), "10000");
        // Cake-BUSD cannot chain through WBNB-BUSD.
        let err = routing()
            .trade_three_way(
                &mut state,
                &cake_busd(),
                &wbnb_busd(),
                &busd(),
                amount(&busd(), "100"),
                U256::ZERO,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::UnroutableHop { .. }));
    }

    #[tokio::test]
    async fn test_foreign_exchange_pair_rejected() {
        let mut pair = cake_busd();
        pair.exchange_address = addr(0x99);
        let err = routing().get_router_for_pair(&pair).unwrap_err();
        assert!(matches!(err, RoutingError::UnsupportedExchange { .. }));
    }

    #[tokio::test]
    async fn test_insufficient_balance_stops_routing() {
        let mut state = funded_state(&busd(), "500");
        let err = routing()
            .trade_two_way(
                &mut state,
                &cake_busd(),
                &busd(),
                amount(&busd(), "9500"),
                U256::ZERO,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::OutOfBalance { .. }));
    }
}
