//! Asset and trading pair identity.
//!
//! An asset is identified by (chain id, contract address); a pair by
//! (chain id, pool address). Internal numeric pair ids handed out by the
//! trading universe are cycle-local and must never be used as durable keys.

use crate::domain::Decimal;
use alloy_primitives::utils::{format_units, parse_units, UnitsError};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Conversion between raw on-chain amounts and human-readable decimals failed.
#[derive(Debug, Error)]
pub enum TokenAmountError {
    #[error("unit conversion failed: {0}")]
    Units(#[from] UnitsError),
    #[error("amount does not fit a decimal: {0}")]
    Precision(#[from] rust_decimal::Error),
}

/// An ERC-20 token on a specific chain.
///
/// Value type; two assets are equal iff chain id and contract address match.
/// The 20-byte address representation makes the comparison case-insensitive
/// by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIdentifier {
    pub chain_id: u64,
    pub address: Address,
    pub token_symbol: String,
    /// Decimal count declared by the token contract.
    pub decimals: u8,
}

impl AssetIdentifier {
    pub fn new(chain_id: u64, address: Address, token_symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            chain_id,
            address,
            token_symbol: token_symbol.into(),
            decimals,
        }
    }

    /// Convert a raw on-chain balance to human-readable decimal units.
    pub fn convert_to_decimals(&self, raw: U256) -> Result<Decimal, TokenAmountError> {
        let formatted = format_units(raw, self.decimals)?;
        Ok(Decimal::from_str_canonical(&formatted)?)
    }

    /// Convert a human-readable quantity to the raw fixed-point form the
    /// chain holds.
    pub fn convert_from_decimals(&self, quantity: Decimal) -> Result<U256, TokenAmountError> {
        Ok(parse_units(&quantity.to_canonical_string(), self.decimals)?.get_absolute())
    }
}

impl PartialEq for AssetIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for AssetIdentifier {}

impl Hash for AssetIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl fmt::Display for AssetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.token_symbol, self.address)
    }
}

/// Durable identity of a trading pair: (chain id, pool contract address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub chain_id: u64,
    pub pool_address: Address,
}

/// A liquidity pool on a specific exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingPairIdentifier {
    /// The risk asset.
    pub base: AssetIdentifier,
    /// The reserve-denominated side.
    pub quote: AssetIdentifier,
    pub pool_address: Address,
    /// Factory address of the exchange this pool belongs to.
    pub exchange_address: Address,
    /// Trading fee as a fraction, e.g. 0.003 for a 30 bps pool.
    pub fee: Option<f64>,
    /// Cycle-local numeric id from the trading universe. Not stable across
    /// universe reloads; never persist it.
    pub internal_id: Option<u64>,
}

impl TradingPairIdentifier {
    pub fn new(
        base: AssetIdentifier,
        quote: AssetIdentifier,
        pool_address: Address,
        exchange_address: Address,
    ) -> Self {
        Self {
            base,
            quote,
            pool_address,
            exchange_address,
            fee: None,
            internal_id: None,
        }
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn with_internal_id(mut self, internal_id: u64) -> Self {
        self.internal_id = Some(internal_id);
        self
    }

    /// Durable map key for this pair.
    pub fn key(&self) -> PairKey {
        PairKey {
            chain_id: self.base.chain_id,
            pool_address: self.pool_address,
        }
    }

    /// "WETH-USDC" style slug used in log lines and error messages.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.base.token_symbol, self.quote.token_symbol)
    }
}

impl PartialEq for TradingPairIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TradingPairIdentifier {}

impl Hash for TradingPairIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for TradingPairIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.slug(), self.pool_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn usdc() -> AssetIdentifier {
        AssetIdentifier::new(1, addr(0xaa), "USDC", 6)
    }

    fn weth() -> AssetIdentifier {
        AssetIdentifier::new(1, addr(0xbb), "WETH", 18)
    }

    #[test]
    fn test_asset_equality_ignores_symbol_and_decimals() {
        let a = AssetIdentifier::new(1, addr(0xaa), "USDC", 6);
        let b = AssetIdentifier::new(1, addr(0xaa), "usd-coin", 18);
        assert_eq!(a, b);
    }

    #[test]
    fn test_asset_equality_requires_same_chain() {
        let mainnet = AssetIdentifier::new(1, addr(0xaa), "USDC", 6);
        let polygon = AssetIdentifier::new(137, addr(0xaa), "USDC", 6);
        assert_ne!(mainnet, polygon);
    }

    #[test]
    fn test_address_comparison_is_case_insensitive() {
        // Mixed-case checksummed and lowercase renderings parse to the same
        // 20 bytes, so equality cannot be tricked by casing.
        let checksummed: Address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
            .parse()
            .unwrap();
        let lowercase: Address = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
            .parse()
            .unwrap();
        assert_eq!(
            AssetIdentifier::new(1, checksummed, "WETH", 18),
            AssetIdentifier::new(1, lowercase, "WETH", 18)
        );
    }

    #[test]
    fn test_convert_to_decimals() {
        let asset = usdc();
        let raw = U256::from(10_000_000_000u64); // 10,000 USDC at 6 decimals
        assert_eq!(
            asset.convert_to_decimals(raw).unwrap(),
            Decimal::from(dec!(10000))
        );
    }

    #[test]
    fn test_convert_from_decimals() {
        let asset = usdc();
        let raw = asset
            .convert_from_decimals(Decimal::from(dec!(9500)))
            .unwrap();
        assert_eq!(raw, U256::from(9_500_000_000u64));
    }

    #[test]
    fn test_pair_identity_is_chain_and_pool() {
        let pool = addr(0x11);
        let exchange = addr(0x22);
        let a = TradingPairIdentifier::new(weth(), usdc(), pool, exchange).with_internal_id(1);
        let b = TradingPairIdentifier::new(weth(), usdc(), pool, exchange).with_internal_id(999);
        // Internal ids are cycle-local noise; identity is (chain, pool).
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_pair_slug() {
        let pair = TradingPairIdentifier::new(weth(), usdc(), addr(0x11), addr(0x22));
        assert_eq!(pair.slug(), "WETH-USDC");
    }

    #[test]
    fn test_pair_serde_roundtrip() {
        let pair = TradingPairIdentifier::new(weth(), usdc(), addr(0x11), addr(0x22))
            .with_fee(0.003)
            .with_internal_id(7);
        let json = serde_json::to_string(&pair).unwrap();
        let back: TradingPairIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(pair, back);
        assert_eq!(back.fee, Some(0.003));
    }
}
