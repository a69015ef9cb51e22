use crate::routing::state::{DEFAULT_APPROVE_GAS_LIMIT, DEFAULT_SWAP_GAS_LIMIT};
use std::collections::HashMap;
use thiserror::Error;

/// Execution-core settings, read from the environment by the surrounding
/// harness. Everything has a sensible default; backtests usually run with
/// no environment at all.
#[derive(Debug, Clone)]
pub struct Config {
    pub chain_id: u64,
    /// Gas budget for a swap.
    pub swap_gas_limit: u64,
    /// Gas budget for an ERC-20 approve.
    pub approve_gas_limit: u64,
    /// Slippage tolerance applied when deriving a swap's minimum output.
    pub max_slippage_bps: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: 1,
            swap_gas_limit: DEFAULT_SWAP_GAS_LIMIT,
            approve_gas_limit: DEFAULT_APPROVE_GAS_LIMIT,
            max_slippage_bps: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let chain_id = parse_or(&env_map, "CHAIN_ID", defaults.chain_id)?;
        let swap_gas_limit = parse_or(&env_map, "SWAP_GAS_LIMIT", defaults.swap_gas_limit)?;
        let approve_gas_limit =
            parse_or(&env_map, "APPROVE_GAS_LIMIT", defaults.approve_gas_limit)?;
        let max_slippage_bps =
            parse_or(&env_map, "MAX_SLIPPAGE_BPS", defaults.max_slippage_bps)?;

        if max_slippage_bps > 10_000 {
            return Err(ConfigError::InvalidValue(
                "MAX_SLIPPAGE_BPS".to_string(),
                format!("must be at most 10000, got {max_slippage_bps}"),
            ));
        }

        Ok(Config {
            chain_id,
            swap_gas_limit,
            approve_gas_limit,
            max_slippage_bps,
        })
    }

    /// Slippage tolerance as a fraction, e.g. 50 bps -> 0.005.
    pub fn max_slippage_fraction(&self) -> f64 {
        self.max_slippage_bps as f64 / 10_000.0
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("could not parse {raw:?}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_empty_env() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.swap_gas_limit, 2_000_000);
        assert_eq!(config.approve_gas_limit, 100_000);
        assert_eq!(config.max_slippage_bps, 50);
    }

    #[test]
    fn test_overrides_from_env() {
        let mut env_map = HashMap::new();
        env_map.insert("CHAIN_ID".to_string(), "56".to_string());
        env_map.insert("SWAP_GAS_LIMIT".to_string(), "1500000".to_string());
        env_map.insert("MAX_SLIPPAGE_BPS".to_string(), "100".to_string());

        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.chain_id, 56);
        assert_eq!(config.swap_gas_limit, 1_500_000);
        assert_eq!(config.max_slippage_bps, 100);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut env_map = HashMap::new();
        env_map.insert("CHAIN_ID".to_string(), "mainnet".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CHAIN_ID"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_slippage_cap() {
        let mut env_map = HashMap::new();
        env_map.insert("MAX_SLIPPAGE_BPS".to_string(), "20000".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "MAX_SLIPPAGE_BPS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_slippage_fraction() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.max_slippage_fraction(), 0.005);
    }
}
