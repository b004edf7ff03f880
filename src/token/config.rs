//! Token configuration
//!
//! Metadata and exchange rate are fixed when the ledger is created and never
//! change afterwards.

use crate::core::{UnitConverter, DEFAULT_DECIMALS, WEI_PER_MICRO_ETH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token name
pub const DEFAULT_NAME: &str = "microETH";

/// Default token symbol
pub const DEFAULT_SYMBOL: &str = "uETH";

/// Highest supported decimal places
pub const MAX_DECIMALS: u8 = 18;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid name: must be 1-50 characters")]
    InvalidName,
    #[error("Invalid symbol: must be 1-10 characters")]
    InvalidSymbol,
    #[error("Invalid decimals: must be 0-18")]
    InvalidDecimals,
    #[error("Invalid exchange rate: must be greater than 0")]
    InvalidExchangeRate,
}

/// Immutable token metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token name (e.g., "microETH")
    pub name: String,
    /// Token symbol (e.g., "uETH")
    pub symbol: String,
    /// Decimal places of the subunit representation
    pub decimals: u8,
}

/// Everything needed to construct a token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Wei per whole token unit
    pub wei_per_unit: u128,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
            wei_per_unit: WEI_PER_MICRO_ETH,
        }
    }
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.name.chars().count() > 50 {
            return Err(ConfigError::InvalidName);
        }
        if self.symbol.is_empty() || self.symbol.chars().count() > 10 {
            return Err(ConfigError::InvalidSymbol);
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::InvalidDecimals);
        }
        if self.wei_per_unit == 0 {
            return Err(ConfigError::InvalidExchangeRate);
        }
        Ok(())
    }

    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
        }
    }

    pub fn converter(&self) -> UnitConverter {
        UnitConverter::new(self.wei_per_unit, self.decimals)
    }
}
