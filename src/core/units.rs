//! Native currency ⇄ token unit conversion
//!
//! Pure integer arithmetic, no state. Amounts are `u128` and every
//! multiplication is checked:
//! - native currency is counted in wei (10^18 wei per ether)
//! - one whole token unit costs `wei_per_unit` wei (10^12 by default, 1 μETH)
//! - one whole token unit is `10^decimals` subunits on the ledger

use crate::core::error::TokenError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Wei in one ether
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Wei in one μETH, the default exchange rate
pub const WEI_PER_MICRO_ETH: u128 = 1_000_000_000_000;

/// Decimal places of ether amounts
pub const ETHER_DECIMALS: u8 = 18;

/// Default decimal places of the token
pub const DEFAULT_DECIMALS: u8 = 18;

// =============================================================================
// Decimal strings
// =============================================================================

/// Errors when parsing a decimal amount string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Empty amount")]
    Empty,
    #[error("Invalid character in amount: {0:?}")]
    InvalidCharacter(char),
    #[error("Too many decimal places: at most {0} allowed")]
    TooManyDecimals(u8),
    #[error("Amount is too large")]
    Overflow,
}

/// `10^exp`, or `None` if it does not fit in `u128`
pub fn pow10(exp: u8) -> Option<u128> {
    10u128.checked_pow(exp as u32)
}

/// Parse a decimal string such as `"0.0001"` into an integer scaled by
/// `10^decimals`. No floating point is involved.
pub fn parse_units(text: &str, decimals: u8) -> Result<u128, UnitsError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitsError::Empty);
    }
    if let Some(c) = whole.chars().chain(fraction.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(UnitsError::InvalidCharacter(c));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals(decimals));
    }

    let scale = pow10(decimals).ok_or(UnitsError::Overflow)?;
    let mut value: u128 = 0;
    for c in whole.chars() {
        let digit = c.to_digit(10).unwrap_or(0) as u128;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or(UnitsError::Overflow)?;
    }
    value = value.checked_mul(scale).ok_or(UnitsError::Overflow)?;

    let mut fraction_value: u128 = 0;
    for c in fraction.chars() {
        fraction_value = fraction_value * 10 + c.to_digit(10).unwrap_or(0) as u128;
    }
    let padding = pow10(decimals - fraction.len() as u8).ok_or(UnitsError::Overflow)?;
    value
        .checked_add(fraction_value * padding)
        .ok_or(UnitsError::Overflow)
}

/// Render an integer scaled by `10^decimals` as a decimal string,
/// trimming trailing fractional zeros
pub fn format_units(value: u128, decimals: u8) -> String {
    let Some(scale) = pow10(decimals) else {
        return value.to_string();
    };
    let whole = value / scale;
    let fraction = value % scale;
    if fraction == 0 {
        return whole.to_string();
    }

    let digits = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

// =============================================================================
// Unit Converter
// =============================================================================

/// Result of converting a deposit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositQuote {
    /// Whole token units bought
    pub units: u128,
    /// Subunits to mint (`units * 10^decimals`)
    pub minted: u128,
    /// Wei kept in custody (`units * wei_per_unit`)
    pub cost: u128,
    /// Wei returned to the depositor, always below `wei_per_unit`
    pub refund: u128,
}

/// Fixed-rate converter between wei and token subunits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConverter {
    wei_per_unit: u128,
    decimals: u8,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new(WEI_PER_MICRO_ETH, DEFAULT_DECIMALS)
    }
}

impl UnitConverter {
    pub const fn new(wei_per_unit: u128, decimals: u8) -> Self {
        Self {
            wei_per_unit,
            decimals,
        }
    }

    /// Wei per whole token unit
    pub fn exchange_rate(&self) -> u128 {
        self.wei_per_unit
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Subunits per whole token unit
    pub fn scale(&self) -> Result<u128, TokenError> {
        pow10(self.decimals).ok_or(TokenError::ArithmeticOverflow)
    }

    /// Reduced ratio `(subunits, wei)` such that `subunits` subunits are
    /// worth exactly `wei` wei
    fn ratio(&self) -> Result<(u128, u128), TokenError> {
        if self.wei_per_unit == 0 {
            return Err(TokenError::ArithmeticOverflow);
        }
        let scale = self.scale()?;
        let g = gcd(scale, self.wei_per_unit);
        Ok((scale / g, self.wei_per_unit / g))
    }

    /// Smallest subunit amount that redeems for a whole number of wei
    pub fn withdraw_step(&self) -> Result<u128, TokenError> {
        Ok(self.ratio()?.0)
    }

    /// Split a native deposit into minted subunits and a refund
    pub fn deposit_amount(&self, native_value: u128) -> Result<DepositQuote, TokenError> {
        let units = native_value
            .checked_div(self.wei_per_unit)
            .ok_or(TokenError::ArithmeticOverflow)?;
        if units == 0 {
            return Err(TokenError::BelowMinimum {
                amount: native_value,
                minimum: self.wei_per_unit,
            });
        }

        let minted = units
            .checked_mul(self.scale()?)
            .ok_or(TokenError::ArithmeticOverflow)?;
        let cost = units
            .checked_mul(self.wei_per_unit)
            .ok_or(TokenError::ArithmeticOverflow)?;
        let refund = native_value
            .checked_sub(cost)
            .ok_or(TokenError::ArithmeticOverflow)?;

        Ok(DepositQuote {
            units,
            minted,
            cost,
            refund,
        })
    }

    /// Wei paid out for redeeming `subunits`
    pub fn withdraw_amount(&self, subunits: u128) -> Result<u128, TokenError> {
        if subunits == 0 {
            return Err(TokenError::BelowMinimum {
                amount: 0,
                minimum: self.withdraw_step()?,
            });
        }
        self.native_value(subunits)
    }

    /// Exact wei value of `subunits`. Zero is allowed.
    pub fn native_value(&self, subunits: u128) -> Result<u128, TokenError> {
        let (step, wei_per_step) = self.ratio()?;
        if subunits % step != 0 {
            return Err(TokenError::InexactAmount {
                amount: subunits,
                step,
            });
        }
        (subunits / step)
            .checked_mul(wei_per_step)
            .ok_or(TokenError::ArithmeticOverflow)
    }
}
