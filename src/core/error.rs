//! Ledger error taxonomy
//!
//! Every variant rejects the whole operation. Nothing is partially applied.

use thiserror::Error;

/// Errors returned by the ledger and the token operations built on it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Below minimum: {amount} is less than the minimum of {minimum}")]
    BelowMinimum { amount: u128, minimum: u128 },
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: u128, need: u128 },
    #[error("Invalid recipient: cannot send to the null address")]
    InvalidRecipient,
    #[error("Invalid sender: the null address cannot send or approve")]
    InvalidSender,
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    #[error("Inexact amount: {amount} is not a multiple of {step}")]
    InexactAmount { amount: u128, step: u128 },
}

impl TokenError {
    /// Stable name of the error kind, for callers that match on it
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::BelowMinimum { .. } => "BelowMinimum",
            TokenError::InsufficientBalance { .. } => "InsufficientBalance",
            TokenError::InsufficientAllowance { .. } => "InsufficientAllowance",
            TokenError::InvalidRecipient => "InvalidRecipient",
            TokenError::InvalidSender => "InvalidSender",
            TokenError::ArithmeticOverflow => "ArithmeticOverflow",
            TokenError::InexactAmount { .. } => "InexactAmount",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TokenError::InvalidRecipient.kind(), "InvalidRecipient");
        assert_eq!(TokenError::InvalidSender.kind(), "InvalidSender");
        assert_eq!(
            TokenError::InsufficientBalance { have: 1, need: 2 }.kind(),
            "InsufficientBalance"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = TokenError::InsufficientAllowance { have: 10, need: 11 };
        assert_eq!(err.to_string(), "Insufficient allowance: have 10, need 11");
    }
}
