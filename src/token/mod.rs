//! Fully backed μETH token
//!
//! Native currency in, ERC-20 style token out:
//! - Deposits mint subunits at a fixed exchange rate and refund the remainder
//! - Withdrawals burn subunits and release their exact native value
//! - Transfers, approvals and delegated transfers between holders
//! - An append-only log of `Transfer` and `Approval` events
//!
//! # Example
//!
//! ```rust
//! use microeth::core::{Address, WEI_PER_MICRO_ETH};
//! use microeth::token::MicroEth;
//!
//! let mut token = MicroEth::default();
//! let alice = Address::new([1u8; 20]);
//! let bob = Address::new([2u8; 20]);
//!
//! // 1.5 μETH worth of wei buys one μETH, the rest is refunded
//! let receipt = token.deposit(&alice, WEI_PER_MICRO_ETH * 3 / 2).unwrap();
//! assert_eq!(receipt.refund, WEI_PER_MICRO_ETH / 2);
//!
//! token.transfer(&alice, &bob, receipt.minted / 2).unwrap();
//! assert_eq!(token.balance_of(&bob), receipt.minted / 2);
//! assert!(token.audit().is_healthy());
//! ```

pub mod config;
pub mod events;
pub mod token;

pub use config::{ConfigError, TokenConfig, TokenMetadata, DEFAULT_NAME, DEFAULT_SYMBOL};
pub use events::{EventLog, EventRecord, TokenEvent};
pub use token::{AuditReport, DepositReceipt, MicroEth, WithdrawReceipt};
