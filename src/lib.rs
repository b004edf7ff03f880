//! microETH: an ether-backed fungible token ledger in Rust
//!
//! This crate provides a token whose supply is fully backed by native
//! currency held in custody, featuring:
//! - Deposits that mint tokens at a fixed exchange rate with exact refunds
//! - Withdrawals that burn tokens and release their exact native value
//! - ERC-20 style transfers, approvals and delegated transfers
//! - An append-only event log with sequence numbers
//! - Conservation and backing audits
//! - JSON persistence with backups, a CLI and a REST API
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
//! // Deposit 2 microETH worth of wei
//! let receipt = token.deposit(&alice, 2 * WEI_PER_MICRO_ETH).unwrap();
//! token.transfer(&alice, &bob, receipt.minted / 2).unwrap();
//!
//! assert_eq!(token.balance_of(&bob), receipt.minted / 2);
//! assert!(token.audit().is_healthy());
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Address, Ledger, TokenError, UnitConverter, WEI_PER_MICRO_ETH};
pub use storage::{Storage, StorageConfig, StorageError};
pub use token::{AuditReport, EventLog, MicroEth, TokenConfig, TokenEvent, TokenMetadata};
