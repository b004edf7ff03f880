//! Core ledger components
//!
//! This module contains:
//! - Holder addresses and the null address
//! - Unit conversion between wei and token subunits
//! - The balance/allowance ledger
//! - The error taxonomy shared by all operations

pub mod address;
pub mod error;
pub mod ledger;
pub mod units;

pub use address::{Address, AddressError, ADDRESS_LENGTH};
pub use error::TokenError;
pub use ledger::Ledger;
pub use units::{
    format_units, parse_units, DepositQuote, UnitConverter, UnitsError, DEFAULT_DECIMALS,
    ETHER_DECIMALS, WEI_PER_ETHER, WEI_PER_MICRO_ETH,
};
