//! Balance and allowance bookkeeping
//!
//! The ledger owns the balance table, the allowance table and the total
//! supply. Every mutating operation validates and computes all new values
//! before writing anything, so a failed call leaves the ledger untouched.
//!
//! Invariant: the sum of all balances equals the total supply.

use crate::core::address::Address;
use crate::core::error::TokenError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Authoritative balances, allowances and supply of the token
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    /// Balances: holder -> subunits
    balances: HashMap<Address, u128>,
    /// Allowances: owner -> (spender -> subunits)
    allowances: HashMap<Address, HashMap<Address, u128>>,
    total_supply: u128,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn allowance_of(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Holders with a non-zero balance, sorted by address
    pub fn holders(&self) -> Vec<(Address, u128)> {
        let mut holders: Vec<(Address, u128)> = self
            .balances
            .iter()
            .filter(|(_, &b)| b > 0)
            .map(|(a, &b)| (*a, b))
            .collect();
        holders.sort();
        holders
    }

    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|&&b| b > 0).count()
    }

    /// Sum of all balances, or `None` if it does not fit
    pub fn balance_sum(&self) -> Option<u128> {
        self.balances
            .values()
            .try_fold(0u128, |acc, &b| acc.checked_add(b))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create `amount` subunits in `holder`'s balance
    pub fn mint(&mut self, holder: &Address, amount: u128) -> Result<(), TokenError> {
        if amount == 0 {
            return Err(TokenError::BelowMinimum {
                amount,
                minimum: 1,
            });
        }
        if holder.is_null() {
            return Err(TokenError::InvalidRecipient);
        }

        let new_balance = self
            .balance_of(holder)
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.balances.insert(*holder, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Destroy `amount` subunits from `holder`'s balance
    pub fn burn(&mut self, holder: &Address, amount: u128) -> Result<(), TokenError> {
        let balance = self.balance_of(holder);
        if amount == 0 || amount > balance {
            return Err(TokenError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }

        // The supply is at least any single balance
        let new_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.balances.insert(*holder, balance - amount);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Move `amount` subunits from `from` to `to`
    pub fn move_balance(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        if to.is_null() {
            return Err(TokenError::InvalidRecipient);
        }
        // Null only ever appears as the source of a mint
        if from.is_null() {
            return Err(TokenError::InvalidSender);
        }

        let from_balance = self.balance_of(from);
        if amount > from_balance {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);
        Ok(())
    }

    /// Overwrite the allowance of `spender` over `owner`'s balance
    pub fn set_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) {
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
    }

    /// Check that `spender` may still move `amount` out of `owner`'s balance
    pub fn check_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let current = self.allowance_of(owner, spender);
        if amount > current {
            return Err(TokenError::InsufficientAllowance {
                have: current,
                need: amount,
            });
        }
        Ok(())
    }

    /// Reduce the allowance of `spender` over `owner`'s balance
    pub fn spend_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.check_allowance(owner, spender, amount)?;
        let current = self.allowance_of(owner, spender);
        self.set_allowance(owner, spender, current - amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn funded_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.mint(&holder(1), 1_000).unwrap();
        ledger
    }

    fn assert_conserved(ledger: &Ledger) {
        assert_eq!(ledger.balance_sum(), Some(ledger.total_supply()));
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new();
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(ledger.balance_of(&holder(1)), 0);
        assert_eq!(ledger.allowance_of(&holder(1), &holder(2)), 0);
        assert_eq!(ledger.holder_count(), 0);
        assert_conserved(&ledger);
    }

    #[test]
    fn test_mint() {
        let mut ledger = funded_ledger();
        ledger.mint(&holder(1), 500).unwrap();
        ledger.mint(&holder(2), 250).unwrap();

        assert_eq!(ledger.balance_of(&holder(1)), 1_500);
        assert_eq!(ledger.balance_of(&holder(2)), 250);
        assert_eq!(ledger.total_supply(), 1_750);
        assert_eq!(ledger.holders(), vec![(holder(1), 1_500), (holder(2), 250)]);
        assert_conserved(&ledger);
    }

    #[test]
    fn test_mint_rejects_zero_and_null() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.mint(&holder(1), 0),
            Err(TokenError::BelowMinimum { .. })
        ));
        assert_eq!(
            ledger.mint(&Address::NULL, 10),
            Err(TokenError::InvalidRecipient)
        );
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_mint_overflow_leaves_state() {
        let mut ledger = Ledger::new();
        ledger.mint(&holder(1), u128::MAX).unwrap();

        assert_eq!(ledger.mint(&holder(2), 1), Err(TokenError::ArithmeticOverflow));
        assert_eq!(ledger.balance_of(&holder(2)), 0);
        assert_eq!(ledger.total_supply(), u128::MAX);
    }

    #[test]
    fn test_burn() {
        let mut ledger = funded_ledger();
        ledger.burn(&holder(1), 400).unwrap();

        assert_eq!(ledger.balance_of(&holder(1)), 600);
        assert_eq!(ledger.total_supply(), 600);
        assert_conserved(&ledger);

        // Burning everything leaves a zero balance, indistinguishable from absence
        ledger.burn(&holder(1), 600).unwrap();
        assert_eq!(ledger.holder_count(), 0);
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let mut ledger = funded_ledger();

        assert_eq!(
            ledger.burn(&holder(1), 1_001),
            Err(TokenError::InsufficientBalance {
                have: 1_000,
                need: 1_001
            })
        );
        assert!(matches!(
            ledger.burn(&holder(1), 0),
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of(&holder(1)), 1_000);
        assert_eq!(ledger.total_supply(), 1_000);
    }

    #[test]
    fn test_move_balance() {
        let mut ledger = funded_ledger();
        ledger.move_balance(&holder(1), &holder(2), 300).unwrap();

        assert_eq!(ledger.balance_of(&holder(1)), 700);
        assert_eq!(ledger.balance_of(&holder(2)), 300);
        assert_eq!(ledger.total_supply(), 1_000);
        assert_conserved(&ledger);
    }

    #[test]
    fn test_move_to_null_rejected() {
        let mut ledger = funded_ledger();
        assert_eq!(
            ledger.move_balance(&holder(1), &Address::NULL, 10),
            Err(TokenError::InvalidRecipient)
        );
        assert_eq!(ledger.balance_of(&holder(1)), 1_000);
    }

    #[test]
    fn test_move_from_null_rejected() {
        let mut ledger = funded_ledger();

        // Even a zero amount would look like a mint
        assert_eq!(
            ledger.move_balance(&Address::NULL, &holder(2), 0),
            Err(TokenError::InvalidSender)
        );
        assert_eq!(ledger.balance_of(&holder(2)), 0);
        assert_conserved(&ledger);
    }

    #[test]
    fn test_move_insufficient_balance() {
        let mut ledger = funded_ledger();
        assert!(matches!(
            ledger.move_balance(&holder(2), &holder(1), 1),
            Err(TokenError::InsufficientBalance { have: 0, need: 1 })
        ));
        assert_conserved(&ledger);
    }

    #[test]
    fn test_move_to_self() {
        let mut ledger = funded_ledger();

        ledger.move_balance(&holder(1), &holder(1), 1_000).unwrap();
        assert_eq!(ledger.balance_of(&holder(1)), 1_000);

        // Still validated against the balance
        assert!(matches!(
            ledger.move_balance(&holder(1), &holder(1), 1_001),
            Err(TokenError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_allowances() {
        let mut ledger = Ledger::new();
        let (owner, spender) = (holder(1), holder(2));

        ledger.set_allowance(&owner, &spender, 50);
        assert_eq!(ledger.allowance_of(&owner, &spender), 50);
        // Direction matters
        assert_eq!(ledger.allowance_of(&spender, &owner), 0);

        ledger.spend_allowance(&owner, &spender, 20).unwrap();
        assert_eq!(ledger.allowance_of(&owner, &spender), 30);

        assert_eq!(
            ledger.spend_allowance(&owner, &spender, 31),
            Err(TokenError::InsufficientAllowance { have: 30, need: 31 })
        );
        assert_eq!(ledger.allowance_of(&owner, &spender), 30);

        // Overwrite, not add
        ledger.set_allowance(&owner, &spender, 5);
        assert_eq!(ledger.allowance_of(&owner, &spender), 5);
    }
}
