//! The μETH token
//!
//! A fully backed ERC-20 style token. Native currency deposited through
//! [`MicroEth::deposit`] is converted at a fixed rate into token subunits;
//! [`MicroEth::withdraw`] burns subunits and pays the exact native value
//! back out. Transfers, approvals and delegated transfers follow the usual
//! fungible-token semantics.
//!
//! Each operation is a single transition: it either commits its ledger
//! mutation, reserve change and event together, or fails with no effect.
//! Callers sharing one instance across threads must serialize calls (the API
//! layer wraps it in a `RwLock`).

use crate::core::{Address, Ledger, TokenError, UnitConverter};
use crate::token::config::{ConfigError, TokenConfig, TokenMetadata};
use crate::token::events::{EventLog, TokenEvent};
use serde::{Deserialize, Serialize};

/// Outcome of a deposit. The refund must be returned to the depositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub holder: Address,
    /// Subunits minted
    pub minted: u128,
    /// Wei moved into custody
    pub cost: u128,
    /// Wei to hand back, always below the exchange rate
    pub refund: u128,
    /// Sequence number of the mint event
    pub sequence: u64,
}

/// Outcome of a withdrawal. `paid` wei are owed to the holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub holder: Address,
    /// Subunits burned
    pub burned: u128,
    /// Wei released from custody
    pub paid: u128,
    /// Sequence number of the burn event
    pub sequence: u64,
}

/// Result of checking the supply against balances and custody
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub total_supply: u128,
    /// Sum of all balances, `None` on overflow
    pub balance_sum: Option<u128>,
    /// Wei held in custody
    pub reserve: u128,
    /// Wei the supply is worth, `None` if not exactly representable
    pub expected_reserve: Option<u128>,
    pub holder_count: usize,
    pub event_count: usize,
}

impl AuditReport {
    /// Sum of balances equals the total supply
    pub fn conserved(&self) -> bool {
        self.balance_sum == Some(self.total_supply)
    }

    /// Custody holds exactly the value of the supply
    pub fn backed(&self) -> bool {
        self.expected_reserve == Some(self.reserve)
    }

    pub fn is_healthy(&self) -> bool {
        self.conserved() && self.backed()
    }
}

/// A fully backed fungible token over native currency
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MicroEth {
    config: TokenConfig,
    ledger: Ledger,
    /// Wei held in custody
    reserve: u128,
    events: EventLog,
}

impl Default for MicroEth {
    fn default() -> Self {
        Self {
            config: TokenConfig::default(),
            ledger: Ledger::new(),
            reserve: 0,
            events: EventLog::new(),
        }
    }
}

fn rejected<T>(
    operation: &str,
    caller: &Address,
    result: Result<T, TokenError>,
) -> Result<T, TokenError> {
    if let Err(e) = &result {
        log::warn!("{} by {} rejected: {}", operation, caller, e);
    }
    result
}

impl MicroEth {
    /// Create an empty token
    pub fn new(config: TokenConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.config.decimals
    }

    /// Wei per whole token unit
    pub fn exchange_rate(&self) -> u128 {
        self.config.wei_per_unit
    }

    pub fn metadata(&self) -> TokenMetadata {
        self.config.metadata()
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn converter(&self) -> UnitConverter {
        self.config.converter()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.ledger.balance_of(holder)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.ledger.allowance_of(owner, spender)
    }

    /// Wei held in custody
    pub fn reserve(&self) -> u128 {
        self.reserve
    }

    pub fn holders(&self) -> Vec<(Address, u128)> {
        self.ledger.holders()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Check conservation and backing of the current state
    pub fn audit(&self) -> AuditReport {
        let total_supply = self.ledger.total_supply();
        AuditReport {
            total_supply,
            balance_sum: self.ledger.balance_sum(),
            reserve: self.reserve,
            expected_reserve: self.converter().native_value(total_supply).ok(),
            holder_count: self.ledger.holder_count(),
            event_count: self.events.len(),
        }
    }

    // =========================================================================
    // Custody
    // =========================================================================

    /// Convert attached native currency into tokens for `caller`
    pub fn deposit(
        &mut self,
        caller: &Address,
        native_value: u128,
    ) -> Result<DepositReceipt, TokenError> {
        rejected("deposit", caller, self.apply_deposit(caller, native_value))
    }

    /// Selector-less payment. Behaves exactly like [`MicroEth::deposit`].
    pub fn receive(
        &mut self,
        caller: &Address,
        native_value: u128,
    ) -> Result<DepositReceipt, TokenError> {
        log::debug!("Plain payment of {} wei from {}", native_value, caller);
        rejected("receive", caller, self.apply_deposit(caller, native_value))
    }

    fn apply_deposit(
        &mut self,
        caller: &Address,
        native_value: u128,
    ) -> Result<DepositReceipt, TokenError> {
        let quote = self.converter().deposit_amount(native_value)?;
        let reserve = self
            .reserve
            .checked_add(quote.cost)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.ledger.mint(caller, quote.minted)?;
        self.reserve = reserve;
        let sequence = self.events.append(TokenEvent::Transfer {
            from: Address::NULL,
            to: *caller,
            amount: quote.minted,
        });

        log::info!(
            "Deposit: {} minted {} subunits for {} wei (refund {})",
            caller,
            quote.minted,
            quote.cost,
            quote.refund
        );

        Ok(DepositReceipt {
            holder: *caller,
            minted: quote.minted,
            cost: quote.cost,
            refund: quote.refund,
            sequence,
        })
    }

    /// Burn `amount` subunits of `caller` and release their native value
    pub fn withdraw(
        &mut self,
        caller: &Address,
        amount: u128,
    ) -> Result<WithdrawReceipt, TokenError> {
        rejected("withdraw", caller, self.apply_withdraw(caller, amount))
    }

    fn apply_withdraw(
        &mut self,
        caller: &Address,
        amount: u128,
    ) -> Result<WithdrawReceipt, TokenError> {
        let converter = self.converter();
        if amount == 0 {
            return Err(TokenError::BelowMinimum {
                amount,
                minimum: converter.withdraw_step()?,
            });
        }

        let balance = self.ledger.balance_of(caller);
        if amount > balance {
            return Err(TokenError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }

        let paid = converter.withdraw_amount(amount)?;
        let reserve = self
            .reserve
            .checked_sub(paid)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.ledger.burn(caller, amount)?;
        self.reserve = reserve;
        let sequence = self.events.append(TokenEvent::Transfer {
            from: *caller,
            to: Address::NULL,
            amount,
        });

        log::info!(
            "Withdraw: {} burned {} subunits for {} wei",
            caller,
            amount,
            paid
        );

        Ok(WithdrawReceipt {
            holder: *caller,
            burned: amount,
            paid,
            sequence,
        })
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Move `amount` subunits from `caller` to `to`
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<u64, TokenError> {
        rejected(
            "transfer",
            caller,
            self.ledger.move_balance(caller, to, amount),
        )?;

        log::debug!("Transfer: {} -> {} ({})", caller, to, amount);
        Ok(self.events.append(TokenEvent::Transfer {
            from: *caller,
            to: *to,
            amount,
        }))
    }

    /// Let `spender` move up to `amount` subunits of `caller`'s balance.
    /// Overwrites any previous allowance. The null address cannot approve.
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<u64, TokenError> {
        if caller.is_null() {
            return rejected("approve", caller, Err(TokenError::InvalidSender));
        }
        self.ledger.set_allowance(caller, spender, amount);

        log::debug!("Approval: {} allows {} ({})", caller, spender, amount);
        Ok(self.events.append(TokenEvent::Approval {
            owner: *caller,
            spender: *spender,
            amount,
        }))
    }

    /// Move `amount` subunits from `from` to `to` on behalf of `caller`.
    ///
    /// Checks the allowance first, then the parties and the balance.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<u64, TokenError> {
        rejected(
            "transferFrom",
            caller,
            self.apply_transfer_from(caller, from, to, amount),
        )
    }

    fn apply_transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<u64, TokenError> {
        self.ledger.check_allowance(from, caller, amount)?;
        self.ledger.move_balance(from, to, amount)?;
        // Checked above, cannot fail
        self.ledger.spend_allowance(from, caller, amount)?;

        log::debug!(
            "TransferFrom: {} moved {} -> {} ({})",
            caller,
            from,
            to,
            amount
        );
        Ok(self.events.append(TokenEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        }))
    }
}
