//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface. Token amounts are
//! typed as whole-μETH decimals (`"1.5"`), native amounts as ether decimals
//! (`"0.0001"`).

use crate::core::{format_units, parse_units, Address, ETHER_DECIMALS};
use crate::storage::{Storage, StorageConfig};
use crate::token::{MicroEth, TokenConfig, TokenEvent};
use std::path::Path;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub token: MicroEth,
    pub storage: Storage,
}

impl AppState {
    /// Load the ledger from the data directory
    pub fn new(data_dir: &Path) -> CliResult<Self> {
        let storage = open_storage(data_dir)?;

        let token = if storage.exists() {
            storage.load()?
        } else {
            println!("🆕 No ledger found, creating one with default settings...");
            let token = MicroEth::default();
            storage.save(&token)?;
            token
        };

        Ok(Self { token, storage })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.token)?;
        Ok(())
    }

    fn token_amount(&self, text: &str) -> CliResult<u128> {
        Ok(parse_units(text, self.token.decimals())?)
    }

    fn show_tokens(&self, subunits: u128) -> String {
        format!(
            "{} {}",
            format_units(subunits, self.token.decimals()),
            self.token.symbol()
        )
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

fn parse_address(text: &str) -> CliResult<Address> {
    Ok(text.parse::<Address>()?)
}

fn show_ether(wei: u128) -> String {
    format!("{} ETH", format_units(wei, ETHER_DECIMALS))
}

/// Initialize a new ledger
pub fn cmd_init(data_dir: &Path, config: TokenConfig) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() {
        println!("⚠️  Ledger already exists at {:?}", data_dir);
        return Ok(());
    }

    let token = MicroEth::new(config)?;
    storage.save(&token)?;

    println!("✅ Ledger initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🪙 Token: {} ({})", token.name(), token.symbol());
    println!("   🔢 Decimals: {}", token.decimals());
    println!(
        "   💱 Rate: 1 {} = {}",
        token.symbol(),
        show_ether(token.exchange_rate())
    );

    Ok(())
}

/// Deposit ether and mint tokens
pub fn cmd_deposit(state: &mut AppState, from: &str, ether: &str) -> CliResult<()> {
    let caller = parse_address(from)?;
    let value = parse_units(ether, ETHER_DECIMALS)?;

    let receipt = state.token.deposit(&caller, value)?;
    state.save()?;

    println!("📥 Deposit accepted (event #{})", receipt.sequence);
    println!("   ├─ Holder: {}", caller);
    println!("   ├─ Minted: {}", state.show_tokens(receipt.minted));
    println!("   ├─ Custodied: {}", show_ether(receipt.cost));
    println!("   └─ Refund: {}", show_ether(receipt.refund));

    Ok(())
}

/// Plain payment without an operation, treated as a deposit
pub fn cmd_pay(state: &mut AppState, from: &str, ether: &str) -> CliResult<()> {
    let caller = parse_address(from)?;
    let value = parse_units(ether, ETHER_DECIMALS)?;

    let receipt = state.token.receive(&caller, value)?;
    state.save()?;

    println!("📥 Payment received (event #{})", receipt.sequence);
    println!("   ├─ Minted: {}", state.show_tokens(receipt.minted));
    println!("   └─ Refund: {}", show_ether(receipt.refund));

    Ok(())
}

/// Burn tokens and release ether
pub fn cmd_withdraw(state: &mut AppState, from: &str, amount: &str) -> CliResult<()> {
    let caller = parse_address(from)?;
    let amount = state.token_amount(amount)?;

    let receipt = state.token.withdraw(&caller, amount)?;
    state.save()?;

    println!("📤 Withdrawal complete (event #{})", receipt.sequence);
    println!("   ├─ Burned: {}", state.show_tokens(receipt.burned));
    println!("   └─ Paid out: {}", show_ether(receipt.paid));

    Ok(())
}

/// Transfer tokens
pub fn cmd_transfer(state: &mut AppState, from: &str, to: &str, amount: &str) -> CliResult<()> {
    let caller = parse_address(from)?;
    let recipient = parse_address(to)?;
    let amount = state.token_amount(amount)?;

    let sequence = state.token.transfer(&caller, &recipient, amount)?;
    state.save()?;

    println!("💸 Transfer complete (event #{})", sequence);
    println!("   {} -> {}: {}", caller, recipient, state.show_tokens(amount));

    Ok(())
}

/// Set an allowance
pub fn cmd_approve(
    state: &mut AppState,
    owner: &str,
    spender: &str,
    amount: &str,
) -> CliResult<()> {
    let owner = parse_address(owner)?;
    let spender = parse_address(spender)?;
    let amount = state.token_amount(amount)?;

    let sequence = state.token.approve(&owner, &spender, amount)?;
    state.save()?;

    println!("✅ Approval set (event #{})", sequence);
    println!(
        "   {} may spend {} of {}",
        spender,
        state.show_tokens(amount),
        owner
    );

    Ok(())
}

/// Transfer tokens on behalf of an owner
pub fn cmd_transfer_from(
    state: &mut AppState,
    spender: &str,
    from: &str,
    to: &str,
    amount: &str,
) -> CliResult<()> {
    let spender = parse_address(spender)?;
    let owner = parse_address(from)?;
    let recipient = parse_address(to)?;
    let amount = state.token_amount(amount)?;

    let sequence = state
        .token
        .transfer_from(&spender, &owner, &recipient, amount)?;
    state.save()?;

    println!("💸 Delegated transfer complete (event #{})", sequence);
    println!("   {} -> {}: {}", owner, recipient, state.show_tokens(amount));
    println!(
        "   Remaining allowance: {}",
        state.show_tokens(state.token.allowance(&owner, &spender))
    );

    Ok(())
}

/// Show a holder's balance
pub fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let holder = parse_address(address)?;
    let balance = state.token.balance_of(&holder);

    println!("💰 Balance for {}", holder);
    println!("   {}", state.show_tokens(balance));

    let recent: Vec<_> = state.token.events().for_holder(&holder).collect();
    if !recent.is_empty() {
        println!("\n   Recent activity:");
        for record in recent.iter().rev().take(5) {
            println!("   └─ #{} {}", record.sequence, describe(state, &record.event));
        }
    }

    Ok(())
}

/// Show an allowance
pub fn cmd_allowance(state: &AppState, owner: &str, spender: &str) -> CliResult<()> {
    let owner = parse_address(owner)?;
    let spender = parse_address(spender)?;

    println!("🔓 Allowance of {} over {}", spender, owner);
    println!(
        "   {}",
        state.show_tokens(state.token.allowance(&owner, &spender))
    );

    Ok(())
}

/// Display token info
pub fn cmd_info(state: &AppState) -> CliResult<()> {
    let token = &state.token;

    println!("🪙 {} ({})", token.name(), token.symbol());
    println!("   ├─ Decimals: {}", token.decimals());
    println!(
        "   ├─ Rate: 1 {} = {}",
        token.symbol(),
        show_ether(token.exchange_rate())
    );
    let step = token.converter().withdraw_step()?;
    println!("   ├─ Withdraw step: {}", state.show_tokens(step));
    println!("   ├─ Total supply: {}", state.show_tokens(token.total_supply()));
    println!("   ├─ Reserve: {}", show_ether(token.reserve()));
    println!("   ├─ Holders: {}", token.holders().len());
    println!("   ├─ Events: {}", token.events().len());
    println!("   └─ Data directory: {:?}", state.storage.data_dir());

    Ok(())
}

/// List recent events
pub fn cmd_events(state: &AppState, count: usize) -> CliResult<()> {
    let records = state.token.events().latest(count);

    if records.is_empty() {
        println!("📭 No events yet.");
        return Ok(());
    }

    println!("📜 Recent events:");
    for record in records.iter().rev() {
        println!(
            "   #{} | {} | {}",
            record.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            describe(state, &record.event)
        );
    }

    Ok(())
}

/// Check conservation and backing
pub fn cmd_audit(state: &AppState) -> CliResult<()> {
    println!("🔍 Auditing ledger...");
    let report = state.token.audit();

    println!("   ├─ Total supply: {}", state.show_tokens(report.total_supply));
    println!("   ├─ Reserve: {}", show_ether(report.reserve));
    println!("   ├─ Holders: {}", report.holder_count);
    println!("   └─ Events: {}", report.event_count);

    if report.is_healthy() {
        println!("✅ Supply equals the sum of balances and is fully backed.");
    } else {
        println!("❌ Audit FAILED!");
        println!("   Conserved: {}", report.conserved());
        println!("   Backed: {}", report.backed());
    }

    Ok(())
}

/// Export ledger to file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.token, path)?;
    println!("📦 Ledger exported to {:?}", path);
    Ok(())
}

/// Import ledger from file
pub fn cmd_import(state: &mut AppState, path: &Path) -> CliResult<()> {
    // Loading audits the imported state
    state.token = crate::storage::load_from_file(path)?;
    state.save()?;

    println!("📥 Ledger imported from {:?}", path);
    println!("   Events: {}", state.token.events().len());

    Ok(())
}

/// List saved backups, newest first
pub fn cmd_backups(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();

    if backups.is_empty() {
        println!("📭 No backups in {:?}", state.storage.data_dir());
        return Ok(());
    }

    println!("🗄️  Backups in {:?}:", state.storage.data_dir());
    for index in backups {
        match state.storage.restore_backup(index) {
            Ok(token) => println!(
                "   [{}] {} events, supply {}",
                index,
                token.events().len(),
                state.show_tokens(token.total_supply())
            ),
            Err(e) => println!("   [{}] unusable: {}", index, e),
        }
    }

    Ok(())
}

/// Replace the ledger with a saved backup
pub fn cmd_restore(state: &mut AppState, index: usize) -> CliResult<()> {
    // Loading audits the backup
    state.token = state.storage.restore_backup(index)?;
    state.save()?;

    println!("♻️  Ledger restored from backup {}", index);
    println!("   Events: {}", state.token.events().len());

    Ok(())
}

fn describe(state: &AppState, event: &TokenEvent) -> String {
    match event {
        TokenEvent::Transfer { from, to, amount } if from.is_null() => {
            format!("mint {} to {}", state.show_tokens(*amount), to)
        }
        TokenEvent::Transfer { from, to, amount } if to.is_null() => {
            format!("burn {} from {}", state.show_tokens(*amount), from)
        }
        TokenEvent::Transfer { from, to, amount } => {
            format!("transfer {} {} -> {}", state.show_tokens(*amount), from, to)
        }
        TokenEvent::Approval {
            owner,
            spender,
            amount,
        } => format!("approve {} {} -> {}", state.show_tokens(*amount), owner, spender),
    }
}
