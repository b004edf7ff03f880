//! microETH CLI Application
//!
//! A command-line interface for the ether-backed token ledger.

use clap::{Parser, Subcommand};
use microeth::api::{self, ApiState};
use microeth::cli::{self, AppState};
use microeth::core::{DEFAULT_DECIMALS, WEI_PER_MICRO_ETH};
use microeth::storage::{Storage, StorageConfig};
use microeth::token::{MicroEth, TokenConfig, DEFAULT_NAME, DEFAULT_SYMBOL};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "microeth")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "An ether-backed fungible token ledger", long_about = None)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, default_value = ".microeth_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init {
        /// Token name
        #[arg(long, default_value = DEFAULT_NAME)]
        name: String,

        /// Token symbol
        #[arg(long, default_value = DEFAULT_SYMBOL)]
        symbol: String,

        /// Decimal places of the subunit representation
        #[arg(long, default_value_t = DEFAULT_DECIMALS)]
        decimals: u8,

        /// Wei per whole token
        #[arg(long, default_value_t = WEI_PER_MICRO_ETH)]
        wei_per_unit: u128,
    },

    /// Deposit ether and mint tokens
    Deposit {
        /// Depositor's address
        #[arg(short, long)]
        from: String,

        /// Ether attached, e.g. "0.5"
        #[arg(short, long)]
        ether: String,
    },

    /// Send ether without an operation (minted like a deposit)
    Pay {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        ether: String,
    },

    /// Burn tokens and release their ether
    Withdraw {
        #[arg(short, long)]
        from: String,

        /// Token amount, e.g. "2.5"
        #[arg(short, long)]
        amount: String,
    },

    /// Transfer tokens to an address
    Transfer {
        /// Sender's address
        #[arg(short, long)]
        from: String,

        /// Recipient's address
        #[arg(short, long)]
        to: String,

        /// Token amount
        #[arg(short, long)]
        amount: String,
    },

    /// Allow a spender to move the owner's tokens
    Approve {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        spender: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Transfer tokens on behalf of an owner
    TransferFrom {
        #[arg(short, long)]
        spender: String,

        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Show the balance of an address
    Balance {
        #[arg(short, long)]
        address: String,
    },

    /// Show the remaining allowance of a spender
    Allowance {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        spender: String,
    },

    /// Display token information
    Info,

    /// Show the most recent events
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Check conservation and backing
    Audit,

    /// Export the ledger to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import the ledger from a file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List saved backups
    Backups,

    /// Replace the ledger with a saved backup
    Restore {
        /// Backup index, 0 is the newest
        #[arg(short, long, default_value = "0")]
        backup: usize,
    },

    /// REST API operations
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init command separately (doesn't need full state)
    if let Commands::Init {
        name,
        symbol,
        decimals,
        wei_per_unit,
    } = &cli.command
    {
        let config = TokenConfig {
            name: name.clone(),
            symbol: symbol.clone(),
            decimals: *decimals,
            wei_per_unit: *wei_per_unit,
        };
        return cli::cmd_init(&cli.data_dir, config);
    }

    // Handle API commands with tokio runtime
    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    // Initialize application state
    let mut state = AppState::new(&cli.data_dir)?;

    // Process commands
    match cli.command {
        Commands::Init { .. } => unreachable!(),
        Commands::Api { .. } => unreachable!(),

        Commands::Deposit { from, ether } => {
            cli::cmd_deposit(&mut state, &from, &ether)?;
        }

        Commands::Pay { from, ether } => {
            cli::cmd_pay(&mut state, &from, &ether)?;
        }

        Commands::Withdraw { from, amount } => {
            cli::cmd_withdraw(&mut state, &from, &amount)?;
        }

        Commands::Transfer { from, to, amount } => {
            cli::cmd_transfer(&mut state, &from, &to, &amount)?;
        }

        Commands::Approve {
            owner,
            spender,
            amount,
        } => {
            cli::cmd_approve(&mut state, &owner, &spender, &amount)?;
        }

        Commands::TransferFrom {
            spender,
            from,
            to,
            amount,
        } => {
            cli::cmd_transfer_from(&mut state, &spender, &from, &to, &amount)?;
        }

        Commands::Balance { address } => {
            cli::cmd_balance(&state, &address)?;
        }

        Commands::Allowance { owner, spender } => {
            cli::cmd_allowance(&state, &owner, &spender)?;
        }

        Commands::Info => {
            cli::cmd_info(&state)?;
        }

        Commands::Events { count } => {
            cli::cmd_events(&state, count)?;
        }

        Commands::Audit => {
            cli::cmd_audit(&state)?;
        }

        Commands::Export { output } => {
            cli::cmd_export(&state, &output)?;
        }

        Commands::Import { input } => {
            cli::cmd_import(&mut state, &input)?;
        }

        Commands::Backups => {
            cli::cmd_backups(&state)?;
        }

        Commands::Restore { backup } => {
            cli::cmd_restore(&mut state, backup)?;
        }
    }

    Ok(())
}

fn run_api_command(
    action: &ApiCommands,
    data_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                // Initialize storage
                let storage_config = StorageConfig {
                    data_dir: data_dir.to_path_buf(),
                    ..Default::default()
                };
                let storage = Arc::new(Storage::new(storage_config)?);

                // Load or create ledger
                let token = if storage.exists() {
                    println!("📂 Loading existing ledger...");
                    storage.load()?
                } else {
                    println!("📂 Creating new ledger...");
                    let token = MicroEth::default();
                    storage.save(&token)?;
                    token
                };

                println!(
                    "🪙 {} ({}): supply {}, {} events",
                    token.name(),
                    token.symbol(),
                    token.total_supply(),
                    token.events().len()
                );

                let state = ApiState {
                    token: Arc::new(RwLock::new(token)),
                    storage,
                };

                println!("🌐 API server on http://localhost:{}", port);
                api::serve(state, *port).await?;
                Ok::<(), Box<dyn std::error::Error>>(())
            }
        }
    })
}
