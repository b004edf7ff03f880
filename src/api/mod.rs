//! REST API module
//!
//! Provides HTTP access to the ledger. Amounts are decimal strings.
//!
//! # Endpoints
//!
//! ## Queries
//! - `GET /health` - Liveness check
//! - `GET /api/token` - Metadata, withdraw step, supply and reserve
//! - `GET /api/supply` - Total supply
//! - `GET /api/balances/{address}` - Balance of a holder
//! - `GET /api/allowance?owner=..&spender=..` - Remaining allowance
//! - `GET /api/events?since=..&limit=..` - Event log page
//! - `GET /api/events/{sequence}` - Single event
//! - `GET /api/audit` - Conservation and backing check
//!
//! ## Mutations
//! - `POST /api/deposit` - Mint tokens for attached wei
//! - `POST /api/receive` - Plain payment, same as deposit
//! - `POST /api/withdraw` - Burn tokens and release wei
//! - `POST /api/transfer` - Move tokens
//! - `POST /api/approve` - Set an allowance
//! - `POST /api/transferFrom` - Move tokens under an allowance
//!
//! Rejected operations answer `400` with `{"error": .., "kind": ..}`. A failed
//! save answers `500` with kind `StorageError` and leaves the ledger unchanged.

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::{create_router, serve};
