//! # Wallet Ledger
//!
//! Two related ledgers kept in a host-supplied, versioned key-value world
//! state: an account ledger of wallets and an audit ledger of immutable
//! transaction records, plus the transfer protocol that links them.
//!
//! ## Features
//!
//! - **Account ledger**: Wallet CRUD, existence checks and full listing
//! - **Audit ledger**: Create-once transaction records, reachable by name through a chaincode interface
//! - **Transfers**: Reads both wallets, computes balances and records the transfer across the component boundary
//! - **Reconciliation**: Arithmetic and history checks over the audit trail
//! - **Storage abstraction**: Host-agnostic design with trait-based world state and invocation
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use wallet_ledger::utils::{LocalInvoker, MemoryWorldState};
//! use wallet_ledger::{TransactionContract, TransferCoordinator};
//!
//! let invoker = LocalInvoker::new();
//! invoker
//!     .register(
//!         "transactions",
//!         "mychannel",
//!         Arc::new(TransactionContract::new(MemoryWorldState::new())),
//!     )
//!     .unwrap();
//! let coordinator = TransferCoordinator::new(MemoryWorldState::new(), invoker);
//! // coordinator.distribute("A", "B", "100", "T1", "2022.10.27 13:37:25").await
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use reconciliation::{ReconciliationEngine, ReconciliationReport};
pub use traits::*;
pub use types::*;
