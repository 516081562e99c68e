//! Ledger module containing the account ledger, the audit ledger and the
//! transfer coordinator that links them

pub mod core;
pub mod transaction;
pub mod wallet;

pub use self::core::{TransferCoordinator, TransferReceipt, TransferState, COMMITTED_STATE};
pub use transaction::{CreateTransactionParams, TransactionContract};
pub use wallet::*;
