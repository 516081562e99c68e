//! Core types and data structures for the wallet and audit ledgers

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A wallet held by the account ledger
    Wallet,
    /// An audit record held by the audit ledger
    Transaction,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Wallet => write!(f, "wallet"),
            EntityKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// Account entity holding the authoritative balance of one wallet
///
/// The `transaction_*` fields describe the last transfer that touched the
/// wallet. They are advisory and never consulted when computing balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Wallet {
    /// Unique identifier, also the world-state key
    #[serde(rename = "walletID")]
    pub wallet_id: String,
    /// Owner of the wallet
    pub owner: String,
    /// Descriptive wallet category
    #[serde(rename = "walletType")]
    pub wallet_type: String,
    /// Current balance
    pub balance: BigDecimal,
    /// Amount of the last transfer applied to this wallet
    #[serde(rename = "transactionAmount")]
    pub transaction_amount: BigDecimal,
    /// State of the last transfer applied to this wallet
    #[serde(rename = "transactionState")]
    pub transaction_state: String,
    /// Caller-supplied date of the last transfer
    #[serde(rename = "transactionDate")]
    pub transaction_date: String,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
    #[serde(rename = "actionBy")]
    pub action_by: String,
    #[serde(rename = "orgMSP")]
    pub org_msp: String,
    #[serde(rename = "actionPerformed")]
    pub action_performed: String,
}

impl Wallet {
    /// Create a wallet with the given opening balance and empty metadata
    pub fn new(wallet_id: String, owner: String, wallet_type: String, balance: BigDecimal) -> Self {
        Self {
            wallet_id,
            owner,
            wallet_type,
            balance,
            transaction_amount: BigDecimal::from(0),
            transaction_state: String::new(),
            transaction_date: String::new(),
            last_modified: String::new(),
            action_by: String::new(),
            org_msp: String::new(),
            action_performed: String::new(),
        }
    }

    /// Encode to the stored JSON representation
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Encode {
            key: self.wallet_id.clone(),
            reason: e.to_string(),
        })
    }

    /// Decode a wallet stored under `key`
    pub fn from_bytes(key: &str, bytes: &[u8]) -> LedgerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Immutable audit entry describing one value transfer
///
/// All balance snapshots are computed by the caller. The ledger stores them
/// as given; `post = pre -/+ amount` holds only by protocol discipline and is
/// checked after the fact by [`crate::reconciliation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRecord {
    /// Caller-supplied unique identifier, also the world-state key
    #[serde(rename = "txnID")]
    pub txn_id: String,
    /// Sending wallet ID
    pub sender: String,
    /// Receiving wallet ID
    pub receiver: String,
    #[serde(rename = "transactionsAmount")]
    pub transaction_amount: BigDecimal,
    #[serde(rename = "senderPreBalance")]
    pub sender_pre_balance: BigDecimal,
    #[serde(rename = "receiverPreBalance")]
    pub receiver_pre_balance: BigDecimal,
    #[serde(rename = "senderPostBalance")]
    pub sender_post_balance: BigDecimal,
    #[serde(rename = "receiverPostBalance")]
    pub receiver_post_balance: BigDecimal,
    #[serde(rename = "transactionDate")]
    pub transaction_date: String,
    #[serde(rename = "actionBy")]
    pub action_by: String,
    #[serde(rename = "actionOrg")]
    pub action_org: String,
    #[serde(rename = "actionPerformed")]
    pub action_performed: String,
}

impl TransactionRecord {
    /// Encode to the stored JSON representation
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Encode {
            key: self.txn_id.clone(),
            reason: e.to_string(),
        })
    }

    /// Decode a record stored under `key`
    pub fn from_bytes(key: &str, bytes: &[u8]) -> LedgerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("the {kind} {id} does not exist")]
    NotFound { kind: EntityKind, id: String },
    #[error("the {kind} {id} already exists")]
    AlreadyExists { kind: EntityKind, id: String },
    #[error("malformed record under key {key}: {reason}")]
    Decode { key: String, reason: String },
    #[error("cannot encode record {key}: {reason}")]
    Encode { key: String, reason: String },
    #[error("invalid amount for {field}: {value:?}")]
    InvalidAmount { field: String, value: String },
    #[error("world state error: {0}")]
    Store(String),
    #[error("world state conflict: {0}")]
    Conflict(String),
    #[error("could not invoke chaincode: {payload}")]
    InvocationFailed { payload: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("transfer amount must not be negative")]
    NegativeAmount,
    #[error("insufficient funds in wallet {wallet}: balance {balance}, amount {amount}")]
    InsufficientFunds {
        wallet: String,
        balance: BigDecimal,
        amount: BigDecimal,
    },
    #[error("transaction {txn_id} was recorded but wallet balances were not updated: {reason}")]
    BalanceUpdateFailed { txn_id: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Whether the caller may resubmit the whole invocation
    ///
    /// Only version conflicts reported by the world state qualify. The ledger
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }

    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(kind: EntityKind, id: &str) -> Self {
        LedgerError::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
