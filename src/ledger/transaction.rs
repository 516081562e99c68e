//! Audit ledger: immutable transaction records

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::LedgerConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{parse_amount, validate_key};

/// Parameters for recording a transfer in the audit ledger
///
/// Amounts and balances arrive as text, exactly as they cross the
/// invocation boundary, and are parsed on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransactionParams {
    pub txn_id: String,
    pub sender: String,
    pub receiver: String,
    pub transaction_amount: String,
    pub sender_pre_balance: String,
    pub receiver_pre_balance: String,
    pub sender_post_balance: String,
    pub receiver_post_balance: String,
    pub transaction_date: String,
    pub action_performed: String,
}

impl CreateTransactionParams {
    /// Number of arguments `CreateTransaction` takes after the function name
    pub const ARITY: usize = 10;

    /// Encode as invocation arguments, function name first
    pub fn to_args(&self) -> Vec<Vec<u8>> {
        [
            functions::CREATE_TRANSACTION,
            self.txn_id.as_str(),
            self.sender.as_str(),
            self.receiver.as_str(),
            self.transaction_amount.as_str(),
            self.sender_pre_balance.as_str(),
            self.receiver_pre_balance.as_str(),
            self.sender_post_balance.as_str(),
            self.receiver_post_balance.as_str(),
            self.transaction_date.as_str(),
            self.action_performed.as_str(),
        ]
        .iter()
        .map(|arg| arg.as_bytes().to_vec())
        .collect()
    }

    /// Decode from invocation arguments, function name excluded
    pub fn from_args(args: &[Vec<u8>]) -> LedgerResult<Self> {
        let mut fields = string_args(functions::CREATE_TRANSACTION, args, Self::ARITY)?.into_iter();
        let mut next = || fields.next().unwrap_or_default();
        Ok(Self {
            txn_id: next(),
            sender: next(),
            receiver: next(),
            transaction_amount: next(),
            sender_pre_balance: next(),
            receiver_pre_balance: next(),
            sender_post_balance: next(),
            receiver_post_balance: next(),
            transaction_date: next(),
            action_performed: next(),
        })
    }
}

/// Function names the audit ledger answers to
pub mod functions {
    pub const INIT_LEDGER: &str = "InitLedger";
    pub const TRANSACTION_EXISTS: &str = "TransactionExists";
    pub const CREATE_TRANSACTION: &str = "CreateTransaction";
    pub const READ_TRANSACTION: &str = "ReadTransaction";
    pub const DELETE_TRANSACTION: &str = "DeleteTransaction";
    pub const GET_ALL_TRANSACTIONS: &str = "GetAllTransactions";
}

/// Audit ledger over its own world-state namespace
pub struct TransactionContract<S: WorldState> {
    state: S,
    config: LedgerConfig,
}

impl<S: WorldState> TransactionContract<S> {
    /// Create an audit ledger with the default configuration
    pub fn new(state: S) -> Self {
        Self::with_config(state, LedgerConfig::default())
    }

    pub fn with_config(state: S, config: LedgerConfig) -> Self {
        Self { state, config }
    }

    /// Seed two sample records
    ///
    /// A seed whose key is already present is left untouched, so reruns are
    /// idempotent and never clobber real data. Returns how many were written.
    pub async fn init_ledger(&self) -> LedgerResult<usize> {
        let mut written = 0;
        for record in seed_records(&self.config)? {
            if self.transaction_exists(&record.txn_id).await? {
                debug!(txn_id = %record.txn_id, "seed record already present");
                continue;
            }
            self.state
                .put_state(&record.txn_id, record.to_bytes()?)
                .await?;
            written += 1;
        }
        info!(written, "audit ledger initialised");
        Ok(written)
    }

    /// Whether a record is stored under `id`
    pub async fn transaction_exists(&self, id: &str) -> LedgerResult<bool> {
        Ok(self.state.get_state(id).await?.is_some())
    }

    /// Record a transfer
    ///
    /// Fails with `AlreadyExists` for a reused ID and `InvalidAmount` for any
    /// unparsable figure. The record is fully encoded before the single write.
    pub async fn create_transaction(
        &self,
        params: CreateTransactionParams,
    ) -> LedgerResult<TransactionRecord> {
        validate_key(EntityKind::Transaction, &params.txn_id)?;
        if self.transaction_exists(&params.txn_id).await? {
            return Err(LedgerError::already_exists(
                EntityKind::Transaction,
                &params.txn_id,
            ));
        }

        let record = TransactionRecord {
            transaction_amount: parse_amount("transactionAmount", &params.transaction_amount)?,
            sender_pre_balance: parse_amount("senderPreBalance", &params.sender_pre_balance)?,
            receiver_pre_balance: parse_amount("receiverPreBalance", &params.receiver_pre_balance)?,
            sender_post_balance: parse_amount("senderPostBalance", &params.sender_post_balance)?,
            receiver_post_balance: parse_amount(
                "receiverPostBalance",
                &params.receiver_post_balance,
            )?,
            txn_id: params.txn_id,
            sender: params.sender,
            receiver: params.receiver,
            transaction_date: params.transaction_date,
            action_by: self.config.action_by.clone(),
            action_org: self.config.action_org.clone(),
            action_performed: params.action_performed,
        };

        let bytes = record.to_bytes()?;
        self.state.put_state(&record.txn_id, bytes).await?;
        info!(
            txn_id = %record.txn_id,
            sender = %record.sender,
            receiver = %record.receiver,
            amount = %record.transaction_amount,
            "transaction recorded"
        );
        Ok(record)
    }

    /// Read the record stored under `id`
    pub async fn read_transaction(&self, id: &str) -> LedgerResult<TransactionRecord> {
        let bytes = self
            .state
            .get_state(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Transaction, id))?;
        TransactionRecord::from_bytes(id, &bytes)
    }

    /// Administrative removal of a record, independent of any transfer
    pub async fn delete_transaction(&self, id: &str) -> LedgerResult<()> {
        if !self.transaction_exists(id).await? {
            return Err(LedgerError::not_found(EntityKind::Transaction, id));
        }
        self.state.del_state(id).await?;
        info!(txn_id = %id, "transaction deleted");
        Ok(())
    }

    /// Every record in the namespace, in key order
    ///
    /// The first malformed entry fails the whole listing. The scan is
    /// released on every exit path when it goes out of scope.
    pub async fn list_all_transactions(&self) -> LedgerResult<Vec<TransactionRecord>> {
        let scan = self.state.get_state_by_range("", "").await?;
        let mut records = Vec::new();
        for entry in scan {
            let (key, bytes) = entry?;
            records.push(TransactionRecord::from_bytes(&key, &bytes)?);
        }
        debug!(count = records.len(), "listed transactions");
        Ok(records)
    }

    /// Underlying world state
    pub fn state(&self) -> &S {
        &self.state
    }
}

#[async_trait]
impl<S: WorldState> Chaincode for TransactionContract<S> {
    async fn invoke(&self, args: &[Vec<u8>]) -> Response {
        let Some((function, rest)) = args.split_first() else {
            return Response::error("missing function name");
        };
        let function = String::from_utf8_lossy(function).into_owned();
        debug!(function = %function, "audit ledger invoked");

        match function.as_str() {
            functions::INIT_LEDGER => match string_args(&function, rest, 0) {
                Ok(_) => self.init_ledger().await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::TRANSACTION_EXISTS => match string_args(&function, rest, 1) {
                Ok(a) => self.transaction_exists(&a[0]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::CREATE_TRANSACTION => match CreateTransactionParams::from_args(rest) {
                Ok(params) => self.create_transaction(params).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::READ_TRANSACTION => match string_args(&function, rest, 1) {
                Ok(a) => self.read_transaction(&a[0]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::DELETE_TRANSACTION => match string_args(&function, rest, 1) {
                Ok(a) => self.delete_transaction(&a[0]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::GET_ALL_TRANSACTIONS => match string_args(&function, rest, 0) {
                Ok(_) => self.list_all_transactions().await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            other => Response::error(
                LedgerError::InvalidArguments(format!("unknown function {other}")).to_string(),
            ),
        }
    }
}

fn seed_records(config: &LedgerConfig) -> LedgerResult<Vec<TransactionRecord>> {
    let seed = |txn_id: &str, pre: (&str, &str), post: (&str, &str), date: &str| {
        Ok::<_, LedgerError>(TransactionRecord {
            txn_id: txn_id.to_string(),
            sender: "13425qewrqwerqw23423423dfd".to_string(),
            receiver: "asfasfasdfasdf1425245234sd".to_string(),
            transaction_amount: parse_amount("transactionAmount", "100")?,
            sender_pre_balance: parse_amount("senderPreBalance", pre.0)?,
            receiver_pre_balance: parse_amount("receiverPreBalance", pre.1)?,
            sender_post_balance: parse_amount("senderPostBalance", post.0)?,
            receiver_post_balance: parse_amount("receiverPostBalance", post.1)?,
            transaction_date: date.to_string(),
            action_by: config.action_by.clone(),
            action_org: config.action_org.clone(),
            action_performed: "CreateWallet".to_string(),
        })
    };

    Ok(vec![
        seed(
            "M-df8J3WAbvmqewrwqeRUhmQ==",
            ("300", "500"),
            ("200", "600"),
            "2022.10.27 13:37:25",
        )?,
        seed(
            "M-df8J3WAbvmqewrwqeRUhnZ==",
            ("200", "600"),
            ("100", "700"),
            "2022.10.27 13:37:55",
        )?,
    ])
}
