//! Transfer coordinator that moves value between wallets and records the
//! transfer in the audit ledger

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{BalancePolicy, LedgerConfig};
use crate::ledger::transaction::CreateTransactionParams;
use crate::ledger::WalletContract;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{format_amount, parse_amount, validate_transfer};

/// Progress of a single transfer
///
/// Only `Committed` and `Aborted` are terminal. Intermediate states are not
/// persisted and a failed transfer is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Started,
    SenderRead,
    ReceiverRead,
    AmountParsed,
    AuditInvoked,
    Committed,
    Aborted,
}

/// Outcome of a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub txn_id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: BigDecimal,
    pub sender_pre_balance: BigDecimal,
    pub receiver_pre_balance: BigDecimal,
    pub sender_post_balance: BigDecimal,
    pub receiver_post_balance: BigDecimal,
    pub state: TransferState,
    /// Whether the post-transfer balances were written to the wallets
    pub balances_applied: bool,
}

/// Function names the wallet component answers to
pub mod functions {
    pub const READ_WALLET: &str = "ReadWallet";
    pub const WALLET_EXISTS: &str = "WalletExists";
    pub const CREATE_WALLET: &str = "CreateWallet";
    pub const UPDATE_WALLET: &str = "UpdateWallet";
    pub const DELETE_WALLET: &str = "DeleteWallet";
    pub const GET_ALL_WALLETS: &str = "GetAllWallets";
    pub const DISTRIBUTE: &str = "Distribute";
}

/// Wallet state written back after a committed transfer
pub const COMMITTED_STATE: &str = "COMMITTED";

/// Orchestrates transfers between wallets of one account ledger
///
/// The audit record is written by a separate component reached through
/// `invoker`; the two writes share no transaction. The audit write is the
/// commit point. Wallet balances are only rewritten afterwards when
/// [`BalancePolicy::WriteBack`] is configured, and a failure there does not
/// undo the audit record.
pub struct TransferCoordinator<S: WorldState, I: ChaincodeInvoker> {
    wallets: WalletContract<S>,
    invoker: I,
    config: LedgerConfig,
}

impl<S: WorldState, I: ChaincodeInvoker> TransferCoordinator<S, I> {
    /// Create a coordinator with the default configuration
    pub fn new(state: S, invoker: I) -> Self {
        Self::with_config(state, invoker, LedgerConfig::default())
    }

    pub fn with_config(state: S, invoker: I, config: LedgerConfig) -> Self {
        Self {
            wallets: WalletContract::new(state),
            invoker,
            config,
        }
    }

    /// The account ledger this coordinator transfers between
    pub fn wallets(&self) -> &WalletContract<S> {
        &self.wallets
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Transfer `amount` from `sender_id` to `receiver_id`
    ///
    /// Any failure before the audit ledger accepts the record leaves both
    /// ledgers untouched.
    pub async fn distribute(
        &self,
        sender_id: &str,
        receiver_id: &str,
        amount: &str,
        txn_id: &str,
        txn_date: &str,
    ) -> LedgerResult<TransferReceipt> {
        debug!(txn_id, state = ?TransferState::Started, "transfer");

        let sender = self
            .wallets
            .read_wallet(sender_id)
            .await
            .inspect_err(|e| abort(txn_id, TransferState::Started, e))?;
        debug!(txn_id, state = ?TransferState::SenderRead, "transfer");

        let receiver = self
            .wallets
            .read_wallet(receiver_id)
            .await
            .inspect_err(|e| abort(txn_id, TransferState::SenderRead, e))?;
        debug!(txn_id, state = ?TransferState::ReceiverRead, "transfer");

        let amount = parse_amount("amount", amount)
            .and_then(|amount| validate_transfer(&self.config, &sender, &amount).map(|_| amount))
            .inspect_err(|e| abort(txn_id, TransferState::ReceiverRead, e))?;
        debug!(txn_id, state = ?TransferState::AmountParsed, "transfer");

        let sender_pre = sender.balance.clone();
        let receiver_pre = receiver.balance.clone();
        let sender_post = &sender_pre - &amount;
        let receiver_post = &receiver_pre + &amount;

        let params = CreateTransactionParams {
            txn_id: txn_id.to_string(),
            sender: sender_id.to_string(),
            receiver: receiver_id.to_string(),
            transaction_amount: format_amount(&amount),
            sender_pre_balance: format_amount(&sender_pre),
            receiver_pre_balance: format_amount(&receiver_pre),
            sender_post_balance: format_amount(&sender_post),
            receiver_post_balance: format_amount(&receiver_post),
            transaction_date: txn_date.to_string(),
            action_performed: self.config.distribute_action.clone(),
        };

        self.record_audit(params)
            .await
            .inspect_err(|e| abort(txn_id, TransferState::AuditInvoked, e))?;
        debug!(txn_id, state = ?TransferState::AuditInvoked, "audit record accepted");

        let balances_applied = match self.config.balance_policy {
            BalancePolicy::AuditOnly => false,
            BalancePolicy::WriteBack => {
                self.apply_balances(sender, receiver, &amount, txn_id, txn_date)
                    .await
                    .map_err(|e| {
                        warn!(txn_id, error = %e, "audit committed but balance write-back failed");
                        LedgerError::BalanceUpdateFailed {
                            txn_id: txn_id.to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                true
            }
        };

        info!(
            txn_id,
            sender = sender_id,
            receiver = receiver_id,
            amount = %amount,
            balances_applied,
            "transfer committed"
        );

        Ok(TransferReceipt {
            txn_id: txn_id.to_string(),
            sender: sender_id.to_string(),
            receiver: receiver_id.to_string(),
            amount,
            sender_pre_balance: sender_pre,
            receiver_pre_balance: receiver_pre,
            sender_post_balance: sender_post,
            receiver_post_balance: receiver_post,
            state: TransferState::Committed,
            balances_applied,
        })
    }

    async fn record_audit(&self, params: CreateTransactionParams) -> LedgerResult<()> {
        let response = self
            .invoker
            .invoke_chaincode(
                &self.config.audit_component,
                params.to_args(),
                &self.config.channel,
            )
            .await
            .map_err(|e| match e {
                LedgerError::Conflict(_) | LedgerError::InvocationFailed { .. } => e,
                other => LedgerError::InvocationFailed {
                    payload: other.to_string(),
                },
            })?;

        match response.status {
            STATUS_OK => Ok(()),
            STATUS_CONFLICT => Err(LedgerError::Conflict(response.payload_text())),
            _ => Err(LedgerError::InvocationFailed {
                payload: response.payload_text(),
            }),
        }
    }

    async fn apply_balances(
        &self,
        mut sender: Wallet,
        mut receiver: Wallet,
        amount: &BigDecimal,
        txn_id: &str,
        txn_date: &str,
    ) -> LedgerResult<()> {
        let now = chrono::Utc::now()
            .naive_utc()
            .format("%Y.%m.%d %H:%M:%S")
            .to_string();

        if sender.wallet_id == receiver.wallet_id {
            self.stamp(&mut sender, amount, txn_date, &now);
            return self.wallets.update_wallet(&sender).await;
        }

        sender.balance -= amount;
        receiver.balance += amount;
        self.stamp(&mut sender, amount, txn_date, &now);
        self.stamp(&mut receiver, amount, txn_date, &now);

        self.wallets.update_wallet(&sender).await?;
        self.wallets.update_wallet(&receiver).await?;
        debug!(txn_id, "wallet balances written back");
        Ok(())
    }

    fn stamp(&self, wallet: &mut Wallet, amount: &BigDecimal, txn_date: &str, now: &str) {
        wallet.transaction_amount = amount.clone();
        wallet.transaction_state = COMMITTED_STATE.to_string();
        wallet.transaction_date = txn_date.to_string();
        wallet.last_modified = now.to_string();
        wallet.action_by = self.config.action_by.clone();
        wallet.org_msp = self.config.action_org.clone();
        wallet.action_performed = self.config.distribute_action.clone();
    }
}

fn abort(txn_id: &str, reached: TransferState, error: &LedgerError) {
    warn!(
        txn_id,
        reached = ?reached,
        state = ?TransferState::Aborted,
        error = %error,
        "transfer aborted"
    );
}

#[async_trait]
impl<S: WorldState, I: ChaincodeInvoker> Chaincode for TransferCoordinator<S, I> {
    async fn invoke(&self, args: &[Vec<u8>]) -> Response {
        let Some((function, rest)) = args.split_first() else {
            return Response::error("missing function name");
        };
        let function = String::from_utf8_lossy(function).into_owned();
        debug!(function = %function, "wallet ledger invoked");

        match function.as_str() {
            functions::READ_WALLET => match string_args(&function, rest, 1) {
                Ok(a) => self.wallets.read_wallet(&a[0]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::WALLET_EXISTS => match string_args(&function, rest, 1) {
                Ok(a) => self.wallets.wallet_exists(&a[0]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::CREATE_WALLET => match wallet_arg(&function, rest) {
                Ok(wallet) => self.wallets.create_wallet(&wallet).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::UPDATE_WALLET => match wallet_arg(&function, rest) {
                Ok(wallet) => self.wallets.update_wallet(&wallet).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::DELETE_WALLET => match string_args(&function, rest, 1) {
                Ok(a) => self.wallets.delete_wallet(&a[0]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::GET_ALL_WALLETS => match string_args(&function, rest, 0) {
                Ok(_) => self.wallets.list_all_wallets().await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            functions::DISTRIBUTE => match string_args(&function, rest, 5) {
                Ok(a) => self.distribute(&a[0], &a[1], &a[2], &a[3], &a[4]).await.into(),
                Err(e) => Response::error(e.to_string()),
            },
            other => Response::error(
                LedgerError::InvalidArguments(format!("unknown function {other}")).to_string(),
            ),
        }
    }
}

fn wallet_arg(function: &str, args: &[Vec<u8>]) -> LedgerResult<Wallet> {
    if args.len() != 1 {
        return Err(LedgerError::InvalidArguments(format!(
            "{function} expects 1 argument, got {}",
            args.len()
        )));
    }
    Wallet::from_bytes("argument", &args[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionContract;
    use crate::utils::{LocalInvoker, MemoryWorldState};
    use std::sync::Arc;

    fn wallet(id: &str, balance: i64) -> Wallet {
        Wallet::new(
            id.to_string(),
            format!("{id}-owner"),
            "standard".to_string(),
            BigDecimal::from(balance),
        )
    }

    #[tokio::test]
    async fn test_distribute_records_audit_only() {
        let audit_state = MemoryWorldState::new();
        let invoker = LocalInvoker::new();
        invoker
            .register(
                "transactions",
                "mychannel",
                Arc::new(TransactionContract::new(audit_state.clone())),
            )
            .unwrap();

        let coordinator = TransferCoordinator::new(MemoryWorldState::new(), invoker);
        coordinator.wallets().create_wallet(&wallet("A", 300)).await.unwrap();
        coordinator.wallets().create_wallet(&wallet("B", 500)).await.unwrap();

        let receipt = coordinator
            .distribute("A", "B", "100", "T1", "2022.10.27 13:37:25")
            .await
            .unwrap();

        assert_eq!(receipt.state, TransferState::Committed);
        assert_eq!(receipt.sender_pre_balance, BigDecimal::from(300));
        assert_eq!(receipt.receiver_post_balance, BigDecimal::from(600));
        assert!(!receipt.balances_applied);

        // Wallets keep their stored balances under the default policy.
        let a = coordinator.wallets().read_wallet("A").await.unwrap();
        assert_eq!(a.balance, BigDecimal::from(300));

        let audit = TransactionContract::new(audit_state);
        let record = audit.read_transaction("T1").await.unwrap();
        assert_eq!(record.action_performed, "DISTRIBUTE");
        assert_eq!(record.sender_post_balance, BigDecimal::from(200));
    }

    #[tokio::test]
    async fn test_missing_audit_component_aborts() {
        let coordinator = TransferCoordinator::new(MemoryWorldState::new(), LocalInvoker::new());
        coordinator.wallets().create_wallet(&wallet("A", 300)).await.unwrap();
        coordinator.wallets().create_wallet(&wallet("B", 500)).await.unwrap();

        let result = coordinator
            .distribute("A", "B", "100", "T1", "2022.10.27 13:37:25")
            .await;

        assert!(matches!(result, Err(LedgerError::InvocationFailed { .. })));
    }
}
