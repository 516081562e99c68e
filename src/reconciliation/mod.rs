//! Reconciliation of the audit trail against itself and against wallets
//!
//! Nothing in the world state enforces that a record's post-balances follow
//! from its pre-balances, or that consecutive records for a wallet chain
//! together. These checks find the records where that discipline broke.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ledger::TransactionContract;
use crate::traits::*;
use crate::types::*;

/// Date format used for transfer dates
pub const TRANSACTION_DATE_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// What kind of inconsistency was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscrepancyKind {
    /// `senderPostBalance != senderPreBalance - amount`
    SenderPostBalance,
    /// `receiverPostBalance != receiverPreBalance + amount`
    ReceiverPostBalance,
    /// A record's pre-balance for the wallet differs from the previous
    /// record's post-balance
    BrokenChain { wallet_id: String },
    /// The wallet's stored balance differs from the last recorded post-balance
    WalletBalance { wallet_id: String },
}

/// One inconsistency, with the value that was expected and the one found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub txn_id: String,
    pub kind: DiscrepancyKind,
    pub expected: BigDecimal,
    pub actual: BigDecimal,
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub records_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
    /// Balance implied by the last record touching the wallet, for replays
    pub final_balance: Option<BigDecimal>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Check the arithmetic of a single record
pub fn verify_record(record: &TransactionRecord) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    let sender_expected = &record.sender_pre_balance - &record.transaction_amount;
    if sender_expected != record.sender_post_balance {
        found.push(Discrepancy {
            txn_id: record.txn_id.clone(),
            kind: DiscrepancyKind::SenderPostBalance,
            expected: sender_expected,
            actual: record.sender_post_balance.clone(),
        });
    }

    let receiver_expected = &record.receiver_pre_balance + &record.transaction_amount;
    if receiver_expected != record.receiver_post_balance {
        found.push(Discrepancy {
            txn_id: record.txn_id.clone(),
            kind: DiscrepancyKind::ReceiverPostBalance,
            expected: receiver_expected,
            actual: record.receiver_post_balance.clone(),
        });
    }

    found
}

/// Reconciliation engine for the audit ledger
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Verify the arithmetic of every record in the audit ledger
    pub async fn audit<S: WorldState>(
        &self,
        ledger: &TransactionContract<S>,
    ) -> LedgerResult<ReconciliationReport> {
        let records = ledger.list_all_transactions().await?;
        let discrepancies: Vec<Discrepancy> = records.iter().flat_map(verify_record).collect();

        if !discrepancies.is_empty() {
            warn!(
                records = records.len(),
                discrepancies = discrepancies.len(),
                "audit ledger inconsistent"
            );
        }

        Ok(ReconciliationReport {
            records_checked: records.len(),
            discrepancies,
            final_balance: None,
        })
    }

    /// Replay the records touching `wallet_id` in date order and check that
    /// each one starts from the balance the previous one left
    ///
    /// Records with unparsable dates sort after dated ones, by ID.
    pub fn replay(&self, wallet_id: &str, records: &[TransactionRecord]) -> ReconciliationReport {
        let relevant = history(wallet_id, records);

        let mut discrepancies = Vec::new();
        let mut running: Option<BigDecimal> = None;

        for record in &relevant {
            let (pre, post) = if record.sender == record.receiver {
                (
                    record.sender_pre_balance.clone(),
                    record.sender_pre_balance.clone(),
                )
            } else if record.sender == wallet_id {
                (
                    record.sender_pre_balance.clone(),
                    record.sender_post_balance.clone(),
                )
            } else {
                (
                    record.receiver_pre_balance.clone(),
                    record.receiver_post_balance.clone(),
                )
            };

            if let Some(previous) = running.take() {
                if previous != pre {
                    discrepancies.push(Discrepancy {
                        txn_id: record.txn_id.clone(),
                        kind: DiscrepancyKind::BrokenChain {
                            wallet_id: wallet_id.to_string(),
                        },
                        expected: previous,
                        actual: pre,
                    });
                }
            }
            running = Some(post);
        }

        debug!(
            wallet_id,
            records = relevant.len(),
            discrepancies = discrepancies.len(),
            "wallet history replayed"
        );

        ReconciliationReport {
            records_checked: relevant.len(),
            discrepancies,
            final_balance: running,
        }
    }

    /// Replay the wallet's history and compare the outcome with its stored
    /// balance
    pub fn check_wallet(
        &self,
        wallet: &Wallet,
        records: &[TransactionRecord],
    ) -> ReconciliationReport {
        let mut report = self.replay(&wallet.wallet_id, records);
        if let Some(expected) = &report.final_balance {
            if *expected != wallet.balance {
                let txn_id = history(&wallet.wallet_id, records)
                    .last()
                    .map(|r| r.txn_id.clone())
                    .unwrap_or_default();
                report.discrepancies.push(Discrepancy {
                    txn_id,
                    kind: DiscrepancyKind::WalletBalance {
                        wallet_id: wallet.wallet_id.clone(),
                    },
                    expected: expected.clone(),
                    actual: wallet.balance.clone(),
                });
            }
        }
        report
    }
}

/// Records touching `wallet_id`, oldest first
///
/// Ties and unparsable dates are ordered by ID, undated records last.
fn history<'a>(wallet_id: &str, records: &'a [TransactionRecord]) -> Vec<&'a TransactionRecord> {
    let mut relevant: Vec<&TransactionRecord> = records
        .iter()
        .filter(|r| r.sender == wallet_id || r.receiver == wallet_id)
        .collect();
    relevant.sort_by(|a, b| {
        let key = |r: &TransactionRecord| {
            NaiveDateTime::parse_from_str(&r.transaction_date, TRANSACTION_DATE_FORMAT).ok()
        };
        match (key(*a), key(*b)) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.txn_id.cmp(&b.txn_id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.txn_id.cmp(&b.txn_id),
        }
    });
    relevant
}
