//! Ledger reconciler — balance/deposit-total recomputation on transaction
//! status change.
//!
//! Applies the status→funds transition table, writes in a fixed order
//! (status → notification → profile), and serializes reconciliation per
//! user so concurrent admin actions cannot compute deltas from stale
//! balances. The store has no multi-document transaction, so a failure
//! after the first write surfaces as `PartialWrite` with no rollback.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::store::Ledger;
use crate::types::{LedgerError, Transaction, TxStatus, TxType};

// ---------------------------------------------------------------------------
// Funds delta
// ---------------------------------------------------------------------------

/// Signed adjustment to a profile's balance and total-deposit accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FundsDelta {
    pub balance: Decimal,
    pub total_deposit: Decimal,
}

impl FundsDelta {
    pub const ZERO: FundsDelta = FundsDelta {
        balance: Decimal::ZERO,
        total_deposit: Decimal::ZERO,
    };

    pub fn is_zero(&self) -> bool {
        self.balance.is_zero() && self.total_deposit.is_zero()
    }
}

/// Compute the funds adjustment for a status transition.
///
/// Transition table:
/// - not-approved → approved: deposit adds to balance and total deposit;
///   withdrawal deducts from balance.
/// - approved → not-approved (undo): the exact inverse.
/// - pending → rejected: no effect. Withdrawals deduct at approval time
///   only, so a never-approved withdrawal has nothing to refund.
/// - old == new: zero delta, so a retried transition never double-applies.
pub fn funds_delta(
    tx_type: TxType,
    amount: Decimal,
    old_status: TxStatus,
    new_status: TxStatus,
) -> FundsDelta {
    if old_status == new_status {
        return FundsDelta::ZERO;
    }

    let was_approved = old_status == TxStatus::Approved;
    let will_be_approved = new_status == TxStatus::Approved;

    if !was_approved && will_be_approved {
        match tx_type {
            TxType::Deposit => FundsDelta {
                balance: amount,
                total_deposit: amount,
            },
            TxType::Withdrawal => FundsDelta {
                balance: -amount,
                total_deposit: Decimal::ZERO,
            },
        }
    } else if was_approved && !will_be_approved {
        match tx_type {
            TxType::Deposit => FundsDelta {
                balance: -amount,
                total_deposit: -amount,
            },
            TxType::Withdrawal => FundsDelta {
                balance: amount,
                total_deposit: Decimal::ZERO,
            },
        }
    } else {
        // pending ↔ rejected: neither side was ever applied.
        FundsDelta::ZERO
    }
}

/// Notification text for a status change, e.g. `"Deposit of $500 was approved"`.
pub fn status_message(tx_type: TxType, amount: Decimal, new_status: TxStatus) -> String {
    format!(
        "{} of ${} was {}",
        tx_type.capitalized(),
        amount.normalize(),
        new_status,
    )
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub tx_id: String,
    pub old_status: TxStatus,
    pub new_status: TxStatus,
    pub delta: FundsDelta,
    pub balance: Decimal,
    pub total_deposit: Decimal,
    /// False when the transition was a no-op (old == new).
    pub notified: bool,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Drives transaction status transitions against the remote store.
pub struct Reconciler {
    ledger: Ledger,
    /// Per-user locks. Reconciliations for the same user run one at a time;
    /// different users proceed concurrently.
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Reconciler {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        // Drop entries nobody holds anymore; clones only happen under the
        // map lock, so a strong count of 1 means the lock is idle.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    async fn lock_table_len(&self) -> usize {
        self.user_locks.lock().await.len()
    }

    /// Transition a transaction to `new_status` and reconcile the owner's
    /// profile funds.
    ///
    /// The caller's `tx` may be a stale snapshot; the transaction's current
    /// status is re-read from the store under the lock and the delta is
    /// computed from that, so two racing reviews of the same row apply it
    /// once. Write order is fixed: transaction status, then notification,
    /// then profile funds. The profile is loaded before any write so a
    /// missing profile aborts cleanly; a failure after the status write
    /// surfaces as `LedgerError::PartialWrite` (the earlier writes stand —
    /// there is no compensating rollback).
    pub async fn transition(
        &self,
        tx: &Transaction,
        new_status: TxStatus,
    ) -> anyhow::Result<ReconcileOutcome> {
        if tx.amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(tx.amount).into());
        }

        let lock = self.lock_for(&tx.user_id).await;
        let _guard = lock.lock().await;

        // Authoritative status: another review may have landed between the
        // caller's read and this lock acquisition.
        let current = self.ledger.transaction_by_id(&tx.id).await?;
        let old_status = current.status;

        // Already-applied transition: nothing changed, touch nothing.
        if old_status == new_status {
            let profile = self.ledger.profile_by_user(&current.user_id).await?;
            return Ok(ReconcileOutcome {
                tx_id: current.id,
                old_status,
                new_status,
                delta: FundsDelta::ZERO,
                balance: profile.balance,
                total_deposit: profile.total_deposit,
                notified: false,
            });
        }

        // Load the profile before writing anything.
        let profile = self.ledger.profile_by_user(&current.user_id).await?;

        let delta = funds_delta(current.tx_type, current.amount, old_status, new_status);
        let new_balance = profile.balance + delta.balance;
        let new_total_deposit = profile.total_deposit + delta.total_deposit;

        // Write 1: transaction status.
        self.ledger
            .set_transaction_status(&current.id, new_status)
            .await?;

        // Write 2: notification.
        let message = status_message(current.tx_type, current.amount, new_status);
        if let Err(e) = self
            .ledger
            .create_notification(&current.user_id, "Transaction Status Updated", &message, "transaction")
            .await
        {
            warn!(
                tx_id = %current.id,
                user_id = %current.user_id,
                error = %e,
                "Partial write: status updated but notification insert failed"
            );
            return Err(LedgerError::PartialWrite {
                step: "notification",
                message: e.to_string(),
            }
            .into());
        }

        // Write 3: profile funds.
        if let Err(e) = self
            .ledger
            .update_profile_funds(&profile.id, new_balance, new_total_deposit)
            .await
        {
            warn!(
                tx_id = %current.id,
                user_id = %current.user_id,
                error = %e,
                "Partial write: status and notification written but profile update failed"
            );
            return Err(LedgerError::PartialWrite {
                step: "profile",
                message: e.to_string(),
            }
            .into());
        }

        info!(
            tx_id = %current.id,
            user_id = %current.user_id,
            transition = format!("{old_status}→{new_status}"),
            balance = %new_balance,
            total_deposit = %new_total_deposit,
            "Transaction reconciled"
        );

        Ok(ReconcileOutcome {
            tx_id: current.id,
            old_status,
            new_status,
            delta,
            balance: new_balance,
            total_deposit: new_total_deposit,
            notified: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
