//! Typed repository over the raw document store.
//!
//! Knows collection names and the canonical field layout; everything above
//! this layer works with domain types, never raw JSON. One schema, one
//! naming convention — the store's historical duplicate layouts are gone.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{DocumentStore, Query};
use crate::types::{
    Investment, LedgerError, Notification, Profile, StockLog, Transaction, TxStatus, TxType,
};

// Collection names.
pub const PROFILES: &str = "profiles";
pub const TRANSACTIONS: &str = "transactions";
pub const NOTIFICATIONS: &str = "notifications";
pub const INVESTMENTS: &str = "investments";
pub const STOCK_LOGS: &str = "stock_logs";

/// Typed access to the platform's collections.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn DocumentStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &str {
        self.store.name()
    }

    /// Serialize a record into store fields, dropping the system-managed
    /// `id`/`createdAt` keys.
    fn to_fields<T: serde::Serialize>(record: &T) -> Result<Value> {
        let mut value = serde_json::to_value(record).context("Failed to serialise record")?;
        if let Value::Object(ref mut map) = value {
            map.remove("id");
            map.remove("createdAt");
        }
        Ok(value)
    }

    // -- Profiles ----------------------------------------------------------

    /// Look up a profile by the owning user id.
    ///
    /// Fails with `LedgerError::ProfileNotFound` when no document matches —
    /// callers rely on this to abort before issuing any writes.
    pub async fn profile_by_user(&self, user_id: &str) -> Result<Profile> {
        let page = self
            .store
            .list(PROFILES, &Query::new().equal("userId", user_id))
            .await?;

        let doc = page
            .documents
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::ProfileNotFound(user_id.to_string()))?;

        doc.into_typed()
    }

    pub async fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.store
            .create(PROFILES, &profile.id, Self::to_fields(profile)?)
            .await?;
        debug!(user_id = %profile.user_id, "Profile created");
        Ok(())
    }

    /// Write new balance and total-deposit values to a profile.
    pub async fn update_profile_funds(
        &self,
        profile_id: &str,
        balance: Decimal,
        total_deposit: Decimal,
    ) -> Result<()> {
        self.store
            .update(
                PROFILES,
                profile_id,
                serde_json::json!({
                    "balance": balance,
                    "totalDeposit": total_deposit,
                }),
            )
            .await?;
        Ok(())
    }

    /// All profiles plus the store's total count.
    pub async fn list_profiles(&self) -> Result<(u64, Vec<Profile>)> {
        let page = self.store.list(PROFILES, &Query::new()).await?;
        let total = page.total;
        Ok((total, page.into_typed()?))
    }

    /// Number of profiles referred by the given referral code.
    pub async fn referral_count(&self, referral_code: &str) -> Result<u64> {
        let page = self
            .store
            .list(PROFILES, &Query::new().equal("referredBy", referral_code))
            .await?;
        Ok(page.total)
    }

    // -- Transactions ------------------------------------------------------

    pub async fn create_transaction(&self, tx: &Transaction) -> Result<()> {
        self.store
            .create(TRANSACTIONS, &tx.id, Self::to_fields(tx)?)
            .await?;
        debug!(tx_id = %tx.id, tx_type = %tx.tx_type, amount = %tx.amount, "Transaction created");
        Ok(())
    }

    /// Find a transaction by document id.
    ///
    /// The store only filters on data fields, so this scans the listing the
    /// same way the admin table does.
    pub async fn transaction_by_id(&self, tx_id: &str) -> Result<Transaction> {
        let page = self
            .store
            .list(TRANSACTIONS, &Query::new().order_desc("createdAt"))
            .await?;

        let doc = page
            .documents
            .into_iter()
            .find(|d| d.id == tx_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(tx_id.to_string()))?;

        doc.into_typed()
    }

    /// A user's transactions, newest first.
    pub async fn transactions_for(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let page = self
            .store
            .list(
                TRANSACTIONS,
                &Query::new().equal("userId", user_id).order_desc("createdAt"),
            )
            .await?;
        page.into_typed()
    }

    pub async fn set_transaction_status(&self, tx_id: &str, status: TxStatus) -> Result<()> {
        self.store
            .update(
                TRANSACTIONS,
                tx_id,
                serde_json::json!({ "status": status }),
            )
            .await?;
        Ok(())
    }

    /// Sum of a user's approved deposits — the tier ladder's deposit axis.
    pub async fn approved_deposit_total(&self, user_id: &str) -> Result<Decimal> {
        let page = self
            .store
            .list(
                TRANSACTIONS,
                &Query::new()
                    .equal("userId", user_id)
                    .equal("type", "deposit")
                    .equal("status", "approved"),
            )
            .await?;
        let txs: Vec<Transaction> = page.into_typed()?;
        Ok(txs.iter().map(|t| t.amount).sum())
    }

    /// Count of transactions awaiting admin review, platform-wide.
    pub async fn pending_transaction_count(&self) -> Result<u64> {
        let page = self
            .store
            .list(TRANSACTIONS, &Query::new().equal("status", "pending").limit(1))
            .await?;
        Ok(page.total)
    }

    // -- Notifications -----------------------------------------------------

    pub async fn create_notification(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<()> {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind: kind.to_string(),
            read: false,
        };
        self.store
            .create(
                NOTIFICATIONS,
                &notification.id,
                Self::to_fields(&notification)?,
            )
            .await?;
        Ok(())
    }

    pub async fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>> {
        let page = self
            .store
            .list(NOTIFICATIONS, &Query::new().equal("userId", user_id))
            .await?;
        page.into_typed()
    }

    // -- Investments -------------------------------------------------------

    pub async fn create_investment(&self, investment: &Investment) -> Result<()> {
        self.store
            .create(INVESTMENTS, &investment.id, Self::to_fields(investment)?)
            .await?;
        Ok(())
    }

    pub async fn investments_for(&self, user_id: &str) -> Result<Vec<Investment>> {
        let page = self
            .store
            .list(
                INVESTMENTS,
                &Query::new().equal("userId", user_id).order_desc("startDate"),
            )
            .await?;
        page.into_typed()
    }

    /// A user's most recent investment, if any.
    pub async fn latest_investment(&self, user_id: &str) -> Result<Option<Investment>> {
        let page = self
            .store
            .list(
                INVESTMENTS,
                &Query::new()
                    .equal("userId", user_id)
                    .order_desc("startDate")
                    .limit(1),
            )
            .await?;
        Ok(page.into_typed()?.into_iter().next())
    }

    // -- Stock logs --------------------------------------------------------

    pub async fn create_stock_log(&self, log: &StockLog) -> Result<()> {
        self.store
            .create(STOCK_LOGS, &log.id, Self::to_fields(log)?)
            .await?;
        Ok(())
    }

    pub async fn stock_logs_for(&self, user_id: &str) -> Result<Vec<StockLog>> {
        let page = self
            .store
            .list(
                STOCK_LOGS,
                &Query::new().equal("userId", user_id).order_desc("createdAt"),
            )
            .await?;
        page.into_typed()
    }
}

/// Convenience for tests and request flows that build transactions inline.
pub fn new_transaction(
    user_id: &str,
    tx_type: TxType,
    amount: Decimal,
    method: &str,
    status: TxStatus,
    photo_url: Option<String>,
) -> Transaction {
    Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        tx_type,
        amount,
        method: method.to_string(),
        status,
        photo_url,
        created_at: chrono::Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
