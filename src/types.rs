//! Shared types for the MERIDIAN back-office engine.
//!
//! These types form the canonical data model used across all modules.
//! The remote store historically carried two divergent schemas; everything
//! here is the single collapsed form that the rest of the crate depends on.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user's profile document.
///
/// `balance` and `total_deposit` are adjusted only through approved
/// transaction transitions or explicit admin edits, and default to zero
/// when the stored document never wrote them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(rename = "totalDeposit", default)]
    pub total_deposit: Decimal,
    #[serde(default)]
    pub profit: Decimal,
    #[serde(rename = "kycStatus", default)]
    pub kyc_status: KycStatus,
    /// Referral code of the user who referred this one (empty if organic).
    #[serde(rename = "referredBy", default)]
    pub referred_by: String,
    /// This user's own referral code, handed out to invitees.
    #[serde(rename = "refereeId", default)]
    pub referee_id: String,
    #[serde(rename = "tierLevel", default = "default_tier_level")]
    pub tier_level: u32,
    #[serde(rename = "withdrawalPassword", default)]
    pub withdrawal_password: Option<String>,
}

fn default_tier_level() -> u32 {
    1
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (balance: ${} | deposits: ${} | kyc: {})",
            self.user_id, self.balance, self.total_deposit, self.kyc_status,
        )
    }
}

impl Profile {
    /// Net liquid value (balance + accrued profit), excluding share holdings.
    pub fn liquid_value(&self) -> Decimal {
        self.balance + self.profit
    }

    /// Helper to build a test profile with sensible defaults.
    #[cfg(test)]
    pub fn sample(user_id: &str, balance: Decimal, total_deposit: Decimal) -> Self {
        Profile {
            id: format!("profile-{user_id}"),
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            balance,
            total_deposit,
            profit: Decimal::ZERO,
            kyc_status: KycStatus::Approved,
            referred_by: String::new(),
            referee_id: format!("{user_id}-ref"),
            tier_level: 1,
            withdrawal_password: Some("hunter2".to_string()),
        }
    }
}

/// KYC verification status gating withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KycStatus::Pending => write!(f, "pending"),
            KycStatus::Approved => write!(f, "approved"),
            KycStatus::Rejected => write!(f, "rejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Money movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Deposit,
    Withdrawal,
}

impl TxType {
    /// Capitalized form used in notification messages.
    pub fn capitalized(&self) -> &'static str {
        match self {
            TxType::Deposit => "Deposit",
            TxType::Withdrawal => "Withdrawal",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Deposit => write!(f, "deposit"),
            TxType::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

impl std::str::FromStr for TxType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(TxType::Deposit),
            "withdrawal" | "withdraw" => Ok(TxType::Withdrawal),
            _ => Err(anyhow::anyhow!("Unknown transaction type: {s}")),
        }
    }
}

/// Lifecycle status of a transaction.
///
/// Created in `Pending`; an admin moves it to `Approved` or `Rejected`.
/// The store offers no state-machine guard, so re-transitions must be
/// tolerated by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Approved,
    Rejected,
}

impl TxStatus {
    /// All statuses (useful for iteration in tests).
    pub const ALL: &'static [TxStatus] =
        &[TxStatus::Pending, TxStatus::Approved, TxStatus::Rejected];
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "pending"),
            TxStatus::Approved => write!(f, "approved"),
            TxStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for TxStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TxStatus::Pending),
            "approved" => Ok(TxStatus::Approved),
            "rejected" => Ok(TxStatus::Rejected),
            _ => Err(anyhow::anyhow!("Unknown transaction status: {s}")),
        }
    }
}

/// A deposit or withdrawal awaiting (or past) admin review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: Decimal,
    /// Payment rail: "BTC", "ETH", "bank-transfer", "welcome-bonus", ...
    #[serde(default)]
    pub method: String,
    pub status: TxStatus,
    /// Receipt image URL for deposits, destination address for withdrawals.
    #[serde(rename = "photoUrl", default)]
    pub photo_url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ${} ({}) — {}",
            self.id, self.tx_type, self.amount, self.method, self.status,
        )
    }
}

impl Transaction {
    #[cfg(test)]
    pub fn sample(id: &str, user_id: &str, tx_type: TxType, amount: Decimal) -> Self {
        Transaction {
            id: id.to_string(),
            user_id: user_id.to_string(),
            tx_type,
            amount,
            method: "BTC".to_string(),
            status: TxStatus::Pending,
            photo_url: None,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// User-facing notification record. Created as a side effect of signup or a
/// transaction status change; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub read: bool,
}

// ---------------------------------------------------------------------------
// Investments
// ---------------------------------------------------------------------------

/// Lifecycle of an investment, derived from its end date on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentStatus {
    Active,
    Completed,
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestmentStatus::Active => write!(f, "active"),
            InvestmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A user's stake in an investment plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
    pub amount: Decimal,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
    /// Stored status — informational only. Callers must recompute via
    /// `engine::investments::status_of` before trusting it.
    pub status: InvestmentStatus,
}

/// Static catalog entry describing an investment product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Fractional rate over the full term (0.05 = 5%).
    pub interest_rate: Decimal,
    pub duration_days: i64,
    pub min_amount: Decimal,
}

// ---------------------------------------------------------------------------
// Share purchases
// ---------------------------------------------------------------------------

/// Append-only record of a share purchase. The aggregate share count for a
/// user is a sum reduction over all of their logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLog {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub shares: Decimal,
    pub amount: Decimal,
    #[serde(rename = "pricePerShare")]
    pub price_per_share: Decimal,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// One rung of the referral/deposit reward ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    /// Minimum approved deposit total to qualify.
    pub deposit: Decimal,
    /// Minimum referral count to qualify.
    pub referrals: u64,
    /// Percentage boost granted at this tier.
    pub boost: Decimal,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (${}+ / {}+ referrals, {}% boost)",
            self.name, self.deposit, self.referrals, self.boost,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for MERIDIAN.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Profile not found for user {0}")]
    ProfileNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Insufficient balance: need ${needed}, have ${available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("KYC not approved")]
    KycNotApproved,

    #[error("Withdrawal password not set")]
    WithdrawalPasswordNotSet,

    #[error("Incorrect withdrawal password")]
    WithdrawalPasswordMismatch,

    #[error("Invalid {asset} address: {address}")]
    InvalidAddress { asset: String, address: String },

    #[error("Withdrawal limit exceeded: max allowed ${0}")]
    WithdrawalLimitExceeded(Decimal),

    #[error("Remote store error: {0}")]
    Remote(String),

    /// A write after the first successful write failed. The store offers no
    /// multi-document transaction, so earlier writes are NOT rolled back.
    #[error("Partial write: {step} failed after earlier writes succeeded: {message}")]
    PartialWrite { step: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
