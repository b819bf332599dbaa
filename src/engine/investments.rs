//! Investment lifecycle.
//!
//! Status is derived from the end date on every read — the stored value is
//! never trusted once the end date has passed. Opening an investment is a
//! create-then-deduct sequence against the store, same ordering discipline
//! as the reconciler but without a notification step.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::store::Ledger;
use crate::types::{Investment, InvestmentPlan, InvestmentStatus, LedgerError};

/// Derive the lifecycle status from the end date.
///
/// Completed iff the end date exists and is not in the future; an absent end
/// date reads as active.
pub fn status_of(end_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> InvestmentStatus {
    match end_date {
        Some(end) if end <= now => InvestmentStatus::Completed,
        _ => InvestmentStatus::Active,
    }
}

/// Value at maturity for a principal under a plan's full-term rate.
pub fn maturity_value(amount: Decimal, interest_rate: Decimal) -> Decimal {
    amount * (Decimal::ONE + interest_rate)
}

/// Investment operations against the store.
pub struct Investments {
    ledger: Ledger,
}

impl Investments {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Open an investment in `plan` for the given user.
    ///
    /// Requires the stake to meet the plan minimum and fit within the user's
    /// balance; the stake is deducted from the balance on success.
    pub async fn open(
        &self,
        user_id: &str,
        plan: &InvestmentPlan,
        amount: Decimal,
    ) -> Result<Investment> {
        if amount < plan.min_amount {
            return Err(LedgerError::InvalidAmount(amount).into());
        }

        let profile = self.ledger.profile_by_user(user_id).await?;
        if amount > profile.balance {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: profile.balance,
            }
            .into());
        }

        let start = Utc::now();
        let investment = Investment {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            plan_id: plan.id.clone(),
            amount,
            start_date: start,
            end_date: Some(start + Duration::days(plan.duration_days)),
            status: InvestmentStatus::Active,
        };

        self.ledger.create_investment(&investment).await?;
        self.ledger
            .update_profile_funds(&profile.id, profile.balance - amount, profile.total_deposit)
            .await?;

        info!(
            user_id,
            plan = %plan.name,
            amount = %amount,
            end_date = ?investment.end_date,
            "Investment opened"
        );

        Ok(investment)
    }

    /// A user's investments, newest first, with statuses recomputed.
    pub async fn list_for(&self, user_id: &str) -> Result<Vec<Investment>> {
        let now = Utc::now();
        let mut investments = self.ledger.investments_for(user_id).await?;
        for inv in &mut investments {
            inv.status = status_of(inv.end_date, now);
        }
        Ok(investments)
    }

    /// Whether the user's most recent investment is still running.
    pub async fn has_active(&self, user_id: &str) -> Result<bool> {
        let latest = self.ledger.latest_investment(user_id).await?;
        Ok(latest
            .map(|inv| status_of(inv.end_date, Utc::now()) == InvestmentStatus::Active)
            .unwrap_or(false))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
