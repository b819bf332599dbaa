//! Share holdings — aggregation over the append-only stock log plus the
//! purchase flow.
//!
//! Holdings are never stored as a running total; the aggregate is always a
//! sum reduction over the user's logs, marked to market with an externally
//! fetched unit price.

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::store::Ledger;
use crate::types::{LedgerError, StockLog};

/// Total shares held: sum over all logs.
pub fn total_shares(logs: &[StockLog]) -> Decimal {
    logs.iter().map(|log| log.shares).sum()
}

/// Mark-to-market value of a holding.
pub fn market_value(shares: Decimal, unit_price: Decimal) -> Decimal {
    shares * unit_price
}

/// Shares purchasable for a dollar amount at the given unit price.
pub fn shares_for_amount(amount: Decimal, unit_price: Decimal) -> Option<Decimal> {
    if unit_price <= Decimal::ZERO {
        return None;
    }
    Some(amount / unit_price)
}

/// A user's aggregated position.
#[derive(Debug, Clone)]
pub struct Holding {
    pub total_shares: Decimal,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
}

/// Share purchase operations against the store.
pub struct Shares {
    ledger: Ledger,
}

impl Shares {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Buy shares at the quoted unit price.
    ///
    /// The purchase amount is deducted from both balance and total deposit;
    /// the log row records the fill for later aggregation.
    pub async fn buy(
        &self,
        user_id: &str,
        shares: Decimal,
        unit_price: Decimal,
    ) -> Result<StockLog> {
        if shares <= Decimal::ZERO || unit_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(shares).into());
        }

        let amount = market_value(shares, unit_price);
        let profile = self.ledger.profile_by_user(user_id).await?;
        if amount > profile.balance {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: profile.balance,
            }
            .into());
        }

        let log = StockLog {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            shares,
            amount,
            price_per_share: unit_price,
            created_at: Utc::now(),
        };

        self.ledger.create_stock_log(&log).await?;
        self.ledger
            .update_profile_funds(
                &profile.id,
                profile.balance - amount,
                profile.total_deposit - amount,
            )
            .await?;

        info!(
            user_id,
            shares = %shares,
            amount = %amount,
            unit_price = %unit_price,
            "Shares purchased"
        );

        Ok(log)
    }

    /// Aggregate a user's position at the given unit price.
    pub async fn holding_for(&self, user_id: &str, unit_price: Decimal) -> Result<Holding> {
        let logs = self.ledger.stock_logs_for(user_id).await?;
        let shares = total_shares(&logs);
        Ok(Holding {
            total_shares: shares,
            cost_basis: logs.iter().map(|log| log.amount).sum(),
            market_value: market_value(shares, unit_price),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
