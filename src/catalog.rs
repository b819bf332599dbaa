//! Static catalogs: the tier ladder and the investment plan lineup.
//!
//! Configuration data, not remote entities — the store never owns these.

use rust_decimal_macros::dec;

use crate::types::{InvestmentPlan, Tier};

/// The reward ladder, ascending by (deposit threshold, referral threshold).
///
/// A profile's effective tier is the highest entry whose thresholds are both
/// met; see `engine::tiers::standing`.
pub fn tier_ladder() -> Vec<Tier> {
    vec![
        Tier { name: "Bronze".into(), deposit: dec!(0), referrals: 0, boost: dec!(0) },
        Tier { name: "Silver".into(), deposit: dec!(1000), referrals: 5, boost: dec!(2) },
        Tier { name: "Gold".into(), deposit: dec!(5000), referrals: 15, boost: dec!(4) },
        Tier { name: "Platinum".into(), deposit: dec!(10000), referrals: 30, boost: dec!(6) },
        Tier { name: "Diamond".into(), deposit: dec!(20000), referrals: 50, boost: dec!(10) },
    ]
}

/// Available investment products.
pub fn plan_catalog() -> Vec<InvestmentPlan> {
    vec![
        InvestmentPlan {
            id: "starter".into(),
            name: "Starter".into(),
            description: "Short-term entry plan for new investors.".into(),
            interest_rate: dec!(0.05),
            duration_days: 30,
            min_amount: dec!(100),
        },
        InvestmentPlan {
            id: "growth".into(),
            name: "Growth".into(),
            description: "Balanced plan with a quarterly horizon.".into(),
            interest_rate: dec!(0.12),
            duration_days: 90,
            min_amount: dec!(1000),
        },
        InvestmentPlan {
            id: "premium".into(),
            name: "Premium".into(),
            description: "Long-horizon plan for committed capital.".into(),
            interest_rate: dec!(0.25),
            duration_days: 180,
            min_amount: dec!(5000),
        },
    ]
}

/// Look up a plan by id.
pub fn find_plan(id: &str) -> Option<InvestmentPlan> {
    plan_catalog().into_iter().find(|p| p.id == id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
