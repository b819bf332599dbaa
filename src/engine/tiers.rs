//! Tier derivation — mapping deposit totals and referral counts onto the
//! reward ladder.
//!
//! Pure functions over the static ladder; the ladder itself lives in
//! `catalog`.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::Tier;

/// A user's position on the ladder.
#[derive(Debug, Clone)]
pub struct TierStanding {
    pub active: Tier,
    /// The next rung to chase; `None` once the top tier is exceeded on both
    /// axes.
    pub next: Option<Tier>,
    /// Progress toward `next`, 0–100. Defined as 100 when `next` is `None`.
    pub progress_percent: u32,
}

/// Derive the active and next tier for a user.
///
/// Active is the highest entry (in ascending ladder order) whose deposit AND
/// referral thresholds are both met, defaulting to the lowest entry. Next is
/// the first entry the user falls short of on either axis.
pub fn standing(total_deposit: Decimal, referral_count: u64, ladder: &[Tier]) -> TierStanding {
    assert!(!ladder.is_empty(), "tier ladder must not be empty");

    let active = ladder
        .iter()
        .rev()
        .find(|tier| total_deposit >= tier.deposit && referral_count >= tier.referrals)
        .unwrap_or(&ladder[0])
        .clone();

    let next = ladder
        .iter()
        .find(|tier| tier.deposit > total_deposit || tier.referrals > referral_count)
        .cloned();

    let progress_percent = match &next {
        None => 100,
        Some(next_tier) => {
            let deposit_axis = axis_progress(
                total_deposit - active.deposit,
                next_tier.deposit - active.deposit,
            );
            let referral_axis = axis_progress(
                Decimal::from(referral_count) - Decimal::from(active.referrals),
                Decimal::from(next_tier.referrals) - Decimal::from(active.referrals),
            );
            let mean = (deposit_axis + referral_axis) / dec!(2);
            mean.round().to_u32().unwrap_or(0)
        }
    };

    TierStanding {
        active,
        next,
        progress_percent,
    }
}

/// Progress along one axis as a 0–100 percentage.
///
/// A zero span means active and next share the threshold on this axis, which
/// counts as fully progressed.
fn axis_progress(gained: Decimal, span: Decimal) -> Decimal {
    if span <= Decimal::ZERO {
        return dec!(100);
    }
    let pct = gained / span * dec!(100);
    pct.clamp(Decimal::ZERO, dec!(100))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tier_ladder;

    fn three_rung_ladder() -> Vec<Tier> {
        vec![
            Tier { name: "T0".into(), deposit: dec!(0), referrals: 0, boost: dec!(0) },
            Tier { name: "T1".into(), deposit: dec!(1000), referrals: 5, boost: dec!(2) },
            Tier { name: "T2".into(), deposit: dec!(5000), referrals: 15, boost: dec!(4) },
        ]
    }

    #[test]
    fn test_referral_shortfall_holds_tier_back() {
        // Deposit qualifies for T1 but referrals don't: active stays T0.
        let s = standing(dec!(1200), 3, &three_rung_ladder());
        assert_eq!(s.active.name, "T0");
        assert_eq!(s.next.as_ref().unwrap().name, "T1");
    }

    #[test]
    fn test_both_axes_met_advances() {
        let s = standing(dec!(1200), 5, &three_rung_ladder());
        assert_eq!(s.active.name, "T1");
        assert_eq!(s.next.as_ref().unwrap().name, "T2");
    }

    #[test]
    fn test_no_qualification_defaults_to_base() {
        let ladder = vec![
            Tier { name: "Paid".into(), deposit: dec!(500), referrals: 2, boost: dec!(1) },
            Tier { name: "More".into(), deposit: dec!(2000), referrals: 8, boost: dec!(3) },
        ];
        // Base rung has nonzero thresholds the user misses; still defaults
        // to index 0.
        let s = standing(dec!(0), 0, &ladder);
        assert_eq!(s.active.name, "Paid");
    }

    #[test]
    fn test_top_tier_has_no_next() {
        let s = standing(dec!(10000), 100, &three_rung_ladder());
        assert_eq!(s.active.name, "T2");
        assert!(s.next.is_none());
        assert_eq!(s.progress_percent, 100);
    }

    #[test]
    fn test_progress_midway() {
        // Deposit axis: 500/1000 = 50%. Referral axis: 0/5 = 0%. Mean 25%.
        let s = standing(dec!(500), 0, &three_rung_ladder());
        assert_eq!(s.progress_percent, 25);
    }

    #[test]
    fn test_progress_clamps_overshoot() {
        // Deposit overshoots T1's threshold while referrals lag; the deposit
        // axis clamps at 100 rather than inflating the mean.
        let s = standing(dec!(4000), 0, &three_rung_ladder());
        assert_eq!(s.active.name, "T0");
        assert_eq!(s.progress_percent, 50);
    }

    #[test]
    fn test_zero_span_axis_counts_full() {
        let ladder = vec![
            Tier { name: "A".into(), deposit: dec!(0), referrals: 0, boost: dec!(0) },
            Tier { name: "B".into(), deposit: dec!(0), referrals: 10, boost: dec!(1) },
        ];
        // Deposit span is zero: that axis reads 100. Referral axis 5/10 = 50.
        let s = standing(dec!(0), 5, &ladder);
        assert_eq!(s.progress_percent, 75);
    }

    #[test]
    fn test_production_ladder_bronze_to_silver() {
        let s = standing(dec!(1200), 3, &tier_ladder());
        assert_eq!(s.active.name, "Bronze");
        assert_eq!(s.next.as_ref().unwrap().name, "Silver");
    }

    #[test]
    fn test_production_ladder_diamond_is_terminal() {
        let s = standing(dec!(25000), 60, &tier_ladder());
        assert_eq!(s.active.name, "Diamond");
        assert!(s.next.is_none());
    }
}
