//! Account flows — signup and the user-initiated deposit/withdrawal
//! requests that feed pending transactions into the review queue.
//!
//! Withdrawal requests run a fixed gate chain (KYC, destination address,
//! withdrawal password, balance, tier cap) and fail on the first gate that
//! rejects. Nothing here moves funds; approval does that through the
//! reconciler.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::catalog::tier_ladder;
use crate::engine::tiers;
use crate::store::{ledger::new_transaction, Ledger};
use crate::types::{KycStatus, LedgerError, Profile, Transaction, TxStatus, TxType};

/// Amount floors and the signup bonus, normally sourced from configuration.
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    pub welcome_bonus: Decimal,
    pub min_deposit: Decimal,
    pub min_withdrawal: Decimal,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            welcome_bonus: dec!(10),
            min_deposit: dec!(100),
            min_withdrawal: dec!(10),
        }
    }
}

/// A new user's registration details.
#[derive(Debug, Clone)]
pub struct Signup {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    /// Referral code of the inviting user, if any.
    pub referred_by: Option<String>,
}

/// Signup and transaction-request operations.
pub struct Accounts {
    ledger: Ledger,
    policy: AccountPolicy,
}

impl Accounts {
    pub fn new(ledger: Ledger, policy: AccountPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Register a new user.
    ///
    /// Creates the profile with the welcome bonus already credited, a welcome
    /// notification, and an approved `welcome-bonus` deposit transaction so
    /// the ledger history explains the opening balance.
    pub async fn signup(&self, signup: &Signup) -> Result<Profile> {
        let profile = Profile {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: signup.user_id.clone(),
            email: signup.email.clone(),
            balance: self.policy.welcome_bonus,
            total_deposit: Decimal::ZERO,
            profit: Decimal::ZERO,
            kyc_status: KycStatus::Pending,
            referred_by: signup.referred_by.clone().unwrap_or_default(),
            referee_id: referral_code(&signup.first_name),
            tier_level: 1,
            withdrawal_password: None,
        };

        self.ledger.create_profile(&profile).await?;
        self.ledger
            .create_notification(
                &signup.user_id,
                "Welcome!",
                &format!(
                    "Your account is ready. A ${} welcome bonus has been credited.",
                    self.policy.welcome_bonus.normalize()
                ),
                "info",
            )
            .await?;

        let bonus = new_transaction(
            &signup.user_id,
            TxType::Deposit,
            self.policy.welcome_bonus,
            "welcome-bonus",
            TxStatus::Approved,
            None,
        );
        self.ledger.create_transaction(&bonus).await?;

        info!(
            user_id = %signup.user_id,
            referral_code = %profile.referee_id,
            "Account created"
        );
        Ok(profile)
    }

    /// File a deposit request for admin review.
    ///
    /// Funds move only when the reconciler approves the resulting pending
    /// transaction.
    pub async fn request_deposit(
        &self,
        user_id: &str,
        amount: Decimal,
        method: &str,
        receipt_url: Option<String>,
    ) -> Result<Transaction> {
        if amount < self.policy.min_deposit {
            return Err(LedgerError::InvalidAmount(amount).into());
        }
        // Fails fast if the profile is missing.
        self.ledger.profile_by_user(user_id).await?;

        let tx = new_transaction(
            user_id,
            TxType::Deposit,
            amount,
            method,
            TxStatus::Pending,
            receipt_url,
        );
        self.ledger.create_transaction(&tx).await?;

        info!(user_id, amount = %amount, method, "Deposit requested");
        Ok(tx)
    }

    /// File a withdrawal request for admin review.
    ///
    /// Gate order: KYC approval, destination address format, withdrawal
    /// password, available balance, then the tier-derived per-request cap.
    /// The balance is untouched until an admin approves the transaction.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        amount: Decimal,
        asset: &str,
        address: &str,
        password: &str,
    ) -> Result<Transaction> {
        let profile = self.ledger.profile_by_user(user_id).await?;

        if profile.kyc_status != KycStatus::Approved {
            return Err(LedgerError::KycNotApproved.into());
        }
        if !address_is_valid(asset, address) {
            return Err(LedgerError::InvalidAddress {
                asset: asset.to_string(),
                address: address.to_string(),
            }
            .into());
        }
        match &profile.withdrawal_password {
            None => return Err(LedgerError::WithdrawalPasswordNotSet.into()),
            Some(set) if set != password => {
                return Err(LedgerError::WithdrawalPasswordMismatch.into())
            }
            Some(_) => {}
        }
        if amount < self.policy.min_withdrawal {
            return Err(LedgerError::InvalidAmount(amount).into());
        }
        if amount > profile.balance {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: profile.balance,
            }
            .into());
        }

        let deposit_total = self.ledger.approved_deposit_total(user_id).await?;
        let referrals = self.ledger.referral_count(&profile.referee_id).await?;
        let standing = tiers::standing(deposit_total, referrals, &tier_ladder());
        let cap = withdrawal_cap(standing.active.referrals);
        if amount > cap {
            return Err(LedgerError::WithdrawalLimitExceeded(cap).into());
        }

        let tx = new_transaction(
            user_id,
            TxType::Withdrawal,
            amount,
            asset,
            TxStatus::Pending,
            Some(address.to_string()),
        );
        self.ledger.create_transaction(&tx).await?;
        self.ledger
            .create_notification(
                user_id,
                "Withdrawal Placed",
                &format!(
                    "Your withdrawal of ${} is pending review.",
                    amount.normalize()
                ),
                "transaction",
            )
            .await?;

        info!(user_id, amount = %amount, asset, tier = %standing.active.name, "Withdrawal requested");
        Ok(tx)
    }
}

/// Per-request withdrawal cap for a tier.
///
/// Scales with the tier's referral threshold; the base tier (threshold zero)
/// gets a flat $50 cap.
pub fn withdrawal_cap(tier_referrals: u64) -> Decimal {
    if tier_referrals == 0 {
        dec!(50)
    } else {
        Decimal::from(tier_referrals) * dec!(100)
    }
}

/// Generate a referral code from the user's first name plus a random suffix.
fn referral_code(first_name: &str) -> String {
    let stem: String = first_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stem}{}", &suffix[..6])
}

/// Shape-check a destination address for the given asset.
///
/// BTC accepts legacy (`1`/`3`) base58 and bech32 (`bc1`) forms; ETH is the
/// usual `0x` + 40 hex digits. Unknown assets are not validated.
fn address_is_valid(asset: &str, address: &str) -> bool {
    match asset.to_uppercase().as_str() {
        "BTC" => {
            let bech32 = address.starts_with("bc1")
                && address.len() >= 14
                && address.len() <= 74
                && address[3..]
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
            let base58 = (address.starts_with('1') || address.starts_with('3'))
                && address.len() >= 26
                && address.len() <= 35
                && address
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() && !"0OIl".contains(c));
            bech32 || base58
        }
        "ETH" => {
            address.len() == 42
                && address.starts_with("0x")
                && address[2..].chars().all(|c| c.is_ascii_hexdigit())
        }
        _ => !address.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ledger::{NOTIFICATIONS, TRANSACTIONS};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    const ETH_ADDR: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
    const BTC_ADDR: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

    fn setup() -> (Accounts, Ledger, MemoryStore) {
        let store = MemoryStore::new();
        let ledger = Ledger::new(Arc::new(store.clone()));
        (
            Accounts::new(ledger.clone(), AccountPolicy::default()),
            ledger,
            store,
        )
    }

    fn signup_request(user_id: &str) -> Signup {
        Signup {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            first_name: "Alice".to_string(),
            referred_by: None,
        }
    }

    #[tokio::test]
    async fn test_signup_credits_welcome_bonus() {
        let (accounts, ledger, store) = setup();
        let profile = accounts.signup(&signup_request("u1")).await.unwrap();

        assert_eq!(profile.balance, dec!(10));
        assert_eq!(profile.total_deposit, Decimal::ZERO);
        assert_eq!(profile.kyc_status, KycStatus::Pending);
        assert_eq!(profile.tier_level, 1);

        // Welcome notification plus an approved bonus transaction.
        assert_eq!(store.count(NOTIFICATIONS), 1);
        let txs = ledger.transactions_for("u1").await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].method, "welcome-bonus");
        assert_eq!(txs[0].status, TxStatus::Approved);
    }

    #[tokio::test]
    async fn test_signup_referral_code_uses_first_name() {
        let (accounts, _, _) = setup();
        let profile = accounts.signup(&signup_request("u1")).await.unwrap();
        assert!(profile.referee_id.starts_with("alice"));
        assert_eq!(profile.referee_id.len(), "alice".len() + 6);
    }

    #[tokio::test]
    async fn test_signup_records_referrer() {
        let (accounts, ledger, _) = setup();
        let mut req = signup_request("u2");
        req.referred_by = Some("alice123abc".to_string());
        accounts.signup(&req).await.unwrap();

        assert_eq!(ledger.referral_count("alice123abc").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deposit_request_is_pending() {
        let (accounts, _, _) = setup();
        accounts.signup(&signup_request("u1")).await.unwrap();

        let tx = accounts
            .request_deposit("u1", dec!(250), "BTC", Some("https://img/receipt.png".into()))
            .await
            .unwrap();

        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.tx_type, TxType::Deposit);
    }

    #[tokio::test]
    async fn test_deposit_below_minimum_rejected() {
        let (accounts, _, _) = setup();
        accounts.signup(&signup_request("u1")).await.unwrap();

        let err = accounts
            .request_deposit("u1", dec!(50), "BTC", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidAmount(_))
        ));
    }

    async fn seeded_withdrawer(ledger: &Ledger) -> Profile {
        // KYC-approved profile with password and funds.
        let profile = Profile::sample("u1", dec!(400), dec!(400));
        ledger.create_profile(&profile).await.unwrap();
        profile
    }

    #[tokio::test]
    async fn test_withdrawal_requires_kyc() {
        let (accounts, ledger, _) = setup();
        let mut profile = Profile::sample("u1", dec!(400), dec!(400));
        profile.kyc_status = KycStatus::Pending;
        ledger.create_profile(&profile).await.unwrap();

        let err = accounts
            .request_withdrawal("u1", dec!(40), "BTC", BTC_ADDR, "hunter2")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::KycNotApproved)
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_rejects_bad_address() {
        let (accounts, ledger, _) = setup();
        seeded_withdrawer(&ledger).await;

        let err = accounts
            .request_withdrawal("u1", dec!(40), "ETH", "0xnothex", "hunter2")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_password_gates() {
        let (accounts, ledger, _) = setup();

        let mut no_password = Profile::sample("u1", dec!(400), dec!(400));
        no_password.withdrawal_password = None;
        ledger.create_profile(&no_password).await.unwrap();

        let err = accounts
            .request_withdrawal("u1", dec!(40), "ETH", ETH_ADDR, "hunter2")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::WithdrawalPasswordNotSet)
        ));

        let wrong = Profile::sample("u2", dec!(400), dec!(400));
        ledger.create_profile(&wrong).await.unwrap();
        let err = accounts
            .request_withdrawal("u2", dec!(40), "ETH", ETH_ADDR, "wrong")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::WithdrawalPasswordMismatch)
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_exceeding_balance_rejected() {
        let (accounts, ledger, _) = setup();
        seeded_withdrawer(&ledger).await;

        let err = accounts
            .request_withdrawal("u1", dec!(900), "ETH", ETH_ADDR, "hunter2")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_capped_by_tier() {
        let (accounts, ledger, _) = setup();
        // No approved deposits, no referrals: base tier, $50 cap.
        seeded_withdrawer(&ledger).await;

        let err = accounts
            .request_withdrawal("u1", dec!(60), "ETH", ETH_ADDR, "hunter2")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::WithdrawalLimitExceeded(cap)) if *cap == dec!(50)
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_within_cap_goes_pending() {
        let (accounts, ledger, store) = setup();
        seeded_withdrawer(&ledger).await;

        let tx = accounts
            .request_withdrawal("u1", dec!(40), "ETH", ETH_ADDR, "hunter2")
            .await
            .unwrap();

        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.tx_type, TxType::Withdrawal);
        assert_eq!(tx.photo_url.as_deref(), Some(ETH_ADDR));
        assert_eq!(store.count(TRANSACTIONS), 1);
        assert_eq!(store.count(NOTIFICATIONS), 1);

        // Balance is untouched until approval.
        let profile = ledger.profile_by_user("u1").await.unwrap();
        assert_eq!(profile.balance, dec!(400));
    }

    #[test]
    fn test_withdrawal_cap_scale() {
        assert_eq!(withdrawal_cap(0), dec!(50));
        assert_eq!(withdrawal_cap(5), dec!(500));
        assert_eq!(withdrawal_cap(30), dec!(3000));
    }

    #[test]
    fn test_address_validation() {
        assert!(address_is_valid("ETH", ETH_ADDR));
        assert!(!address_is_valid("ETH", "0x123"));
        assert!(!address_is_valid("ETH", "52908400098527886E0F7030069857D2E4169EE7aa"));

        assert!(address_is_valid("BTC", BTC_ADDR));
        assert!(address_is_valid("BTC", "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
        assert!(!address_is_valid("BTC", "bc1QUPPERCASE"));
        assert!(!address_is_valid("BTC", "2NotAnAddress"));

        // Unknown assets only require a non-empty destination.
        assert!(address_is_valid("bank", "account-42"));
        assert!(!address_is_valid("bank", ""));
    }
}
