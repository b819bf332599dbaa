//! Core engine — reconciliation, tier/lifecycle derivation, and the
//! account/request flows that feed transactions into the ledger.

pub mod accounts;
pub mod investments;
pub mod reconciler;
pub mod shares;
pub mod tiers;
