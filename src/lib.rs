//! MERIDIAN — investment platform back-office engine.
//!
//! Core of the system is the ledger reconciler: approving or rejecting a
//! pending transaction adjusts the owner's balance and deposit totals, with
//! tier standing, investment lifecycle, and share holdings all derived from
//! the resulting ledger state.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod store;
pub mod types;
