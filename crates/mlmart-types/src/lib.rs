//! MLMart Types - Canonical domain types for the MLM marketplace ledger
//!
//! This crate contains the foundational types shared by the persistence layer,
//! the commission engine and the API surface:
//!
//! - Order and order-item lifecycle states
//! - Wallet transaction direction, category and status
//! - Referral chains and credit instructions produced by the commission policy
//! - Minor-unit money rounding
//!
//! All statuses have a stable lowercase/uppercase string form which is what the
//! database stores. Parsing an unknown string is an explicit error, never a default.

pub mod error;
pub mod money;
pub mod order;
pub mod wallet;
pub mod commission;

pub use error::*;
pub use money::*;
pub use order::*;
pub use wallet::*;
pub use commission::*;

/// Version of the MLMart types schema
pub const TYPES_VERSION: &str = "0.1.0";
