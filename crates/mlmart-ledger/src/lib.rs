//! MLMart Ledger - deferred multi-level commission ledger
//!
//! When an order is delivered, commissions are computed per order line for the
//! buyer (cashback), up to three sponsorship levels above the buyer, and the
//! recruiter of each line's seller. Each credit is recorded as a time-locked
//! `pending` wallet transaction and moved into the withdrawable balance by the
//! settlement sweep once its hold expires.
//!
//! # Components
//!
//! - [`ReferralResolver`]: walks `sponsor_id` links, at most three hops
//! - [`CommissionPolicy`]: pure mapping from order lines to credit instructions
//! - [`PayoutEngine`]: the only write path into balances and the transaction log
//! - [`SettlementSweeper`]: promotes expired `pending` transactions
//! - [`OrderLifecycleGate`]: order state machine; distributes once on delivery
//! - [`CommissionEngine`]: facade running each operation in one unit of work
//!
//! # Invariants
//!
//! 1. `balance_cash` equals the sum of the wallet's `validated` transactions
//! 2. An order's commissions are recorded at most once
//! 3. A transaction moves `pending → validated` at most once
//! 4. A failed operation leaves no partial state

pub mod checkout;
pub mod commission;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod payout;
pub mod referral;
pub mod registration;
pub mod settlement;
pub mod wallet;

use tracing::warn;

use mlmart_db::UnitOfWork;

pub use checkout::{CheckoutLine, PlaceOrder, PlacedOrder};
pub use commission::{CommissionPolicy, OrderLine};
pub use config::{CommissionRates, LedgerConfig, MAX_HOLD_HOURS};
pub use engine::CommissionEngine;
pub use error::{LedgerError, LedgerResult};
pub use lifecycle::{DeliveryOutcome, DeliveryReceipt, OrderLifecycleGate};
pub use payout::{PayoutEngine, PayoutOutcome, SkipReason};
pub use referral::ReferralResolver;
pub use registration::{RegisterMember, RegisteredMember};
pub use settlement::{SettleScope, SettlementSweeper};
pub use wallet::Reconciliation;

/// Commit `uow` if `result` is `Ok`, roll it back otherwise.
pub(crate) async fn finish<U: UnitOfWork, T>(uow: U, result: LedgerResult<T>) -> LedgerResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}
