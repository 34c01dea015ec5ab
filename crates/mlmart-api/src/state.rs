//! Application state shared across handlers

use std::sync::Arc;

use mlmart_db::LedgerStore;
use mlmart_ledger::CommissionEngine;

/// Shared application state
pub struct AppState<S: LedgerStore> {
    /// Commission engine over the configured store
    pub engine: CommissionEngine<S>,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(engine: CommissionEngine<S>) -> Arc<Self> {
        Arc::new(Self { engine })
    }
}
