//! PostgreSQL repository implementations
//!
//! Each aggregate's SQL lives in its own module; all of them run on the single
//! transaction held by [`PgUnitOfWork`].

mod order;
mod user;
mod wallet;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::{DbResult, UnitOfWork};

/// A PostgreSQL transaction acting as a unit of work
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
