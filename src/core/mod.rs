//! Core business logic - framework-agnostic absence, allowance and leave request operations.
//!
//! All functions take a `SeaORM` connection and return the crate's [`Result`].
//! Multi-step workflows open their own transaction with [`begin_serializable`].

pub mod absence_type;
pub mod allowance;
pub mod business_days;
pub mod leave_request;
pub mod overlap;
pub mod stats;

use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, IsolationLevel,
    QuerySelect, TransactionTrait,
};

/// Page selection for list queries. A zero page or page size disables paging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,
    /// Items per page
    pub page_size: u64,
}

impl Pagination {
    /// Selects one page.
    #[must_use]
    pub const fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Returns every row.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            page: 0,
            page_size: 0,
        }
    }

    pub(crate) fn apply<Q: QuerySelect>(self, query: Q) -> Q {
        if self.page > 0 && self.page_size > 0 {
            query
                .offset((self.page - 1) * self.page_size)
                .limit(self.page_size)
        } else {
            query
        }
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    /// Rows on the requested page
    pub items: Vec<T>,
    /// Matching rows across all pages
    pub total: u64,
}

/// Opens a transaction strong enough for check-then-insert workflows.
///
/// Postgres and `MySQL` get `SERIALIZABLE`; `SQLite` write transactions are
/// already serialized by the database lock.
pub(crate) async fn begin_serializable(db: &DatabaseConnection) -> Result<DatabaseTransaction> {
    let txn = match db.get_database_backend() {
        DbBackend::Sqlite => db.begin().await?,
        _ => {
            db.begin_with_config(Some(IsolationLevel::Serializable), None)
                .await?
        }
    };
    Ok(txn)
}
