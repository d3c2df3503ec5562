//! User point ledger
//!
//! The domain behind the request pipeline: balances that can be queried,
//! charged and spent, with every change recorded in a per-user history.

mod model;
mod service;
mod store;

pub use model::{TransactionType, MAX_LEDGER_VALUE};
pub use service::{DomainError, PointService};
pub use store::{PointStore, StoreError};
