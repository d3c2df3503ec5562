//! Ledger records

use serde::{Deserialize, Serialize};

/// Largest id or balance the ledger holds; snapshots store integers as `i64`
pub const MAX_LEDGER_VALUE: u64 = i64::MAX.unsigned_abs();

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A user's current balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoint {
    pub id: u64,
    pub point: u64,
    pub update_millis: i64,
}

impl UserPoint {
    /// Zero balance for a user that has no record yet
    pub fn empty(id: u64) -> Self {
        Self {
            id,
            point: 0,
            update_millis: now_millis(),
        }
    }
}

/// Direction of a balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Charge,
    Use,
}

/// One recorded balance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointHistory {
    pub id: u64,
    pub user_id: u64,
    pub amount: u64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub update_millis: i64,
}
