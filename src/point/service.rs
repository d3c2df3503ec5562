// Point service module
// Balance queries and mutations on top of the ledger store

use thiserror::Error;

use super::model::{PointHistory, TransactionType, UserPoint};
use super::store::{LedgerTxn, PointStore, StoreError};
use crate::config::PointsConfig;
use crate::logger;

/// Failures raised by ledger operations
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("user {user_id} does not exist")]
    UserNotFound { user_id: u64 },

    #[error("user {user_id} has no point history")]
    HistoryNotFound { user_id: u64 },

    #[error("amount must be greater than 0, got {amount}")]
    InvalidAmount { amount: u64 },

    #[error("insufficient points: balance {balance}, requested {amount}")]
    InsufficientPoint { balance: u64, amount: u64 },

    #[error("balance limit exceeded: balance {balance} + {amount} is over {limit}")]
    BalanceLimitExceeded { balance: u64, amount: u64, limit: u64 },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// User point operations
#[derive(Debug)]
pub struct PointService {
    store: PointStore,
    rules: PointsConfig,
}

impl PointService {
    pub const fn new(store: PointStore, rules: PointsConfig) -> Self {
        Self { store, rules }
    }

    /// Current balance of a user
    pub async fn point(&self, user_id: u64) -> Result<UserPoint, DomainError> {
        let txn = self.store.begin().await;
        self.find_user(&txn, user_id)
    }

    /// All balance changes of a user, oldest first
    pub async fn histories(&self, user_id: u64) -> Result<Vec<PointHistory>, DomainError> {
        let txn = self.store.begin().await;
        let histories = txn.select_histories(user_id);
        if histories.is_empty() {
            return Err(DomainError::HistoryNotFound { user_id });
        }
        Ok(histories)
    }

    /// Add `amount` to a user's balance and record a CHARGE entry
    pub async fn charge(&self, user_id: u64, amount: u64) -> Result<UserPoint, DomainError> {
        if amount == 0 {
            return Err(DomainError::InvalidAmount { amount });
        }

        let mut txn = self.store.begin().await;
        let current = self.find_user(&txn, user_id)?;

        let limit = self.rules.max_balance;
        let balance = match current.point.checked_add(amount) {
            Some(b) if b <= limit => b,
            _ => {
                return Err(DomainError::BalanceLimitExceeded {
                    balance: current.point,
                    amount,
                    limit,
                })
            }
        };

        let updated = txn.insert_or_update(user_id, balance);
        txn.insert_history(user_id, amount, TransactionType::Charge);
        txn.commit()?;

        logger::log_point_change(user_id, TransactionType::Charge, amount, updated.point);
        Ok(updated)
    }

    /// Subtract `amount` from a user's balance and record a USE entry
    pub async fn use_point(&self, user_id: u64, amount: u64) -> Result<UserPoint, DomainError> {
        if amount == 0 {
            return Err(DomainError::InvalidAmount { amount });
        }

        let mut txn = self.store.begin().await;
        let current = self.find_user(&txn, user_id)?;

        if current.point < amount {
            return Err(DomainError::InsufficientPoint {
                balance: current.point,
                amount,
            });
        }

        let updated = txn.insert_or_update(user_id, current.point - amount);
        txn.insert_history(user_id, amount, TransactionType::Use);
        txn.commit()?;

        logger::log_point_change(user_id, TransactionType::Use, amount, updated.point);
        Ok(updated)
    }

    fn find_user(&self, txn: &LedgerTxn<'_>, user_id: u64) -> Result<UserPoint, DomainError> {
        match txn.select_by_id(user_id) {
            Some(user) => Ok(user),
            None if self.rules.auto_create_users => Ok(UserPoint::empty(user_id)),
            None => Err(DomainError::UserNotFound { user_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn service(auto_create_users: bool) -> PointService {
        let rules = PointsConfig {
            max_amount: 10_000,
            max_balance: 20_000,
            auto_create_users,
            deny_unknown_fields: false,
        };
        PointService::new(PointStore::in_memory(), rules)
    }

    async fn seed(service: &PointService, user_id: u64, point: u64) {
        let mut txn = service.store.begin().await;
        txn.insert_or_update(user_id, point);
        txn.commit().unwrap();
    }

    #[tokio::test]
    async fn test_point_returns_balance() {
        let service = service(false);
        seed(&service, 1, 1000).await;

        let user = service.point(1).await.unwrap();
        assert_eq!(user.point, 1000);
    }

    #[tokio::test]
    async fn test_point_unknown_user_fails() {
        let service = service(false);
        assert!(matches!(
            service.point(1).await,
            Err(DomainError::UserNotFound { user_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_point_unknown_user_auto_created() {
        let service = service(true);
        assert_eq!(service.point(42).await.unwrap().point, 0);
    }

    #[tokio::test]
    async fn test_histories_in_order() {
        let service = service(true);
        service.charge(1, 500).await.unwrap();
        service.use_point(1, 200).await.unwrap();

        let histories = service.histories(1).await.unwrap();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[0].amount, 500);
        assert_eq!(histories[0].transaction_type, TransactionType::Charge);
        assert_eq!(histories[1].amount, 200);
        assert_eq!(histories[1].transaction_type, TransactionType::Use);
    }

    #[tokio::test]
    async fn test_histories_empty_fails() {
        let service = service(true);
        assert!(matches!(
            service.histories(1).await,
            Err(DomainError::HistoryNotFound { user_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_charge_unknown_user_fails() {
        let service = service(false);
        assert!(matches!(
            service.charge(1, 1000).await,
            Err(DomainError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_charge_adds_points_and_records_charge() {
        let service = service(false);
        seed(&service, 1, 500).await;

        let updated = service.charge(1, 300).await.unwrap();
        assert_eq!(updated.point, 800);

        let histories = service.histories(1).await.unwrap();
        assert_eq!(histories.len(), 1);
        assert_eq!(histories[0].amount, 300);
        assert_eq!(histories[0].transaction_type, TransactionType::Charge);
    }

    #[tokio::test]
    async fn test_charge_zero_fails() {
        let service = service(true);
        assert!(matches!(
            service.charge(1, 0).await,
            Err(DomainError::InvalidAmount { amount: 0 })
        ));
    }

    #[tokio::test]
    async fn test_charge_over_limit_fails_without_history() {
        let service = service(true);
        service.charge(1, 10_000).await.unwrap();
        service.charge(1, 10_000).await.unwrap();

        assert!(matches!(
            service.charge(1, 1).await,
            Err(DomainError::BalanceLimitExceeded { limit: 20_000, .. })
        ));
        assert_eq!(service.histories(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_use_subtracts_points() {
        let service = service(false);
        seed(&service, 1, 500).await;

        let updated = service.use_point(1, 200).await.unwrap();
        assert_eq!(updated.point, 300);
        assert_eq!(service.point(1).await.unwrap().point, 300);
    }

    #[tokio::test]
    async fn test_use_unknown_user_fails() {
        let service = service(false);
        assert!(matches!(
            service.use_point(1, 500).await,
            Err(DomainError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_use_insufficient_fails_without_history() {
        let service = service(false);
        seed(&service, 1, 1000).await;

        assert!(matches!(
            service.use_point(1, 1500).await,
            Err(DomainError::InsufficientPoint {
                balance: 1000,
                amount: 1500
            })
        ));
        assert_eq!(service.point(1).await.unwrap().point, 1000);
        assert!(service.histories(1).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_charges_all_applied() {
        let service = Arc::new(service(true));

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.charge(9, 10).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(service.point(9).await.unwrap().point, 500);
        assert_eq!(service.histories(9).await.unwrap().len(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_use_never_overdraws() {
        let service = Arc::new(service(false));
        seed(&service, 3, 100).await;

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.use_point(3, 10).await.is_ok() })
            })
            .collect();
        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(service.point(3).await.unwrap().point, 0);
    }
}
