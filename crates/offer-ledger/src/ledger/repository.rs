use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{
    DailyEntry, NewDailyEntry, NewTransaction, Offer, OfferId, Subscription, SubscriptionCharge,
    SubscriptionId, Transaction,
};

/// Persistence collaborator. Implementations own identifier assignment and must enforce
/// uniqueness and compare-and-swap at the storage boundary; callers add no locking.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn list_offers(&self) -> Result<Vec<Offer>, RepositoryError>;

    async fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError>;

    async fn fetch_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when `(offer_id, date)` already has an entry.
    async fn insert_daily_entry(&self, entry: NewDailyEntry)
        -> Result<DailyEntry, RepositoryError>;

    /// Swaps the stored entry for `(offer_id, date)` with new figures in one write. Fails
    /// with [`RepositoryError::NotFound`] when the day has no entry; nothing is removed then.
    async fn replace_daily_entry(&self, entry: NewDailyEntry)
        -> Result<DailyEntry, RepositoryError>;

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError>;

    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError>;

    /// Explicit user edit of the due date. Unlike billing, this may move the date backward.
    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        next_payment_date: NaiveDate,
    ) -> Result<Subscription, RepositoryError>;

    /// Posts the charge transaction and advances the due date as one unit. Fails with
    /// [`RepositoryError::Stale`] when the stored due date no longer equals
    /// `charge.expected_due` or the stored subscription is no longer active with auto-pay,
    /// in which case nothing is written. The posted amount is the stored amount.
    async fn charge_subscription(
        &self,
        charge: SubscriptionCharge,
    ) -> Result<Transaction, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
