use chrono::NaiveDate;

use super::domain::{OfferId, SubscriptionId};
use super::repository::RepositoryError;

/// Failures surfaced by the ledger's writing components.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The day was already resolved; callers should treat it as done, not retry.
    #[error("daily entry for offer {offer_id} on {date} already exists")]
    Conflict { offer_id: OfferId, date: NaiveDate },
    #[error("offer {0} not found")]
    OfferNotFound(OfferId),
    #[error("subscription {0} not found")]
    SubscriptionNotFound(SubscriptionId),
    #[error("no daily entry for offer {offer_id} on {date}")]
    EntryNotFound { offer_id: OfferId, date: NaiveDate },
    #[error("external service failure: {0}")]
    ExternalService(#[source] RepositoryError),
}

impl From<RepositoryError> for LedgerError {
    fn from(value: RepositoryError) -> Self {
        Self::ExternalService(value)
    }
}
