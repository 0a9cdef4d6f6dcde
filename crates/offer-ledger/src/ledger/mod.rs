//! Commission, compliance and subscription billing engine.
//!
//! [`commission`] and [`compliance`] are pure recomputations over a snapshot of offers.
//! [`entries`] and [`billing`] write through a [`LedgerRepository`] and rely on it for
//! uniqueness and compare-and-swap guarantees.

pub mod billing;
pub mod clock;
pub mod commission;
pub mod compliance;
pub mod currency;
pub mod dates;
pub mod domain;
pub mod entries;
mod error;
mod import;
pub mod memory;
pub mod performance;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use billing::{is_due, BillingCharge, BillingFailure, BillingPassReport, BillingProcessor};
pub use clock::{Clock, FixedClock, SystemClock};
pub use commission::{
    compute_shares, participant_share, round_money, team_share, ParticipantShare,
    ShareBreakdown, ValidationWarning,
};
pub use compliance::{scan_compliance, ComplianceReport, ComplianceScanner, MissingEntry};
pub use currency::{CurrencyError, CurrencyNormalizer, FallbackNormalizer, RateSource, RateTable};
pub use domain::{
    BillingCycle, DailyEntry, MemberId, NewTransaction, Offer, OfferId, OfferStatus,
    Participant, PayoutModel, ServiceId, Subscription, SubscriptionId, Transaction,
    TransactionKind, TransactionStatus,
};
pub use entries::{DailyEntryResolver, ImportError, ImportSummary, RejectedRow};
pub use error::LedgerError;
pub use memory::{InMemoryLedgerRepository, LedgerSnapshot};
pub use performance::{team_earnings, MemberEarnings, OfferPerformance};
pub use repository::{LedgerRepository, RepositoryError};
pub use router::ledger_router;
pub use service::LedgerService;
