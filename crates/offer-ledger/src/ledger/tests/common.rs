use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::ledger::clock::FixedClock;
use crate::ledger::compliance::ComplianceScanner;
use crate::ledger::domain::{
    BillingCycle, DailyEntry, EntryId, MemberId, NewDailyEntry, NewTransaction, Offer, OfferId,
    OfferStatus, Participant, PayoutModel, Subscription, SubscriptionCharge, SubscriptionId,
    Transaction,
};
use crate::ledger::memory::InMemoryLedgerRepository;
use crate::ledger::repository::{LedgerRepository, RepositoryError};
use crate::ledger::service::LedgerService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn offer(id: &str, status: OfferStatus, start_date: NaiveDate) -> Offer {
    Offer {
        id: OfferId::new(id),
        name: format!("Offer {id}"),
        status,
        payout_model: PayoutModel::Revenue,
        team_pot_percent: Some(dec!(20)),
        participants: vec![
            Participant {
                member_id: MemberId::new("ana"),
                share_percent: dec!(50),
            },
            Participant {
                member_id: MemberId::new("ben"),
                share_percent: dec!(50),
            },
        ],
        start_date,
        end_date: None,
        daily_entries: BTreeMap::new(),
    }
}

pub(super) fn entry(offer_id: &str, date: NaiveDate, revenue: Decimal, ads_spend: Decimal) -> DailyEntry {
    DailyEntry {
        id: EntryId::new(format!("seed-{offer_id}-{date}")),
        offer_id: OfferId::new(offer_id),
        date,
        revenue,
        ads_spend,
        cached_team_share: None,
    }
}

/// Active offer with an entry for every day from `start` through `through`.
pub(super) fn fully_recorded_offer(id: &str, start: NaiveDate, through: NaiveDate) -> Offer {
    let mut offer = offer(id, OfferStatus::Active, start);
    let mut day = start;
    while day <= through {
        offer
            .daily_entries
            .insert(day, entry(id, day, dec!(100), dec!(25)));
        day = day.succ_opt().expect("next day");
    }
    offer
}

pub(super) fn subscription(id: &str, amount: Decimal, next_payment_date: NaiveDate) -> Subscription {
    Subscription {
        id: SubscriptionId::new(id),
        name: format!("Tool {id}"),
        amount,
        billing_cycle: BillingCycle::Monthly,
        next_payment_date,
        active: true,
        auto_pay: true,
        service_id: None,
    }
}

pub(super) fn build_service(
    offers: Vec<Offer>,
    subscriptions: Vec<Subscription>,
    today: NaiveDate,
) -> (
    Arc<LedgerService<InMemoryLedgerRepository, FixedClock>>,
    Arc<InMemoryLedgerRepository>,
) {
    let repository = Arc::new(InMemoryLedgerRepository::seeded(offers, subscriptions));
    let service = Arc::new(LedgerService::new(
        repository.clone(),
        Arc::new(FixedClock(today)),
        ComplianceScanner::default(),
    ));
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every call fails, standing in for an unreachable database.
pub(super) struct UnavailableRepository;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

#[async_trait]
impl LedgerRepository for UnavailableRepository {
    async fn list_offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        Err(offline())
    }

    async fn fetch_offer(&self, _id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Err(offline())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError> {
        Err(offline())
    }

    async fn fetch_subscription(
        &self,
        _id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Err(offline())
    }

    async fn insert_daily_entry(
        &self,
        _entry: NewDailyEntry,
    ) -> Result<DailyEntry, RepositoryError> {
        Err(offline())
    }

    async fn replace_daily_entry(
        &self,
        _entry: NewDailyEntry,
    ) -> Result<DailyEntry, RepositoryError> {
        Err(offline())
    }

    async fn insert_transaction(
        &self,
        _transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError> {
        Err(offline())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError> {
        Err(offline())
    }

    async fn update_subscription(
        &self,
        _id: &SubscriptionId,
        _next_payment_date: NaiveDate,
    ) -> Result<Subscription, RepositoryError> {
        Err(offline())
    }

    async fn charge_subscription(
        &self,
        _charge: SubscriptionCharge,
    ) -> Result<Transaction, RepositoryError> {
        Err(offline())
    }
}

/// In-memory store whose writes can be made to time out: charges for selected
/// subscriptions, and every daily entry write when `failing_entry_writes` is set.
#[derive(Default)]
pub(super) struct FlakyRepository {
    pub(super) inner: InMemoryLedgerRepository,
    pub(super) failing_charges: HashSet<SubscriptionId>,
    pub(super) failing_entry_writes: bool,
}

fn write_timeout() -> RepositoryError {
    RepositoryError::Unavailable("write timeout".to_string())
}

#[async_trait]
impl LedgerRepository for FlakyRepository {
    async fn list_offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        self.inner.list_offers().await
    }

    async fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        self.inner.fetch_offer(id).await
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError> {
        self.inner.list_subscriptions().await
    }

    async fn fetch_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        self.inner.fetch_subscription(id).await
    }

    async fn insert_daily_entry(
        &self,
        entry: NewDailyEntry,
    ) -> Result<DailyEntry, RepositoryError> {
        if self.failing_entry_writes {
            return Err(write_timeout());
        }
        self.inner.insert_daily_entry(entry).await
    }

    async fn replace_daily_entry(
        &self,
        entry: NewDailyEntry,
    ) -> Result<DailyEntry, RepositoryError> {
        if self.failing_entry_writes {
            return Err(write_timeout());
        }
        self.inner.replace_daily_entry(entry).await
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError> {
        self.inner.insert_transaction(transaction).await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError> {
        self.inner.list_transactions().await
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        next_payment_date: NaiveDate,
    ) -> Result<Subscription, RepositoryError> {
        self.inner.update_subscription(id, next_payment_date).await
    }

    async fn charge_subscription(
        &self,
        charge: SubscriptionCharge,
    ) -> Result<Transaction, RepositoryError> {
        if self.failing_charges.contains(&charge.subscription_id) {
            return Err(write_timeout());
        }
        self.inner.charge_subscription(charge).await
    }
}
