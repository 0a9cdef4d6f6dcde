use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    DailyEntry, EntryId, NewDailyEntry, NewTransaction, Offer, OfferId, Subscription,
    SubscriptionCharge, SubscriptionId, Transaction, TransactionId,
};
use super::repository::{LedgerRepository, RepositoryError};

/// Serializable point-in-time view of a store, used to seed and persist it between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub offers: Vec<Offer>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct MemoryState {
    offers: BTreeMap<OfferId, Offer>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    transactions: Vec<Transaction>,
}

/// Process-local store. A single mutex guards every write, which gives the unique
/// `(offer, date)` constraint and the due-date compare-and-swap their atomicity.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerRepository {
    state: Arc<Mutex<MemoryState>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(offers: Vec<Offer>, subscriptions: Vec<Subscription>) -> Self {
        let repository = Self::default();
        if let Ok(mut state) = repository.state.lock() {
            state.offers = offers
                .into_iter()
                .map(|offer| (offer.id.clone(), offer))
                .collect();
            state.subscriptions = subscriptions
                .into_iter()
                .map(|subscription| (subscription.id.clone(), subscription))
                .collect();
        }
        repository
    }

    /// Seeds offers, subscriptions and prior transactions. Generated ids continue after the
    /// highest numeric suffix already present.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let repository = Self::seeded(snapshot.offers, snapshot.subscriptions);
        if let Ok(mut state) = repository.state.lock() {
            state.transactions = snapshot.transactions;
            repository
                .sequence
                .store(highest_sequence(&state), Ordering::Relaxed);
        }
        repository
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, RepositoryError> {
        let state = self.lock()?;
        Ok(LedgerSnapshot {
            offers: state.offers.values().cloned().collect(),
            subscriptions: state.subscriptions.values().cloned().collect(),
            transactions: state.transactions.clone(),
        })
    }

    pub fn upsert_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        self.lock()?.offers.insert(offer.id.clone(), offer);
        Ok(())
    }

    pub fn upsert_subscription(&self, subscription: Subscription) -> Result<(), RepositoryError> {
        self.lock()?
            .subscriptions
            .insert(subscription.id.clone(), subscription);
        Ok(())
    }

    /// Removes a subscription and clears the link on its transactions.
    pub fn remove_subscription(&self, id: &SubscriptionId) -> Result<Subscription, RepositoryError> {
        let mut state = self.lock()?;
        let removed = state
            .subscriptions
            .remove(id)
            .ok_or(RepositoryError::NotFound)?;
        for transaction in state
            .transactions
            .iter_mut()
            .filter(|transaction| transaction.subscription_id.as_ref() == Some(id))
        {
            transaction.subscription_id = None;
        }
        Ok(removed)
    }

    /// Removes an offer with its entries and clears the link on its transactions.
    pub fn remove_offer(&self, id: &OfferId) -> Result<Offer, RepositoryError> {
        let mut state = self.lock()?;
        let removed = state.offers.remove(id).ok_or(RepositoryError::NotFound)?;
        for transaction in state
            .transactions
            .iter_mut()
            .filter(|transaction| transaction.offer_id.as_ref() == Some(id))
        {
            transaction.offer_id = None;
        }
        Ok(removed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ledger store lock poisoned".to_string()))
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{id:06}")
    }
}

fn highest_sequence(state: &MemoryState) -> u64 {
    let entry_ids = state
        .offers
        .values()
        .flat_map(|offer| offer.daily_entries.values().map(|entry| entry.id.as_str()));
    let transaction_ids = state
        .transactions
        .iter()
        .map(|transaction| transaction.id.as_str());

    entry_ids
        .chain(transaction_ids)
        .filter_map(|id| id.rsplit('-').next()?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn list_offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        Ok(self.lock()?.offers.values().cloned().collect())
    }

    async fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.lock()?.offers.get(id).cloned())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, RepositoryError> {
        Ok(self.lock()?.subscriptions.values().cloned().collect())
    }

    async fn fetch_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        Ok(self.lock()?.subscriptions.get(id).cloned())
    }

    async fn insert_daily_entry(
        &self,
        entry: NewDailyEntry,
    ) -> Result<DailyEntry, RepositoryError> {
        let mut state = self.lock()?;
        let offer = state
            .offers
            .get_mut(&entry.offer_id)
            .ok_or(RepositoryError::NotFound)?;
        if offer.daily_entries.contains_key(&entry.date) {
            return Err(RepositoryError::Conflict);
        }

        let stored = DailyEntry {
            id: EntryId(self.next_id("entry")),
            offer_id: entry.offer_id,
            date: entry.date,
            revenue: entry.revenue,
            ads_spend: entry.ads_spend,
            cached_team_share: entry.cached_team_share,
        };
        offer.daily_entries.insert(stored.date, stored.clone());
        Ok(stored)
    }

    async fn replace_daily_entry(
        &self,
        entry: NewDailyEntry,
    ) -> Result<DailyEntry, RepositoryError> {
        let mut state = self.lock()?;
        let offer = state
            .offers
            .get_mut(&entry.offer_id)
            .ok_or(RepositoryError::NotFound)?;
        if !offer.daily_entries.contains_key(&entry.date) {
            return Err(RepositoryError::NotFound);
        }

        let stored = DailyEntry {
            id: EntryId(self.next_id("entry")),
            offer_id: entry.offer_id,
            date: entry.date,
            revenue: entry.revenue,
            ads_spend: entry.ads_spend,
            cached_team_share: entry.cached_team_share,
        };
        offer.daily_entries.insert(stored.date, stored.clone());
        Ok(stored)
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError> {
        let mut state = self.lock()?;
        let stored = transaction.into_transaction(TransactionId(self.next_id("txn")));
        state.transactions.push(stored.clone());
        Ok(stored)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError> {
        Ok(self.lock()?.transactions.clone())
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        next_payment_date: NaiveDate,
    ) -> Result<Subscription, RepositoryError> {
        let mut state = self.lock()?;
        let subscription = state
            .subscriptions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        subscription.next_payment_date = next_payment_date;
        Ok(subscription.clone())
    }

    async fn charge_subscription(
        &self,
        charge: SubscriptionCharge,
    ) -> Result<Transaction, RepositoryError> {
        let mut state = self.lock()?;
        let subscription = state
            .subscriptions
            .get_mut(&charge.subscription_id)
            .ok_or(RepositoryError::NotFound)?;
        if subscription.next_payment_date != charge.expected_due
            || !subscription.active
            || !subscription.auto_pay
        {
            return Err(RepositoryError::Stale);
        }
        subscription.next_payment_date = charge.next_due;

        let stored = NewTransaction::subscription_charge(subscription, charge.transaction.date)
            .into_transaction(TransactionId(self.next_id("txn")));
        state.transactions.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::domain::{BillingCycle, TransactionKind, TransactionStatus};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[tokio::test]
    async fn restored_snapshot_continues_id_sequence() {
        let subscription = Subscription {
            id: SubscriptionId::new("hosting"),
            name: "Hosting".to_string(),
            amount: dec!(100),
            billing_cycle: BillingCycle::Monthly,
            next_payment_date: date(2024, 2, 29),
            active: true,
            auto_pay: true,
            service_id: None,
        };
        let previous = NewTransaction::subscription_charge(&subscription, date(2024, 2, 1))
            .into_transaction(TransactionId::new("txn-000007"));
        let repository = InMemoryLedgerRepository::from_snapshot(LedgerSnapshot {
            offers: Vec::new(),
            subscriptions: vec![subscription],
            transactions: vec![previous],
        });

        let next = repository
            .insert_transaction(NewTransaction {
                date: date(2024, 2, 2),
                kind: TransactionKind::Income,
                amount: dec!(50),
                status: TransactionStatus::Pending,
                description: "Affiliate payout".to_string(),
                offer_id: None,
                service_id: None,
                subscription_id: None,
                original_currency: Some("EUR".to_string()),
                original_amount: Some(dec!(46)),
            })
            .await
            .expect("insert succeeds");

        assert_eq!(next.id.as_str(), "txn-000008");
        let snapshot = repository.snapshot().expect("snapshot");
        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.subscriptions.len(), 1);
    }
}
