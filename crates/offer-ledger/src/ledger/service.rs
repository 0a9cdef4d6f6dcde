use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::billing::{BillingPassReport, BillingProcessor};
use super::clock::Clock;
use super::commission::{compute_shares, ShareBreakdown};
use super::compliance::{ComplianceReport, ComplianceScanner};
use super::domain::{
    DailyEntry, NewTransaction, Offer, OfferId, Subscription, SubscriptionId, Transaction,
};
use super::entries::DailyEntryResolver;
use super::error::LedgerError;
use super::performance::{team_earnings, MemberEarnings, OfferPerformance};
use super::repository::{LedgerRepository, RepositoryError};

/// Facade composing the pure calculators with the writing components over one repository.
pub struct LedgerService<R, C> {
    repository: Arc<R>,
    clock: Arc<C>,
    scanner: ComplianceScanner,
    resolver: DailyEntryResolver<R>,
    billing: BillingProcessor<R>,
}

impl<R, C> LedgerService<R, C>
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<C>, scanner: ComplianceScanner) -> Self {
        Self {
            resolver: DailyEntryResolver::new(repository.clone()),
            billing: BillingProcessor::new(repository.clone()),
            repository,
            clock,
            scanner,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn resolver(&self) -> &DailyEntryResolver<R> {
        &self.resolver
    }

    pub fn billing(&self) -> &BillingProcessor<R> {
        &self.billing
    }

    pub async fn scan_compliance(
        &self,
        today: Option<NaiveDate>,
    ) -> Result<ComplianceReport, LedgerError> {
        let today = today.unwrap_or_else(|| self.today());
        let offers = self.repository.list_offers().await?;
        Ok(self.scanner.scan(&offers, today))
    }

    pub async fn resolve_daily_entry(
        &self,
        offer_id: &OfferId,
        date: NaiveDate,
        revenue: Decimal,
        ads_spend: Decimal,
    ) -> Result<DailyEntry, LedgerError> {
        self.resolver.resolve(offer_id, date, revenue, ads_spend).await
    }

    pub async fn offer(&self, offer_id: &OfferId) -> Result<Offer, LedgerError> {
        self.repository
            .fetch_offer(offer_id)
            .await?
            .ok_or_else(|| LedgerError::OfferNotFound(offer_id.clone()))
    }

    /// Shares for a recorded day, recomputed from the offer's current configuration.
    pub async fn shares(
        &self,
        offer_id: &OfferId,
        date: NaiveDate,
    ) -> Result<ShareBreakdown, LedgerError> {
        let offer = self.offer(offer_id).await?;
        let entry = offer
            .entry_on(date)
            .ok_or_else(|| LedgerError::EntryNotFound {
                offer_id: offer_id.clone(),
                date,
            })?;
        Ok(compute_shares(&offer, entry))
    }

    pub async fn performance(
        &self,
        offer_id: &OfferId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OfferPerformance, LedgerError> {
        let offer = self.offer(offer_id).await?;
        Ok(OfferPerformance::for_range(&offer, from, to))
    }

    pub async fn team_earnings(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MemberEarnings>, LedgerError> {
        let offers = self.repository.list_offers().await?;
        Ok(team_earnings(&offers, from, to))
    }

    pub async fn run_billing_pass(
        &self,
        today: Option<NaiveDate>,
    ) -> Result<BillingPassReport, LedgerError> {
        let today = today.unwrap_or_else(|| self.today());
        self.billing.run_pass_from_repository(today).await
    }

    /// Explicit user edit of a subscription's due date; may move it backward.
    pub async fn reschedule_subscription(
        &self,
        id: &SubscriptionId,
        next_payment_date: NaiveDate,
    ) -> Result<Subscription, LedgerError> {
        match self
            .repository
            .update_subscription(id, next_payment_date)
            .await
        {
            Ok(subscription) => Ok(subscription),
            Err(RepositoryError::NotFound) => Err(LedgerError::SubscriptionNotFound(id.clone())),
            Err(other) => Err(LedgerError::ExternalService(other)),
        }
    }

    pub async fn record_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        Ok(self.repository.insert_transaction(transaction).await?)
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.repository.list_transactions().await?)
    }
}
