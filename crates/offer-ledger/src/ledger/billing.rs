//! Reconciliation pass that posts due subscription charges.
//!
//! Each due subscription is charged at most once per pass: one Paid expense line dated
//! `today`, and one cycle added to its *previous* due date. Both writes go through
//! [`LedgerRepository::charge_subscription`], which only commits when the stored due date
//! still matches what this pass read. A subscription that is several cycles behind stays due
//! after the pass and is picked up again by the next one.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{NewTransaction, Subscription, SubscriptionCharge, SubscriptionId, TransactionId};
use super::error::LedgerError;
use super::repository::{LedgerRepository, RepositoryError};

pub fn is_due(subscription: &Subscription, today: NaiveDate) -> bool {
    subscription.active && subscription.auto_pay && subscription.next_payment_date <= today
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingCharge {
    pub subscription_id: SubscriptionId,
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    /// Due date the charge settled.
    pub charged_for: NaiveDate,
    pub next_payment_date: NaiveDate,
    /// The subscription is still behind after this charge.
    pub still_due: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingFailure {
    pub subscription_id: SubscriptionId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingPassReport {
    pub today: NaiveDate,
    pub due: usize,
    pub charged: Vec<BillingCharge>,
    /// Charged by a concurrent pass between our read and our write.
    pub skipped_stale: Vec<SubscriptionId>,
    pub failures: Vec<BillingFailure>,
}

impl BillingPassReport {
    fn new(today: NaiveDate) -> Self {
        Self {
            today,
            due: 0,
            charged: Vec::new(),
            skipped_stale: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn total_charged(&self) -> Decimal {
        self.charged.iter().map(|charge| charge.amount).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

enum ChargeOutcome {
    Charged(BillingCharge),
    Stale,
}

pub struct BillingProcessor<R> {
    repository: Arc<R>,
}

impl<R> BillingProcessor<R>
where
    R: LedgerRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Loads the current subscriptions and runs one pass over them.
    pub async fn run_pass_from_repository(
        &self,
        today: NaiveDate,
    ) -> Result<BillingPassReport, LedgerError> {
        let subscriptions = self.repository.list_subscriptions().await?;
        Ok(self.run_pass(&subscriptions, today).await)
    }

    /// Runs one pass over a snapshot. Failures are recorded per subscription and never
    /// stop the remaining subscriptions from being processed.
    pub async fn run_pass(
        &self,
        subscriptions: &[Subscription],
        today: NaiveDate,
    ) -> BillingPassReport {
        let mut report = BillingPassReport::new(today);

        for subscription in subscriptions.iter().filter(|sub| is_due(sub, today)) {
            report.due += 1;
            match self.charge(subscription, today).await {
                Ok(ChargeOutcome::Charged(charge)) => report.charged.push(charge),
                Ok(ChargeOutcome::Stale) => report.skipped_stale.push(subscription.id.clone()),
                Err(reason) => {
                    warn!(subscription_id = %subscription.id, %reason, "subscription charge failed");
                    report.failures.push(BillingFailure {
                        subscription_id: subscription.id.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            %today,
            due = report.due,
            charged = report.charged.len(),
            stale = report.skipped_stale.len(),
            failed = report.failures.len(),
            "billing pass finished"
        );

        report
    }

    async fn charge(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<ChargeOutcome, String> {
        let expected_due = subscription.next_payment_date;
        let next_due = subscription
            .billing_cycle
            .advance(expected_due)
            .ok_or_else(|| format!("cannot advance due date {expected_due}"))?;

        let charge = SubscriptionCharge {
            subscription_id: subscription.id.clone(),
            expected_due,
            next_due,
            transaction: NewTransaction::subscription_charge(subscription, today),
        };

        match self.repository.charge_subscription(charge).await {
            Ok(transaction) => {
                info!(
                    subscription_id = %subscription.id,
                    transaction_id = %transaction.id,
                    amount = %transaction.amount,
                    %expected_due,
                    %next_due,
                    "subscription charged"
                );
                Ok(ChargeOutcome::Charged(BillingCharge {
                    subscription_id: subscription.id.clone(),
                    transaction_id: transaction.id,
                    amount: transaction.amount,
                    charged_for: expected_due,
                    next_payment_date: next_due,
                    still_due: next_due <= today,
                }))
            }
            Err(RepositoryError::Stale) => {
                debug!(subscription_id = %subscription.id, "subscription already advanced, skipping");
                Ok(ChargeOutcome::Stale)
            }
            Err(err) => Err(err.to_string()),
        }
    }
}
