use std::collections::BTreeMap;
use std::fmt;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a tracked offer.
    OfferId
);
string_id!(SubscriptionId);
string_id!(ServiceId);
string_id!(
    /// Identifier assigned by the persistence layer when a daily entry is written.
    EntryId
);
string_id!(TransactionId);
string_id!(
    /// Team member receiving a slice of an offer's team pot.
    MemberId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Active,
    Paused,
    Ended,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
        }
    }
}

/// Whether the team pot is taken from gross revenue or from net profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutModel {
    Revenue,
    Profit,
}

impl PayoutModel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::Profit => "Profit",
        }
    }
}

/// A member's percentage of the team pot (0-100 scale, not a share of revenue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub member_id: MemberId,
    pub share_percent: Decimal,
}

/// One calendar day of recorded activity for an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub id: EntryId,
    pub offer_id: OfferId,
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub ads_spend: Decimal,
    /// Team share as computed when the entry was written. Historical hint only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_team_share: Option<Decimal>,
}

impl DailyEntry {
    pub fn net_profit(&self) -> Decimal {
        self.revenue - self.ads_spend
    }
}

/// Tracked revenue-generating initiative with its payout configuration and activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
    pub status: OfferStatus,
    pub payout_model: PayoutModel,
    #[serde(default)]
    pub team_pot_percent: Option<Decimal>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub daily_entries: BTreeMap<NaiveDate, DailyEntry>,
}

impl Offer {
    pub fn is_active(&self) -> bool {
        self.status == OfferStatus::Active
    }

    /// Whether `date` falls inside the offer's start/end bounds (inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    pub fn entry_on(&self, date: NaiveDate) -> Option<&DailyEntry> {
        self.daily_entries.get(&date)
    }

    pub fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Iterator<Item = &DailyEntry> {
        self.daily_entries.range(from..=to).map(|(_, entry)| entry)
    }
}

/// Draft of a daily entry before the persistence layer assigns it an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDailyEntry {
    pub offer_id: OfferId,
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub ads_spend: Decimal,
    pub cached_team_share: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }

    /// Adds one cycle to `date`. When the target month is shorter the result clamps to its
    /// last day, so 2024-01-31 advances to 2024-02-29 rather than spilling into March.
    pub fn advance(self, date: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            Self::Monthly => Months::new(1),
            Self::Yearly => Months::new(12),
        };
        date.checked_add_months(months)
    }
}

/// Recurring cost billed in base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub amount: Decimal,
    pub billing_cycle: BillingCycle,
    pub next_payment_date: NaiveDate,
    pub active: bool,
    pub auto_pay: bool,
    #[serde(default)]
    pub service_id: Option<ServiceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Paid,
    Pending,
}

impl TransactionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Pending => "Pending",
        }
    }
}

/// Immutable ledger line. Links are non-owning and are cleared, not cascaded, when the
/// linked record is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<OfferId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<ServiceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<SubscriptionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: String,
    pub offer_id: Option<OfferId>,
    pub service_id: Option<ServiceId>,
    pub subscription_id: Option<SubscriptionId>,
    pub original_currency: Option<String>,
    pub original_amount: Option<Decimal>,
}

impl NewTransaction {
    /// Paid expense line for one billing cycle of `subscription`.
    pub fn subscription_charge(subscription: &Subscription, date: NaiveDate) -> Self {
        Self {
            date,
            kind: TransactionKind::Expense,
            amount: subscription.amount,
            status: TransactionStatus::Paid,
            description: format!("{} ({})", subscription.name, subscription.billing_cycle.label()),
            offer_id: None,
            service_id: subscription.service_id.clone(),
            subscription_id: Some(subscription.id.clone()),
            original_currency: None,
            original_amount: None,
        }
    }

    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            date: self.date,
            kind: self.kind,
            amount: self.amount,
            status: self.status,
            description: self.description,
            offer_id: self.offer_id,
            service_id: self.service_id,
            subscription_id: self.subscription_id,
            original_currency: self.original_currency,
            original_amount: self.original_amount,
        }
    }
}

/// Atomic unit posted by the billing processor: one expense line plus a due-date advance
/// that only applies if the stored due date still equals `expected_due`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionCharge {
    pub subscription_id: SubscriptionId,
    pub expected_due: NaiveDate,
    pub next_due: NaiveDate,
    pub transaction: NewTransaction,
}
