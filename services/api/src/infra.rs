use chrono::{Duration, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use offer_ledger::error::AppError;
use offer_ledger::ledger::domain::EntryId;
use offer_ledger::ledger::{
    round_money, BillingCycle, DailyEntry, InMemoryLedgerRepository, LedgerSnapshot, MemberId,
    Offer, OfferId, OfferStatus, Participant, PayoutModel, ServiceId, Subscription,
    SubscriptionId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    offer_ledger::ledger::dates::parse_date(raw)
}

pub(crate) fn load_snapshot(path: &Path) -> Result<LedgerSnapshot, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn save_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<(), AppError> {
    let encoded = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, encoded)?;
    Ok(())
}

/// Store seeded from a snapshot file, or empty when no file is given.
pub(crate) fn repository_from(path: Option<&Path>) -> Result<InMemoryLedgerRepository, AppError> {
    match path {
        Some(path) => Ok(InMemoryLedgerRepository::from_snapshot(load_snapshot(path)?)),
        None => Ok(InMemoryLedgerRepository::new()),
    }
}

fn participant(member: &str, share_percent: Decimal) -> Participant {
    Participant {
        member_id: MemberId::new(member),
        share_percent,
    }
}

/// Deterministic day-by-day figures so demo output is stable for a given reference date.
fn seeded_entries(
    offer_id: &OfferId,
    start: NaiveDate,
    today: NaiveDate,
    skip: &[i64],
) -> BTreeMap<NaiveDate, DailyEntry> {
    let mut entries = BTreeMap::new();
    let mut offset = 0i64;
    let mut day = start;
    while day <= today {
        let days_back = (today - day).num_days();
        if !skip.contains(&days_back) {
            let revenue = Decimal::from(400 + (offset * 37) % 250);
            let ads_spend = round_money(revenue * dec!(0.32));
            entries.insert(
                day,
                DailyEntry {
                    id: EntryId::new(format!("seed-{offer_id}-{day}")),
                    offer_id: offer_id.clone(),
                    date: day,
                    revenue,
                    ads_spend,
                    cached_team_share: None,
                },
            );
        }
        offset += 1;
        day += Duration::days(1);
    }
    entries
}

pub(crate) fn demo_snapshot(today: NaiveDate) -> LedgerSnapshot {
    let launch_id = OfferId::new("spring-launch");
    let launch_start = today - Duration::days(14);
    let seo_id = OfferId::new("evergreen-seo");
    let seo_start = today - Duration::days(45);
    let bundle_id = OfferId::new("holiday-bundle");
    let bundle_start = today - Duration::days(90);

    let offers = vec![
        Offer {
            id: launch_id.clone(),
            name: "Spring launch".to_string(),
            status: OfferStatus::Active,
            payout_model: PayoutModel::Profit,
            team_pot_percent: Some(dec!(30)),
            participants: vec![
                participant("ana", dec!(50)),
                participant("ben", dec!(30)),
                participant("cleo", dec!(20)),
            ],
            start_date: launch_start,
            end_date: None,
            daily_entries: seeded_entries(&launch_id, launch_start, today, &[0, 3]),
        },
        Offer {
            id: seo_id.clone(),
            name: "Evergreen SEO".to_string(),
            status: OfferStatus::Active,
            payout_model: PayoutModel::Revenue,
            team_pot_percent: Some(dec!(12)),
            participants: vec![participant("ana", dec!(70)), participant("ben", dec!(40))],
            start_date: seo_start,
            end_date: None,
            daily_entries: seeded_entries(&seo_id, seo_start, today, &[0]),
        },
        Offer {
            id: bundle_id.clone(),
            name: "Holiday bundle".to_string(),
            status: OfferStatus::Paused,
            payout_model: PayoutModel::Revenue,
            team_pot_percent: Some(dec!(20)),
            participants: vec![participant("cleo", dec!(100))],
            start_date: bundle_start,
            end_date: None,
            daily_entries: seeded_entries(&bundle_id, bundle_start, today - Duration::days(30), &[]),
        },
    ];

    let subscriptions = vec![
        Subscription {
            id: SubscriptionId::new("hosting"),
            name: "Hosting".to_string(),
            amount: dec!(100),
            billing_cycle: BillingCycle::Monthly,
            next_payment_date: today - Duration::days(1),
            active: true,
            auto_pay: true,
            service_id: Some(ServiceId::new("cloud")),
        },
        Subscription {
            id: SubscriptionId::new("analytics"),
            name: "Analytics suite".to_string(),
            amount: dec!(49.99),
            billing_cycle: BillingCycle::Monthly,
            next_payment_date: today - Duration::days(45),
            active: true,
            auto_pay: true,
            service_id: None,
        },
        Subscription {
            id: SubscriptionId::new("design-tool"),
            name: "Design tool".to_string(),
            amount: dec!(240),
            billing_cycle: BillingCycle::Yearly,
            next_payment_date: today + Duration::days(60),
            active: true,
            auto_pay: true,
            service_id: None,
        },
        Subscription {
            id: SubscriptionId::new("legal-retainer"),
            name: "Legal retainer".to_string(),
            amount: dec!(500),
            billing_cycle: BillingCycle::Monthly,
            next_payment_date: today - Duration::days(3),
            active: true,
            auto_pay: false,
            service_id: None,
        },
    ];

    LedgerSnapshot {
        offers,
        subscriptions,
        transactions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_snapshot_leaves_known_gaps() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).expect("valid date");
        let snapshot = demo_snapshot(today);

        let launch = &snapshot.offers[0];
        assert_eq!(launch.daily_entries.len(), 13);
        assert!(launch.entry_on(today).is_none());
        assert!(launch.entry_on(today - Duration::days(3)).is_none());
        assert_eq!(snapshot.subscriptions.len(), 4);
    }

    #[test]
    fn snapshot_round_trips_through_a_file() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).expect("valid date");
        let path = std::env::temp_dir().join(format!(
            "offer-ledger-snapshot-{}.json",
            std::process::id()
        ));

        save_snapshot(&path, &demo_snapshot(today)).expect("snapshot saved");
        let loaded = load_snapshot(&path).expect("snapshot loads");
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.offers.len(), 3);
        assert_eq!(loaded.subscriptions[0].next_payment_date, today - Duration::days(1));
    }
}
