use super::common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Cursor;
use std::sync::Arc;

use crate::ledger::domain::{OfferId, OfferStatus};
use crate::ledger::entries::{DailyEntryResolver, ImportError};
use crate::ledger::error::LedgerError;
use crate::ledger::memory::InMemoryLedgerRepository;
use crate::ledger::repository::LedgerRepository;

#[tokio::test]
async fn resolving_the_same_day_twice_conflicts_and_keeps_one_entry() {
    let (service, repository) = build_service(
        vec![offer("launch", OfferStatus::Active, date(2024, 1, 10))],
        Vec::new(),
        date(2024, 1, 15),
    );
    let offer_id = OfferId::new("launch");

    let first = service
        .resolve_daily_entry(&offer_id, date(2024, 1, 12), dec!(500), dec!(120))
        .await
        .expect("first resolve succeeds");
    assert_eq!(first.cached_team_share, Some(dec!(100)));

    let second = service
        .resolve_daily_entry(&offer_id, date(2024, 1, 12), dec!(999), dec!(1))
        .await;
    assert!(matches!(
        second,
        Err(LedgerError::Conflict { date: day, .. }) if day == date(2024, 1, 12)
    ));

    let stored = repository
        .fetch_offer(&offer_id)
        .await
        .expect("fetch succeeds")
        .expect("offer exists");
    assert_eq!(stored.daily_entries.len(), 1);
    let kept = stored.entry_on(date(2024, 1, 12)).expect("entry kept");
    assert_eq!(kept.id, first.id);
    assert_eq!(kept.revenue, dec!(500));
}

#[tokio::test]
async fn concurrent_resolves_produce_a_single_entry() {
    let (service, repository) = build_service(
        vec![offer("launch", OfferStatus::Active, date(2024, 1, 10))],
        Vec::new(),
        date(2024, 1, 15),
    );
    let offer_id = OfferId::new("launch");

    let mut handles = Vec::new();
    for attempt in 0..8 {
        let service = service.clone();
        let offer_id = offer_id.clone();
        let revenue = dec!(100) + Decimal::from(attempt);
        handles.push(tokio::spawn(async move {
            service
                .resolve_daily_entry(&offer_id, date(2024, 1, 14), revenue, dec!(0))
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task joins") {
            Ok(_) => created += 1,
            Err(LedgerError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    let stored = repository
        .fetch_offer(&offer_id)
        .await
        .expect("fetch succeeds")
        .expect("offer exists");
    assert_eq!(stored.daily_entries.len(), 1);
}

#[tokio::test]
async fn resolving_for_an_unknown_offer_is_not_found() {
    let (service, _) = build_service(Vec::new(), Vec::new(), date(2024, 1, 15));

    let result = service
        .resolve_daily_entry(&OfferId::new("ghost"), date(2024, 1, 15), dec!(10), dec!(0))
        .await;

    assert!(matches!(result, Err(LedgerError::OfferNotFound(id)) if id.as_str() == "ghost"));
}

#[tokio::test]
async fn unavailable_store_surfaces_as_external_service_error() {
    let resolver = DailyEntryResolver::new(Arc::new(UnavailableRepository));

    let result = resolver
        .resolve(&OfferId::new("launch"), date(2024, 1, 15), dec!(10), dec!(0))
        .await;

    assert!(matches!(result, Err(LedgerError::ExternalService(_))));
}

#[tokio::test]
async fn correction_replaces_the_stored_figures() {
    let (service, repository) = build_service(
        vec![offer("launch", OfferStatus::Active, date(2024, 1, 10))],
        Vec::new(),
        date(2024, 1, 15),
    );
    let offer_id = OfferId::new("launch");
    service
        .resolve_daily_entry(&offer_id, date(2024, 1, 11), dec!(200), dec!(50))
        .await
        .expect("resolve succeeds");

    let corrected = service
        .resolver()
        .correct(&offer_id, date(2024, 1, 11), dec!(250), dec!(60))
        .await
        .expect("correction succeeds");

    assert_eq!(corrected.revenue, dec!(250));
    let stored = repository
        .fetch_offer(&offer_id)
        .await
        .expect("fetch succeeds")
        .expect("offer exists");
    assert_eq!(stored.daily_entries.len(), 1);
    assert_eq!(
        stored.entry_on(date(2024, 1, 11)).map(|entry| entry.ads_spend),
        Some(dec!(60))
    );
}

#[tokio::test]
async fn failed_correction_keeps_the_original_figures() {
    let mut seeded = offer("launch", OfferStatus::Active, date(2024, 1, 1));
    seeded.daily_entries.insert(
        date(2024, 1, 5),
        entry("launch", date(2024, 1, 5), dec!(100), dec!(10)),
    );
    let repository = Arc::new(FlakyRepository {
        inner: InMemoryLedgerRepository::seeded(vec![seeded], Vec::new()),
        failing_entry_writes: true,
        ..FlakyRepository::default()
    });
    let resolver = DailyEntryResolver::new(repository.clone());
    let offer_id = OfferId::new("launch");

    let result = resolver
        .correct(&offer_id, date(2024, 1, 5), dec!(200), dec!(20))
        .await;

    assert!(matches!(result, Err(LedgerError::ExternalService(_))));
    let stored = repository
        .fetch_offer(&offer_id)
        .await
        .expect("fetch succeeds")
        .expect("offer exists");
    let kept = stored.entry_on(date(2024, 1, 5)).expect("entry kept");
    assert_eq!(kept.revenue, dec!(100));
    assert_eq!(kept.ads_spend, dec!(10));
}

#[tokio::test]
async fn correcting_a_day_without_an_entry_is_rejected() {
    let (service, _) = build_service(
        vec![offer("launch", OfferStatus::Active, date(2024, 1, 10))],
        Vec::new(),
        date(2024, 1, 15),
    );

    let result = service
        .resolver()
        .correct(&OfferId::new("launch"), date(2024, 1, 13), dec!(1), dec!(0))
        .await;

    assert!(matches!(result, Err(LedgerError::EntryNotFound { .. })));
}

#[tokio::test]
async fn csv_import_resolves_rows_and_reports_duplicates_and_rejects() {
    let (service, repository) = build_service(
        vec![offer("launch", OfferStatus::Active, date(2024, 1, 10))],
        Vec::new(),
        date(2024, 1, 15),
    );
    let offer_id = OfferId::new("launch");
    service
        .resolve_daily_entry(&offer_id, date(2024, 1, 11), dec!(80), dec!(20))
        .await
        .expect("resolve succeeds");

    let csv = "Date,Revenue,Ads Spend\n\
               2024-01-10,\"$1,200.50\",300\n\
               2024-01-11,90,10\n\
               2024-01-12,abc,5\n\
               2024-01-13,75,\n";

    let summary = service
        .resolver()
        .import_csv(&offer_id, Cursor::new(csv))
        .await
        .expect("import succeeds");

    assert_eq!(summary.created, vec![date(2024, 1, 10), date(2024, 1, 13)]);
    assert_eq!(summary.already_resolved, vec![date(2024, 1, 11)]);
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.rejected[0].line, 4);

    let stored = repository
        .fetch_offer(&offer_id)
        .await
        .expect("fetch succeeds")
        .expect("offer exists");
    assert_eq!(
        stored.entry_on(date(2024, 1, 10)).map(|entry| entry.revenue),
        Some(dec!(1200.50))
    );
    assert_eq!(
        stored.entry_on(date(2024, 1, 11)).map(|entry| entry.revenue),
        Some(dec!(80))
    );
    assert_eq!(
        stored.entry_on(date(2024, 1, 13)).map(|entry| entry.ads_spend),
        Some(dec!(0))
    );
}

#[tokio::test]
async fn csv_import_for_unknown_offer_fails() {
    let (service, _) = build_service(Vec::new(), Vec::new(), date(2024, 1, 15));

    let result = service
        .resolver()
        .import_csv(
            &OfferId::new("ghost"),
            Cursor::new("Date,Revenue,Ads Spend\n2024-01-10,10,0\n"),
        )
        .await;

    assert!(matches!(
        result,
        Err(ImportError::Ledger(LedgerError::OfferNotFound(_)))
    ));
}
