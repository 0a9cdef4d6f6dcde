use std::collections::BTreeMap;

use chrono::NaiveDate;
use offer_ledger::ledger::{
    compute_shares, participant_share, round_money, team_share, DailyEntry, MemberId, Offer,
    OfferId, OfferStatus, Participant, PayoutModel,
};
use offer_ledger::ledger::domain::EntryId;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn epsilon() -> Decimal {
    Decimal::new(1, 2)
}

fn build(
    payout_model: PayoutModel,
    pot_basis_points: i64,
    shares: Vec<Decimal>,
    revenue_cents: i64,
    ads_cents: i64,
) -> (Offer, DailyEntry) {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
    let entry = DailyEntry {
        id: EntryId::new("entry-1"),
        offer_id: OfferId::new("prop"),
        date,
        revenue: Decimal::new(revenue_cents, 2),
        ads_spend: Decimal::new(ads_cents, 2),
        cached_team_share: None,
    };
    let offer = Offer {
        id: OfferId::new("prop"),
        name: "Property offer".to_string(),
        status: OfferStatus::Active,
        payout_model,
        team_pot_percent: Some(Decimal::new(pot_basis_points, 2)),
        participants: shares
            .into_iter()
            .enumerate()
            .map(|(index, share_percent)| Participant {
                member_id: MemberId::new(format!("member-{index}")),
                share_percent,
            })
            .collect(),
        start_date: date,
        end_date: None,
        daily_entries: BTreeMap::from([(date, entry.clone())]),
    };
    (offer, entry)
}

/// Splits 100% into consecutive slices at the given basis-point cuts.
fn split_hundred(mut cuts: Vec<i64>) -> Vec<Decimal> {
    cuts.sort_unstable();
    let mut previous = 0;
    let mut shares = Vec::with_capacity(cuts.len() + 1);
    for cut in cuts {
        shares.push(Decimal::new(cut - previous, 2));
        previous = cut;
    }
    shares.push(Decimal::new(10_000 - previous, 2));
    shares
}

fn payout_model() -> impl Strategy<Value = PayoutModel> {
    prop_oneof![Just(PayoutModel::Revenue), Just(PayoutModel::Profit)]
}

proptest! {
    #[test]
    fn team_share_is_base_times_pot_percent(
        model in payout_model(),
        revenue_cents in 0i64..=100_000_000,
        spend_permille in 0i64..=1_000,
        pot_basis_points in 0i64..=10_000,
    ) {
        let ads_cents = revenue_cents * spend_permille / 1_000;
        let (offer, entry) = build(model, pot_basis_points, Vec::new(), revenue_cents, ads_cents);

        let base = match model {
            PayoutModel::Revenue => entry.revenue,
            PayoutModel::Profit => entry.revenue - entry.ads_spend,
        };
        let expected = base * Decimal::new(pot_basis_points, 2) / Decimal::ONE_HUNDRED;
        let actual = team_share(&offer, &entry);

        prop_assert!((actual - expected).abs() <= epsilon());
        prop_assert_eq!(round_money(actual), round_money(expected));
        prop_assert!(actual >= Decimal::ZERO);
    }
}

proptest! {
    #[test]
    fn balanced_participants_exhaust_the_team_share(
        model in payout_model(),
        revenue_cents in 0i64..=100_000_000,
        spend_permille in 0i64..=1_000,
        pot_basis_points in 0i64..=10_000,
        cuts in prop::collection::vec(0i64..=10_000, 0..=4),
    ) {
        let ads_cents = revenue_cents * spend_permille / 1_000;
        let shares = split_hundred(cuts);
        let (offer, entry) = build(model, pot_basis_points, shares, revenue_cents, ads_cents);

        let breakdown = compute_shares(&offer, &entry);
        let distributed: Decimal = breakdown.participants.iter().map(|share| share.amount).sum();

        prop_assert!((distributed - breakdown.team_share).abs() <= epsilon());
        prop_assert!(breakdown.warnings.is_empty());

        let recomputed: Decimal = offer
            .participants
            .iter()
            .map(|participant| participant_share(&offer, &entry, participant))
            .sum();
        prop_assert!((recomputed - team_share(&offer, &entry)).abs() <= epsilon());
    }
}
