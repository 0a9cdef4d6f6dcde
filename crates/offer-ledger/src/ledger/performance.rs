use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::commission::{team_share, validate_offer, ParticipantShare, ValidationWarning};
use super::domain::{MemberId, Offer, OfferId};

/// Totals for one offer over an inclusive date range, recomputed from its current payout
/// configuration. Amounts are left unrounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferPerformance {
    pub offer_id: OfferId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_recorded: usize,
    pub revenue: Decimal,
    pub ads_spend: Decimal,
    pub net_profit: Decimal,
    pub team_share: Decimal,
    pub participants: Vec<ParticipantShare>,
    /// Recomputed team share minus the share cached on the entries when they were written.
    pub cached_team_share_drift: Decimal,
    pub warnings: Vec<ValidationWarning>,
}

impl OfferPerformance {
    pub fn for_range(offer: &Offer, from: NaiveDate, to: NaiveDate) -> Self {
        let mut days_recorded = 0;
        let mut revenue = Decimal::ZERO;
        let mut ads_spend = Decimal::ZERO;
        let mut total_team_share = Decimal::ZERO;
        let mut drift = Decimal::ZERO;

        if from <= to {
            for entry in offer.entries_between(from, to) {
                let share = team_share(offer, entry);
                days_recorded += 1;
                revenue += entry.revenue;
                ads_spend += entry.ads_spend;
                total_team_share += share;
                if let Some(cached) = entry.cached_team_share {
                    drift += share - cached;
                }
            }
        }

        let participants = offer
            .participants
            .iter()
            .map(|participant| ParticipantShare {
                member_id: participant.member_id.clone(),
                share_percent: participant.share_percent,
                amount: total_team_share * participant.share_percent / Decimal::ONE_HUNDRED,
            })
            .collect();

        Self {
            offer_id: offer.id.clone(),
            from,
            to,
            days_recorded,
            revenue,
            ads_spend,
            net_profit: revenue - ads_spend,
            team_share: total_team_share,
            participants,
            cached_team_share_drift: drift,
            warnings: validate_offer(offer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberEarnings {
    pub member_id: MemberId,
    pub amount: Decimal,
    pub offers: Vec<OfferId>,
}

/// Each member's payouts across all offers in the range, largest first.
pub fn team_earnings<'a, I>(offers: I, from: NaiveDate, to: NaiveDate) -> Vec<MemberEarnings>
where
    I: IntoIterator<Item = &'a Offer>,
{
    let mut by_member: BTreeMap<MemberId, MemberEarnings> = BTreeMap::new();

    for offer in offers {
        let performance = OfferPerformance::for_range(offer, from, to);
        for share in performance.participants {
            let earnings = by_member
                .entry(share.member_id.clone())
                .or_insert_with(|| MemberEarnings {
                    member_id: share.member_id.clone(),
                    amount: Decimal::ZERO,
                    offers: Vec::new(),
                });
            earnings.amount += share.amount;
            if !earnings.offers.contains(&offer.id) {
                earnings.offers.push(offer.id.clone());
            }
        }
    }

    let mut earnings: Vec<_> = by_member.into_values().collect();
    earnings.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.member_id.cmp(&b.member_id))
    });
    earnings
}
