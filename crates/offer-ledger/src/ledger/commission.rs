//! Team pot and participant share derivation.
//!
//! Shares are always recomputed from the offer's current configuration. The team share
//! cached on a [`DailyEntry`] is never consulted here.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::domain::{DailyEntry, MemberId, Offer, OfferId, Participant, PayoutModel};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const MONEY_SCALE: u32 = 2;

/// Non-blocking configuration signals surfaced alongside computed shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    ParticipantSharesNotBalanced {
        offer_id: OfferId,
        total_percent: Decimal,
    },
    TeamPotOutOfRange {
        offer_id: OfferId,
        percent: Decimal,
    },
}

impl ValidationWarning {
    pub fn message(&self) -> String {
        match self {
            Self::ParticipantSharesNotBalanced {
                offer_id,
                total_percent,
            } => format!("participant shares for {offer_id} sum to {total_percent}%, not 100%"),
            Self::TeamPotOutOfRange { offer_id, percent } => {
                format!("team pot for {offer_id} is {percent}%, outside 0-100%")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantShare {
    pub member_id: MemberId,
    pub share_percent: Decimal,
    pub amount: Decimal,
}

/// Full share derivation for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareBreakdown {
    pub payout_model: PayoutModel,
    pub base: Decimal,
    pub team_pot_percent: Decimal,
    pub team_share: Decimal,
    pub participants: Vec<ParticipantShare>,
    pub warnings: Vec<ValidationWarning>,
}

/// Amount the team pot percentage applies to: revenue or net profit.
pub fn payout_base(offer: &Offer, entry: &DailyEntry) -> Decimal {
    match offer.payout_model {
        PayoutModel::Revenue => entry.revenue,
        PayoutModel::Profit => entry.net_profit(),
    }
}

pub fn team_share(offer: &Offer, entry: &DailyEntry) -> Decimal {
    team_share_of(
        offer.payout_model,
        offer.team_pot_percent,
        entry.revenue,
        entry.ads_spend,
    )
}

/// Same formula as [`team_share`] for raw figures that are not stored yet.
pub fn team_share_of(
    payout_model: PayoutModel,
    team_pot_percent: Option<Decimal>,
    revenue: Decimal,
    ads_spend: Decimal,
) -> Decimal {
    let base = match payout_model {
        PayoutModel::Revenue => revenue,
        PayoutModel::Profit => revenue - ads_spend,
    };
    base * team_pot_percent.unwrap_or(Decimal::ZERO) / HUNDRED
}

pub fn participant_share(offer: &Offer, entry: &DailyEntry, participant: &Participant) -> Decimal {
    team_share(offer, entry) * participant.share_percent / HUNDRED
}

pub fn compute_shares(offer: &Offer, entry: &DailyEntry) -> ShareBreakdown {
    let team_share = team_share(offer, entry);
    let participants = offer
        .participants
        .iter()
        .map(|participant| ParticipantShare {
            member_id: participant.member_id.clone(),
            share_percent: participant.share_percent,
            amount: team_share * participant.share_percent / HUNDRED,
        })
        .collect();

    ShareBreakdown {
        payout_model: offer.payout_model,
        base: payout_base(offer, entry),
        team_pot_percent: offer.team_pot_percent.unwrap_or(Decimal::ZERO),
        team_share,
        participants,
        warnings: validate_offer(offer),
    }
}

/// Configuration checks that inform the caller without rejecting the offer.
pub fn validate_offer(offer: &Offer) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if let Some(percent) = offer.team_pot_percent {
        if percent < Decimal::ZERO || percent > HUNDRED {
            warnings.push(ValidationWarning::TeamPotOutOfRange {
                offer_id: offer.id.clone(),
                percent,
            });
        }
    }

    if !offer.participants.is_empty() {
        let total: Decimal = offer
            .participants
            .iter()
            .map(|participant| participant.share_percent)
            .sum();
        if total != HUNDRED {
            warnings.push(ValidationWarning::ParticipantSharesNotBalanced {
                offer_id: offer.id.clone(),
                total_percent: total.normalize(),
            });
        }
    }

    warnings
}

/// Rounds a money amount to cents. Only presentation code should call this.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
