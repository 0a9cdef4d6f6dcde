use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::commission::team_share_of;
use super::domain::{DailyEntry, NewDailyEntry, OfferId};
use super::error::LedgerError;
use super::import::{parse_rows, ParsedRow};
use super::repository::{LedgerRepository, RepositoryError};

/// Creates exactly one daily entry per `(offer, date)`.
pub struct DailyEntryResolver<R> {
    repository: Arc<R>,
}

impl<R> DailyEntryResolver<R>
where
    R: LedgerRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Records the day's figures. A second attempt for the same day fails with
    /// [`LedgerError::Conflict`]; the stored entry is never overwritten.
    pub async fn resolve(
        &self,
        offer_id: &OfferId,
        date: NaiveDate,
        revenue: Decimal,
        ads_spend: Decimal,
    ) -> Result<DailyEntry, LedgerError> {
        let draft = self.draft(offer_id, date, revenue, ads_spend).await?;

        match self.repository.insert_daily_entry(draft).await {
            Ok(entry) => {
                info!(offer_id = %offer_id, %date, entry_id = %entry.id, "daily entry resolved");
                Ok(entry)
            }
            Err(RepositoryError::Conflict) => {
                warn!(offer_id = %offer_id, %date, "daily entry already resolved");
                Err(LedgerError::Conflict {
                    offer_id: offer_id.clone(),
                    date,
                })
            }
            Err(RepositoryError::NotFound) => Err(LedgerError::OfferNotFound(offer_id.clone())),
            Err(other) => Err(LedgerError::ExternalService(other)),
        }
    }

    /// Explicit correction: swaps the stored entry for the day with new figures. The
    /// previous figures stay in place if the write fails.
    pub async fn correct(
        &self,
        offer_id: &OfferId,
        date: NaiveDate,
        revenue: Decimal,
        ads_spend: Decimal,
    ) -> Result<DailyEntry, LedgerError> {
        let draft = self.draft(offer_id, date, revenue, ads_spend).await?;

        match self.repository.replace_daily_entry(draft).await {
            Ok(entry) => {
                info!(offer_id = %offer_id, %date, entry_id = %entry.id, "daily entry corrected");
                Ok(entry)
            }
            Err(RepositoryError::NotFound) => Err(LedgerError::EntryNotFound {
                offer_id: offer_id.clone(),
                date,
            }),
            Err(other) => Err(LedgerError::ExternalService(other)),
        }
    }

    async fn draft(
        &self,
        offer_id: &OfferId,
        date: NaiveDate,
        revenue: Decimal,
        ads_spend: Decimal,
    ) -> Result<NewDailyEntry, LedgerError> {
        let offer = self
            .repository
            .fetch_offer(offer_id)
            .await?
            .ok_or_else(|| LedgerError::OfferNotFound(offer_id.clone()))?;

        Ok(NewDailyEntry {
            offer_id: offer_id.clone(),
            date,
            revenue,
            ads_spend,
            cached_team_share: Some(team_share_of(
                offer.payout_model,
                offer.team_pot_percent,
                revenue,
                ads_spend,
            )),
        })
    }

    /// Resolves every usable row of a CSV export. Days that already have an entry are
    /// reported as already resolved and left untouched.
    pub async fn import_csv<Rd: Read>(
        &self,
        offer_id: &OfferId,
        reader: Rd,
    ) -> Result<ImportSummary, ImportError> {
        let rows = parse_rows(reader)?;
        let mut summary = ImportSummary::default();

        for row in rows {
            match row {
                ParsedRow::Valid {
                    date,
                    revenue,
                    ads_spend,
                    ..
                } => match self.resolve(offer_id, date, revenue, ads_spend).await {
                    Ok(_) => summary.created.push(date),
                    Err(LedgerError::Conflict { date, .. }) => summary.already_resolved.push(date),
                    Err(err) => return Err(ImportError::Ledger(err)),
                },
                ParsedRow::Rejected { line, reason } => {
                    summary.rejected.push(RejectedRow { line, reason })
                }
            }
        }

        info!(
            offer_id = %offer_id,
            created = summary.created.len(),
            already_resolved = summary.already_resolved.len(),
            rejected = summary.rejected.len(),
            "daily entry import finished"
        );

        Ok(summary)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: Vec<NaiveDate>,
    pub already_resolved: Vec<NaiveDate>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid daily activity CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
