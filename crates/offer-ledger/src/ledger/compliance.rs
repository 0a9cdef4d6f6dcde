//! Detection of active offers that are missing daily entries inside the monitoring window.

use std::num::NonZeroU32;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::domain::{Offer, OfferId};

pub const DEFAULT_WINDOW_DAYS: NonZeroU32 = match NonZeroU32::new(30) {
    Some(days) => days,
    None => NonZeroU32::MIN,
};

/// A day on which an active offer has no recorded entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEntry {
    pub offer_id: OfferId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub today: NaiveDate,
    pub window_days: u32,
    pub active_offers: usize,
    pub compliant_offers: usize,
    /// Whole-number percentage of active offers with no gaps. 100 when nothing is active.
    pub compliance_rate: u8,
    /// Sorted by date descending, then offer id.
    pub missing: Vec<MissingEntry>,
}

impl ComplianceReport {
    pub fn due_today(&self) -> impl Iterator<Item = &MissingEntry> {
        let today = self.today;
        self.missing.iter().filter(move |entry| entry.date == today)
    }

    pub fn overdue(&self) -> impl Iterator<Item = &MissingEntry> {
        let today = self.today;
        self.missing.iter().filter(move |entry| entry.date != today)
    }

    pub fn missing_for<'a>(
        &'a self,
        offer_id: &'a OfferId,
    ) -> impl Iterator<Item = &'a MissingEntry> + 'a {
        self.missing
            .iter()
            .filter(move |entry| &entry.offer_id == offer_id)
    }

    pub fn is_fully_compliant(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Scanner over a trailing window of calendar days ending at the reference date.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceScanner {
    window_days: NonZeroU32,
}

impl Default for ComplianceScanner {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DAYS)
    }
}

impl ComplianceScanner {
    pub fn new(window_days: NonZeroU32) -> Self {
        Self { window_days }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days.get()
    }

    /// Days in the window, newest first: `today`, `today - 1`, ...
    pub fn window(&self, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        (0..i64::from(self.window_days.get())).filter_map(move |offset| {
            today.checked_sub_signed(Duration::days(offset))
        })
    }

    pub fn missing_for_offer(&self, offer: &Offer, today: NaiveDate) -> Vec<MissingEntry> {
        if !offer.is_active() {
            return Vec::new();
        }

        self.window(today)
            .filter(|date| offer.covers(*date))
            .filter(|date| !offer.daily_entries.contains_key(date))
            .map(|date| MissingEntry {
                offer_id: offer.id.clone(),
                date,
            })
            .collect()
    }

    pub fn scan<'a, I>(&self, offers: I, today: NaiveDate) -> ComplianceReport
    where
        I: IntoIterator<Item = &'a Offer>,
    {
        let mut active_offers = 0usize;
        let mut compliant_offers = 0usize;
        let mut missing = Vec::new();

        for offer in offers.into_iter().filter(|offer| offer.is_active()) {
            active_offers += 1;
            let gaps = self.missing_for_offer(offer, today);
            if gaps.is_empty() {
                compliant_offers += 1;
            }
            missing.extend(gaps);
        }

        missing.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.offer_id.cmp(&b.offer_id))
        });

        ComplianceReport {
            today,
            window_days: self.window_days.get(),
            active_offers,
            compliant_offers,
            compliance_rate: compliance_rate(compliant_offers, active_offers),
            missing,
        }
    }
}

/// Scan with the default 30-day window.
pub fn scan_compliance<'a, I>(offers: I, today: NaiveDate) -> ComplianceReport
where
    I: IntoIterator<Item = &'a Offer>,
{
    ComplianceScanner::default().scan(offers, today)
}

fn compliance_rate(compliant: usize, active: usize) -> u8 {
    if active == 0 {
        return 100;
    }

    // nearest whole percent, halves rounded up
    let rate = (compliant.min(active) * 200 + active) / (2 * active);
    u8::try_from(rate).unwrap_or(100)
}
