use crate::infra::{load_snapshot, parse_date, save_snapshot};
use chrono::{Local, NaiveDate};
use clap::Args;
use offer_ledger::config::AppConfig;
use offer_ledger::error::AppError;
use offer_ledger::ledger::{
    BillingPassReport, BillingProcessor, ComplianceReport, ComplianceScanner, DailyEntryResolver,
    ImportSummary, InMemoryLedgerRepository, LedgerError, Offer, OfferId,
};
use std::fmt::Write as _;
use std::fs::File;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ComplianceArgs {
    /// Ledger snapshot (JSON) to scan
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Override LEDGER_COMPLIANCE_WINDOW_DAYS for this run
    #[arg(long)]
    pub(crate) window_days: Option<NonZeroU32>,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BillingArgs {
    /// Ledger snapshot (JSON) holding the subscriptions to bill
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Write the updated snapshot here, including posted transactions
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Ledger snapshot (JSON) holding the offer
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Offer identifier the rows belong to
    #[arg(long)]
    pub(crate) offer: String,
    /// CSV export with Date, Revenue and Ads Spend columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Write the updated snapshot here
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_compliance(args: ComplianceArgs) -> Result<(), AppError> {
    let ComplianceArgs {
        snapshot,
        today,
        window_days,
        json,
    } = args;

    let config = AppConfig::load()?;
    let scanner = window_days
        .map(ComplianceScanner::new)
        .unwrap_or_else(|| config.ledger.scanner());
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let snapshot = load_snapshot(&snapshot)?;

    let report = scanner.scan(&snapshot.offers, today);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_compliance(&report, &snapshot.offers));
    }
    Ok(())
}

pub(crate) async fn run_billing(args: BillingArgs) -> Result<(), AppError> {
    let BillingArgs {
        snapshot,
        today,
        output,
        json,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let repository = Arc::new(InMemoryLedgerRepository::from_snapshot(load_snapshot(
        &snapshot,
    )?));
    let processor = BillingProcessor::new(repository.clone());

    let report = processor.run_pass_from_repository(today).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_billing(&report));
    }

    if let Some(path) = output {
        let updated = repository.snapshot().map_err(LedgerError::from)?;
        save_snapshot(&path, &updated)?;
        println!("Updated snapshot written to {}", path.display());
    }
    Ok(())
}

pub(crate) async fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs {
        snapshot,
        offer,
        csv,
        output,
    } = args;

    let repository = Arc::new(InMemoryLedgerRepository::from_snapshot(load_snapshot(
        &snapshot,
    )?));
    let resolver = DailyEntryResolver::new(repository.clone());
    let offer_id = OfferId::new(offer);

    let summary = resolver.import_csv(&offer_id, File::open(&csv)?).await?;
    print!("{}", render_import(&offer_id, &summary));

    if let Some(path) = output {
        let updated = repository.snapshot().map_err(LedgerError::from)?;
        save_snapshot(&path, &updated)?;
        println!("Updated snapshot written to {}", path.display());
    }
    Ok(())
}

fn offer_name<'a>(offers: &'a [Offer], offer_id: &'a OfferId) -> &'a str {
    offers
        .iter()
        .find(|offer| &offer.id == offer_id)
        .map(|offer| offer.name.as_str())
        .unwrap_or_else(|| offer_id.as_str())
}

pub(crate) fn render_compliance(report: &ComplianceReport, offers: &[Offer]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Daily entry compliance as of {} (last {} days)",
        report.today, report.window_days
    );
    let _ = writeln!(
        out,
        "  {} of {} active offers compliant ({}%)",
        report.compliant_offers, report.active_offers, report.compliance_rate
    );

    if report.is_fully_compliant() {
        let _ = writeln!(out, "  No missing entries.");
        return out;
    }

    let due_today: Vec<_> = report.due_today().collect();
    if !due_today.is_empty() {
        let _ = writeln!(out, "\nDue today");
        for gap in due_today {
            let _ = writeln!(out, "  - {}", offer_name(offers, &gap.offer_id));
        }
    }

    let overdue: Vec<_> = report.overdue().collect();
    if !overdue.is_empty() {
        let _ = writeln!(out, "\nOverdue");
        for gap in overdue {
            let _ = writeln!(out, "  - {} on {}", offer_name(offers, &gap.offer_id), gap.date);
        }
    }

    out
}

pub(crate) fn render_billing(report: &BillingPassReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Billing pass for {}: {} due, {} charged, total {}",
        report.today,
        report.due,
        report.charged.len(),
        report.total_charged()
    );

    for charge in &report.charged {
        let _ = writeln!(
            out,
            "  - {} charged {} for {} (next payment {}{})",
            charge.subscription_id,
            charge.amount,
            charge.charged_for,
            charge.next_payment_date,
            if charge.still_due { ", still due" } else { "" }
        );
    }
    for id in &report.skipped_stale {
        let _ = writeln!(out, "  - {} already charged by another pass", id);
    }
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "  ! {} failed: {}",
            failure.subscription_id, failure.reason
        );
    }

    out
}

pub(crate) fn render_import(offer_id: &OfferId, summary: &ImportSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Imported daily entries for {}: {} created, {} already resolved, {} rejected",
        offer_id,
        summary.created.len(),
        summary.already_resolved.len(),
        summary.rejected.len()
    );
    for row in &summary.rejected {
        let _ = writeln!(out, "  ! line {}: {}", row.line, row.reason);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::demo_snapshot;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).expect("valid date")
    }

    #[test]
    fn compliance_listing_uses_offer_names() {
        let snapshot = demo_snapshot(today());
        let report = ComplianceScanner::default().scan(&snapshot.offers, today());

        let rendered = render_compliance(&report, &snapshot.offers);

        assert!(rendered.contains("0 of 2 active offers compliant (0%)"));
        assert!(rendered.contains("  - Spring launch on 2024-05-17"));
        assert!(rendered.contains("Due today\n  - Evergreen SEO\n  - Spring launch"));
        assert!(!rendered.contains("Holiday bundle"));
    }

    #[tokio::test]
    async fn billing_listing_marks_backlog() {
        let repository = Arc::new(InMemoryLedgerRepository::from_snapshot(demo_snapshot(
            today(),
        )));
        let report = BillingProcessor::new(repository)
            .run_pass_from_repository(today())
            .await
            .expect("pass runs");

        assert_eq!(report.charged.len(), 2);
        assert_eq!(report.total_charged(), dec!(149.99));
        let rendered = render_billing(&report);
        assert!(rendered.contains("2 due, 2 charged, total 149.99"));
        assert!(rendered.contains("analytics charged 49.99 for 2024-04-05 (next payment 2024-05-05, still due)"));
    }
}
