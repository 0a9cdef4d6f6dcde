use crate::infra::{demo_snapshot, parse_date};
use crate::reports::{render_billing, render_compliance};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use offer_ledger::config::AppConfig;
use offer_ledger::error::AppError;
use offer_ledger::ledger::{
    round_money, CurrencyNormalizer, FixedClock, InMemoryLedgerRepository, LedgerError,
    LedgerService, OfferId, RateTable, ShareBreakdown,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Also show payouts converted into this currency using the fallback rate table.
    #[arg(long)]
    pub(crate) currency: Option<String>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, currency } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let config = AppConfig::load()?;
    let rates = config.ledger.fallback_rates.clone();

    let snapshot = demo_snapshot(today);
    let offers = snapshot.offers.clone();
    let repository = Arc::new(InMemoryLedgerRepository::from_snapshot(snapshot));
    let service = LedgerService::new(
        repository,
        Arc::new(FixedClock(today)),
        config.ledger.scanner(),
    );

    println!("Offer ledger demo for {today}");

    let before = service.scan_compliance(None).await?;
    println!();
    print!("{}", render_compliance(&before, &offers));

    let launch = OfferId::new("spring-launch");
    println!("\nClosing today's books for Spring launch");
    let entry = service
        .resolve_daily_entry(&launch, today, dec!(620), dec!(180))
        .await?;
    println!(
        "  recorded {} revenue {} / ads {} as {}",
        entry.date, entry.revenue, entry.ads_spend, entry.id
    );
    match service
        .resolve_daily_entry(&launch, today, dec!(620), dec!(180))
        .await
    {
        Err(LedgerError::Conflict { .. }) => {
            println!("  a second close for the same day was rejected as already resolved")
        }
        Err(other) => return Err(other.into()),
        Ok(duplicate) => println!("  unexpected duplicate entry {}", duplicate.id),
    }

    let shares = service.shares(&launch, today).await?;
    println!("\nToday's payout for Spring launch");
    print!("{}", render_shares(&shares, currency.as_deref(), &rates));

    let seo = OfferId::new("evergreen-seo");
    let seo_shares = service.shares(&seo, today - Duration::days(1)).await?;
    println!("\nYesterday's payout for Evergreen SEO");
    print!("{}", render_shares(&seo_shares, currency.as_deref(), &rates));

    let from = today - Duration::days(13);
    let earnings = service.team_earnings(from, today).await?;
    println!("\nTeam earnings {from} through {today}");
    for member in &earnings {
        println!(
            "  - {}: {}{} across {} offer(s)",
            member.member_id,
            round_money(member.amount),
            converted_suffix(member.amount, currency.as_deref(), &rates),
            member.offers.len()
        );
    }

    println!();
    let first = service.run_billing_pass(None).await?;
    print!("{}", render_billing(&first));
    let second = service.run_billing_pass(None).await?;
    print!("{}", render_billing(&second));

    let transactions = service.transactions().await?;
    println!(
        "\n{} expense line(s) posted, {} total",
        transactions.len(),
        transactions
            .iter()
            .map(|transaction| transaction.amount)
            .sum::<Decimal>()
    );

    let after = service.scan_compliance(None).await?;
    println!(
        "\nCompliance after closing Spring launch: {}% ({} gap(s) left)",
        after.compliance_rate,
        after.missing.len()
    );

    Ok(())
}

fn converted_suffix(amount: Decimal, currency: Option<&str>, rates: &RateTable) -> String {
    let Some(currency) = currency else {
        return String::new();
    };
    match rates.convert_from_base(amount, currency) {
        Ok(converted) => format!(" (~{} {})", round_money(converted), currency.to_ascii_uppercase()),
        Err(err) => format!(" ({err})"),
    }
}

pub(crate) fn render_shares(
    shares: &ShareBreakdown,
    currency: Option<&str>,
    rates: &RateTable,
) -> String {
    let mut lines = vec![format!(
        "  {} base {} x {}% = team pot {}{}",
        shares.payout_model.label(),
        round_money(shares.base),
        shares.team_pot_percent,
        round_money(shares.team_share),
        converted_suffix(shares.team_share, currency, rates)
    )];
    for participant in &shares.participants {
        lines.push(format!(
            "    {} ({}%): {}{}",
            participant.member_id,
            participant.share_percent,
            round_money(participant.amount),
            converted_suffix(participant.amount, currency, rates)
        ));
    }
    for warning in &shares.warnings {
        lines.push(format!("    warning: {}", warning.message()));
    }
    lines.join("\n") + "\n"
}
