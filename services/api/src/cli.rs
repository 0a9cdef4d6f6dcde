use crate::demo::{run_demo, DemoArgs};
use crate::reports::{
    run_billing, run_compliance, run_import, BillingArgs, ComplianceArgs, ImportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use offer_ledger::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Offer Ledger",
    about = "Track offer payouts, daily entry compliance and subscription billing",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Report active offers with missing daily entries
    Compliance(ComplianceArgs),
    /// Run one subscription billing pass over a ledger snapshot
    Billing(BillingArgs),
    /// Resolve daily entries for one offer from a CSV export
    Import(ImportArgs),
    /// Walk through a seeded ledger end to end
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory ledger from a JSON snapshot
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Compliance(args) => run_compliance(args).await,
        Command::Billing(args) => run_billing(args).await,
        Command::Import(args) => run_import(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
