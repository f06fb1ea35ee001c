//! Ledger audit binary
//!
//! Recomputes every vote count and balance from its log and prints the
//! report as JSON. Pass `--repair` to rewrite drifted vote counts.

use anyhow::Context;
use tally_core::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let repair = std::env::args().skip(1).any(|arg| arg == "--repair");

    let config = match std::env::var("TALLY_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("loading config from environment")?,
    };

    tracing::info!(data_dir = ?config.data_dir, repair, "Starting ledger audit");

    let ledger = Ledger::open(config).context("opening ledger")?;
    let report = ledger.audit_all(repair).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_clean() {
        anyhow::bail!(
            "{} target(s) and {} account(s) out of balance",
            report.target_drift.len() - report.repaired.len(),
            report.account_drift.len()
        );
    }

    tracing::info!(
        targets = report.targets_checked,
        accounts = report.accounts_checked,
        "Ledger consistent"
    );
    Ok(())
}
