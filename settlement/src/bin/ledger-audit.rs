//! Ledger audit binary
//!
//! Opens the configured ledger store, reconciles it and prints the report as
//! JSON. Exits with status 1 when any check fails.
//!
//! Usage: `ledger-audit [config.toml]` (environment variables otherwise)

use anyhow::Context;
use ledger_core::open_store;
use settlement::{reconcile, Config};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };

    tracing::info!(
        service = %config.service_name,
        backend = ?config.store.backend,
        data_dir = %config.store.data_dir.display(),
        "Starting ledger audit"
    );

    let store = open_store(&config.store).context("opening ledger store")?;
    let report = reconcile(store.as_ref(), config.limits.max_payouts)?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_consistent() {
        for violation in &report.violations {
            tracing::error!(%violation, "Reconciliation check failed");
        }
        std::process::exit(1);
    }

    tracing::info!("Ledger consistent");
    Ok(())
}
