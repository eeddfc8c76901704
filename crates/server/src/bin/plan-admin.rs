//! Offline admin tool for Scopeline snapshots.
//!
//! Runs hierarchy repair and integrity checks directly against a snapshot
//! file, without the API server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plan::store::snapshot;
use plan::HierarchyManager;

#[derive(Parser)]
#[command(name = "plan-admin", about = "Scopeline snapshot maintenance", version)]
struct Cli {
    /// Snapshot file to operate on
    #[arg(long, env = "SNAPSHOT_PATH", default_value = "data/scopeline.json")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Repair duplicate sibling titles and save the snapshot
    Reconcile,
    /// Report integrity issues without modifying anything
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let store = snapshot::load(&cli.snapshot)
        .await
        .with_context(|| format!("failed to load snapshot from {}", cli.snapshot.display()))?;
    let store = Arc::new(store);
    let hierarchy = HierarchyManager::new(store.clone());
    println!(
        "Loaded {} tasks from {}",
        store.task_count(),
        cli.snapshot.display()
    );

    match cli.command {
        Command::Reconcile => {
            let report = hierarchy.reconcile_duplicates();
            println!(
                "Reconciled {} duplicate group(s), renamed {} task(s)",
                report.groups, report.renamed
            );
            if report.renamed > 0 {
                snapshot::save(&store, &cli.snapshot)
                    .await
                    .context("failed to save snapshot")?;
                println!("Snapshot saved");
            }
        }
        Command::Check => {
            let issues = hierarchy.integrity_issues();
            if issues.is_empty() {
                println!("No integrity issues found");
            } else {
                println!("{} issue(s) found:", issues.len());
                for issue in &issues {
                    println!("  - {issue}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
