use clap::{ArgGroup, Parser};
use dashvault_client::GrafanaClient;
use dashvault_core::{CoreError, DashvaultConfig};
use dashvault_service::{BackupOrchestrator, RestoreOrchestrator, SnapshotSelector};
use dashvault_storage::ArtifactStores;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Exit code for a run that finished with per-dashboard failures.
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "dashvault")]
#[command(about = "Back up and restore dashboards of a dashboard service", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["backup", "restore", "list"]),
))]
struct Cli {
    /// Configuration file (overrides DASHVAULT_CONFIG)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Back up every dashboard into a new snapshot
    #[arg(long)]
    backup: bool,

    /// Restore SNAPSHOT, or the most recent snapshot when none is given
    #[arg(long, value_name = "SNAPSHOT", num_args = 0..=1)]
    restore: Option<Option<String>>,

    /// List the most recent snapshots
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();

    let config = DashvaultConfig::load(cli.config.as_deref())?;
    let stores = ArtifactStores::from_config(&config.backup).await?;
    let target = config.target.name.as_str();

    let clean = if cli.backup {
        let service = Arc::new(GrafanaClient::new(&config.target)?);
        let report = BackupOrchestrator::new(service, stores).run(target).await?;

        match &report.snapshot {
            Some(snapshot) => println!(
                "Backed up {} dashboards to {} ({} artifacts written, {} failures)",
                report.dashboards, snapshot, report.artifacts_written, report.failures
            ),
            None => println!("No dashboards to back up for {}", target),
        }
        report.is_clean()
    } else if let Some(requested) = cli.restore {
        let service = Arc::new(GrafanaClient::new(&config.target)?);
        let report = RestoreOrchestrator::new(service, stores, config.restore.clone())
            .run(target, requested.as_deref())
            .await?;

        println!(
            "Restored {} dashboards from {} ({} failed)",
            report.restored, report.snapshot, report.failed
        );
        for failure in &report.failures {
            println!("  {} [{}]: {}", failure.key, failure.failed_at, failure.error);
        }
        report.is_clean()
    } else {
        let (kind, store) = stores.primary().ok_or_else(|| {
            CoreError::ValidationError("no artifact store is enabled".to_string())
        })?;
        let snapshots = SnapshotSelector::new(store.clone())
            .list_recent(target, config.restore.recent_snapshots)
            .await?;

        info!(target = %target, store = %kind, found = snapshots.len(), "Listed snapshots");
        if snapshots.is_empty() {
            println!("No snapshots for {}", target);
        }
        for snapshot in &snapshots {
            println!("{}  {}", snapshot.last_modified.to_rfc3339(), snapshot.name);
        }
        true
    };

    if !clean {
        error!(target = %target, "Finished with failures");
        std::process::exit(EXIT_PARTIAL_FAILURE);
    }

    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_restore_with_and_without_snapshot() {
        let cli = Cli::try_parse_from(["dashvault", "--restore"]).unwrap();
        assert_eq!(cli.restore, Some(None));

        let cli = Cli::try_parse_from(["dashvault", "--restore", "2024-05-01T00-00-00.000Z"]).unwrap();
        assert_eq!(cli.restore, Some(Some("2024-05-01T00-00-00.000Z".to_string())));
        assert!(!cli.backup);
    }

    #[test]
    fn test_modes_are_exclusive_and_required() {
        let err = Cli::try_parse_from(["dashvault", "--backup", "--list"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from(["dashvault"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::try_parse_from(["dashvault", "--config", "prod.toml", "--backup"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("prod.toml")));
        assert!(cli.backup);
    }
}
