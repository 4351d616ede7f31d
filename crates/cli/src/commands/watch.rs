//! Watch command - run configured sources through the pipeline once

use anyhow::{Context, Result, bail};
use regwatch_adapters::{
    fetch::{CatalogFetcher, DepartmentFetcher, LegislationFetcher},
    repository::{InMemoryDocumentRepository, RestDocumentRepository, SqliteDocumentRepository},
};
use regwatch_domain::{
    ContentFetcher, DocumentRepository, SourceType, SystemClock,
    snapshot::SnapshotStore,
    usecases::{WatchPipeline, WatchSource},
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::WatchArgs;
use crate::config::{AppConfig, SourceEntry};

pub async fn execute(args: WatchArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let entries = select_sources(&config, args.source.as_deref())?;

    tracing::info!(
        dry_run = args.dry_run,
        backend = %config.repository.backend,
        source_count = entries.len(),
        "Starting regwatch run"
    );

    // Build dependencies
    let repository = build_repository(&config, args.dry_run).await?;
    let snapshots = SnapshotStore::new(&config.general.snapshots_dir);
    let clock = Arc::new(SystemClock);
    let timeout = Duration::from_secs(config.general.http_timeout_secs);

    let total = entries.len();
    let mut failures = 0usize;
    for entry in entries {
        let source = watch_source_from_entry(entry)?;
        let fetcher = build_fetcher(&entry.family, timeout)?;
        let pipeline = WatchPipeline::new(
            Arc::clone(&repository),
            fetcher,
            snapshots.clone(),
            Arc::clone(&clock),
        );

        match pipeline.run(&source).await {
            Ok(outcome) => {
                tracing::info!(
                    source_id = %source.source_id,
                    document_id = ?outcome.document_id,
                    change_event_id = ?outcome.change_event_id,
                    impact_score = outcome.impact_score,
                    requires_review = outcome.requires_review,
                    snapshot = %outcome.snapshot.snapshot_path.display(),
                    "Watch run complete"
                );
            }
            Err(e) => {
                failures += 1;
                tracing::error!(source_id = %source.source_id, error = %e, "Watch run failed");
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} watch runs failed", failures, total);
    }

    tracing::info!("regwatch run completed");
    Ok(())
}

fn select_sources<'a>(
    config: &'a AppConfig,
    source_id: Option<&str>,
) -> Result<Vec<&'a SourceEntry>> {
    if config.sources.is_empty() {
        bail!("No sources configured. Add [[sources]] entries to the config file.");
    }

    match source_id {
        Some(id) => {
            let entry = config
                .sources
                .iter()
                .find(|entry| entry.id == id)
                .with_context(|| {
                    let known: Vec<&str> =
                        config.sources.iter().map(|e| e.id.as_str()).collect();
                    format!("Unknown source id '{}'. Configured sources: {:?}", id, known)
                })?;
            Ok(vec![entry])
        }
        None => Ok(config.sources.iter().collect()),
    }
}

fn watch_source_from_entry(entry: &SourceEntry) -> Result<WatchSource> {
    let source_type: SourceType = entry
        .source_type
        .parse()
        .with_context(|| format!("Source '{}' has an invalid source_type", entry.id))?;

    Ok(WatchSource {
        source_id: entry.id.clone(),
        locator: entry.locator.clone(),
        canonical_url: entry.canonical_url.clone(),
        title: entry.title.clone(),
        source_type,
        effective_from: entry.effective_from.clone(),
    })
}

async fn build_repository(
    config: &AppConfig,
    dry_run: bool,
) -> Result<Arc<dyn DocumentRepository>> {
    if dry_run {
        tracing::info!("[DRY RUN] Using in-memory repository; nothing will be persisted");
        return Ok(Arc::new(InMemoryDocumentRepository::new()));
    }

    match config.repository.backend.as_str() {
        "rest" => {
            if config.repository.endpoint.trim().is_empty() {
                bail!("repository.endpoint must be set for the rest backend");
            }
            let key = load_service_key(&config.repository.service_role_key_env)?;
            Ok(Arc::new(RestDocumentRepository::new(
                config.repository.endpoint.clone(),
                key,
            )))
        }
        "sqlite" => {
            let store = SqliteDocumentRepository::new(&config.repository.sqlite_path)
                .await
                .context("Failed to initialize SQLite repository")?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(InMemoryDocumentRepository::new())),
        other => bail!(
            "Invalid repository backend: {}. Expected one of: rest, sqlite, memory",
            other
        ),
    }
}

fn build_fetcher(family: &str, timeout: Duration) -> Result<Arc<dyn ContentFetcher>> {
    match family {
        "legislation" => Ok(Arc::new(LegislationFetcher::new(timeout))),
        "catalog" => Ok(Arc::new(CatalogFetcher::new(timeout))),
        "department" => Ok(Arc::new(DepartmentFetcher::new(timeout))),
        other => bail!(
            "Unknown source family '{}'. Expected one of: legislation, catalog, department",
            other
        ),
    }
}

pub(crate) fn load_service_key(env_var: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No service role key env var configured");
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing service role key env var {}", env_var))?;

    if key.trim().is_empty() {
        bail!("Service role key env var {} is empty", env_var);
    }

    Ok(SecretString::new(key.into()))
}
