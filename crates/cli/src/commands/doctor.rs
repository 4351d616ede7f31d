//! Doctor command - validate configuration and show status
//!
//! Offline checks only: nothing here touches the network, so it is safe
//! to run on a box that cannot reach the store or the watched sources.

use anyhow::Result;
use regwatch_domain::SourceType;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::commands::watch::load_service_key;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    sources: CheckResult,
    snapshots: CheckResult,
    repository: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        sources: CheckResult::error("Not checked"),
        snapshots: CheckResult::error("Not checked"),
        repository: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.sources = check_sources(config);
        report.snapshots = check_snapshots(config);
        report.repository = check_repository(config);
    }

    let checks = [
        &report.config,
        &report.sources,
        &report.snapshots,
        &report.repository,
    ];
    report.overall = if checks.iter().any(|c| c.is_error()) {
        "error".to_string()
    } else {
        "ok".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_sources(config: &AppConfig) -> CheckResult {
    if config.sources.is_empty() {
        return CheckResult::warn("No sources configured");
    }

    let mut problems = Vec::new();
    for entry in &config.sources {
        if entry.source_type.parse::<SourceType>().is_err() {
            problems.push(format!(
                "source '{}': invalid source_type '{}'",
                entry.id, entry.source_type
            ));
        }
        if !matches!(entry.family.as_str(), "legislation" | "catalog" | "department") {
            problems.push(format!(
                "source '{}': unknown family '{}'",
                entry.id, entry.family
            ));
        }
    }

    if problems.is_empty() {
        CheckResult::ok(format!("{} sources configured", config.sources.len()))
    } else {
        CheckResult::error(problems.join("; "))
    }
}

fn check_snapshots(config: &AppConfig) -> CheckResult {
    match std::fs::create_dir_all(&config.general.snapshots_dir) {
        Ok(()) => CheckResult::ok(format!(
            "Snapshot root writable: {}",
            config.general.snapshots_dir.display()
        )),
        Err(e) => CheckResult::error(format!(
            "Cannot create snapshot root {}: {}",
            config.general.snapshots_dir.display(),
            e
        )),
    }
}

fn check_repository(config: &AppConfig) -> CheckResult {
    match config.repository.backend.as_str() {
        "rest" => {
            if config.repository.endpoint.trim().is_empty() {
                return CheckResult::error("repository.endpoint is not set");
            }
            match load_service_key(&config.repository.service_role_key_env) {
                Ok(_) => CheckResult::ok(format!(
                    "REST backend configured: {}",
                    config.repository.endpoint
                )),
                Err(e) => CheckResult::error(e.to_string()),
            }
        }
        "sqlite" => CheckResult::ok(format!(
            "SQLite backend: {}",
            config.repository.sqlite_path.display()
        )),
        "memory" => CheckResult::warn("Memory backend: nothing will be persisted"),
        other => CheckResult::error(format!(
            "Invalid repository backend: {}. Expected one of: rest, sqlite, memory",
            other
        )),
    }
}

fn print_report(report: &DoctorReport) {
    println!("regwatch doctor");
    println!();
    print_check("config", &report.config);
    print_check("sources", &report.sources);
    print_check("snapshots", &report.snapshots);
    print_check("repository", &report.repository);
    println!();
    println!("overall: {}", report.overall);
}

fn print_check(name: &str, check: &CheckResult) {
    println!("  {:<12} [{}] {}", name, check.status, check.message);
}
