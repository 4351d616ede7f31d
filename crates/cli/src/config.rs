//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Root directory for raw snapshots
    #[serde(default = "default_snapshots_dir")]
    pub snapshots_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout applied to every outbound HTTP request
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            snapshots_dir: default_snapshots_dir(),
            log_level: default_log_level(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Backend: rest, sqlite, or memory
    #[serde(default = "default_backend")]
    pub backend: String,

    /// REST endpoint base URL (rest backend)
    #[serde(default)]
    pub endpoint: String,

    /// Env var holding the service role key (rest backend)
    #[serde(default = "default_service_role_key_env")]
    pub service_role_key_env: String,

    /// Database file (sqlite backend)
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: String::new(),
            service_role_key_env: default_service_role_key_env(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// One watched source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Stable identifier, used in snapshot file names
    pub id: String,

    /// Fetch family: legislation, catalog, or department
    pub family: String,

    /// Scoring tier: FRL_ACT, FRL_REGS, HOMEAFFAIRS_PAGE, DATAGOV_DATASET
    pub source_type: String,

    /// URL to fetch, or a CKAN dataset id for the catalog family
    pub locator: String,

    /// Identity key for latest-document lookups
    pub canonical_url: String,

    #[serde(default)]
    pub title: Option<String>,

    /// ISO date the instrument takes effect, when known
    #[serde(default)]
    pub effective_from: Option<String>,
}

// Default value functions
fn default_snapshots_dir() -> PathBuf {
    PathBuf::from("./kb/snapshots")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_backend() -> String {
    "rest".to_string()
}

fn default_service_role_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".to_string()
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./regwatch.sqlite")
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("REGWATCH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# regwatch configuration

[general]
snapshots_dir = "./kb/snapshots"
log_level = "info"
http_timeout_secs = 30

[repository]
# Backend: rest (Supabase), sqlite (local file), or memory (nothing persisted)
backend = "rest"
endpoint = "https://your-project.supabase.co"
service_role_key_env = "SUPABASE_SERVICE_ROLE_KEY"
sqlite_path = "./regwatch.sqlite"

# One [[sources]] entry per watched source.
# family: legislation | catalog | department
# source_type: FRL_ACT | FRL_REGS | HOMEAFFAIRS_PAGE | DATAGOV_DATASET

[[sources]]
id = "frl_migration_act"
family = "legislation"
source_type = "FRL_ACT"
locator = "https://www.legislation.gov.au/C1958A00062/latest/text"
canonical_url = "https://www.legislation.gov.au/C1958A00062"
title = "Migration Act 1958"

[[sources]]
id = "frl_migration_regulations"
family = "legislation"
source_type = "FRL_REGS"
locator = "https://www.legislation.gov.au/F1996B03551/latest/text"
canonical_url = "https://www.legislation.gov.au/F1996B03551"
title = "Migration Regulations 1994"

[[sources]]
id = "homeaffairs_student_500"
family = "department"
source_type = "HOMEAFFAIRS_PAGE"
locator = "https://immi.homeaffairs.gov.au/visas/getting-a-visa/visa-listing/student-500"
canonical_url = "https://immi.homeaffairs.gov.au/visas/getting-a-visa/visa-listing/student-500"
title = "Student visa (subclass 500)"

[[sources]]
id = "datagov_visa_statistics"
family = "catalog"
source_type = "DATAGOV_DATASET"
locator = "visa-statistics"
canonical_url = "https://data.gov.au/dataset/visa-statistics"
title = "Visa statistics"
"#
        .to_string()
    }
}
