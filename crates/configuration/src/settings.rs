use core_types::{Asset, Timeframe};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub report: ReportDefaults,
    pub logging: LoggingConfig,
}

/// Where and how to reach the remote analytics service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Full URL the query payload is POSTed to.
    pub endpoint: String,
    /// Upper bound on a single query round-trip, in seconds.
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://5c9t51huga.execute-api.us-east-2.amazonaws.com/prod/query"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

/// Object storage that raw feed files are uploaded into.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "traveler-app-uploads".to_string(),
            region: "us-east-2".to_string(),
        }
    }
}

/// Values used when the analyst does not supply them on the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportDefaults {
    pub asset: Asset,
    pub timeframes: Vec<Timeframe>,
    /// Look-back window, in days.
    pub scope_days: u32,
    /// Result column that partitions the report into sheets.
    pub group_by: String,
    /// Directory the workbook is written to.
    pub output_dir: PathBuf,
}

impl Default for ReportDefaults {
    fn default() -> Self {
        Self {
            asset: Asset::Nq,
            timeframes: Timeframe::ALL.to_vec(),
            scope_days: 20,
            group_by: "Group".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// When set, logs go to a daily rolling file here instead of stdout.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}
