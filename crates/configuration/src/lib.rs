use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, LoggingConfig, ReportDefaults, ServiceConfig, StorageConfig};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "traveler.toml";

/// Loads the application configuration from `traveler.toml`.
///
/// See [`load_config_from`].
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Loads the application configuration from `path`, layered with environment
/// variables.
///
/// The file is optional: every setting has a default. Environment variables
/// prefixed with `TRAVELER__` override file values, using `__` to separate
/// nesting levels (e.g. `TRAVELER__SERVICE__TIMEOUT_SECS=45`). The result is
/// validated before it is returned.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("TRAVELER")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("report.timeframes")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(
        endpoint = %config.service.endpoint,
        bucket = %config.storage.bucket,
        "Configuration loaded."
    );
    Ok(config)
}

/// Rejects settings the report cycle cannot work with.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.service.endpoint.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "service.endpoint must not be empty".to_string(),
        ));
    }
    if config.service.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "service.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.storage.bucket.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.bucket must not be empty".to_string(),
        ));
    }
    if config.report.group_by.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "report.group_by must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Asset, Timeframe};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.service.timeout_secs, 30);
        assert_eq!(config.storage.bucket, "traveler-app-uploads");
        assert_eq!(config.storage.region, "us-east-2");
        assert_eq!(config.report.scope_days, 20);
        assert_eq!(config.report.timeframes, Timeframe::ALL.to_vec());
        assert_eq!(config.report.group_by, "Group");
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            [service]
            endpoint = "http://localhost:9000/query"
            timeout_secs = 5

            [report]
            asset = "ES"
            timeframes = ["5m"]
            "#,
        );
        let config = load_config_from(file.path()).unwrap();

        assert_eq!(config.service.endpoint, "http://localhost:9000/query");
        assert_eq!(config.service.timeout().as_secs(), 5);
        assert_eq!(config.report.asset, Asset::Es);
        assert_eq!(config.report.timeframes, vec![Timeframe::M5]);
        // Untouched sections keep their defaults.
        assert_eq!(config.storage.region, "us-east-2");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let file = write_config("[service]\ntimeout_secs = 0\n");
        let err = load_config_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
