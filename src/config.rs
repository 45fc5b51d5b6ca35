use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_OBSERVATIONS_URL: &str = "https://crimproject.org/data/observations";
pub const DEFAULT_RELATIONSHIPS_URL: &str = "https://crimproject.org/data/relationships/";

// ---------------------------------------------------------------------------
// config.toml
// ---------------------------------------------------------------------------

/// Viewer configuration. Every key is optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataSection,
    pub export: ExportSection,
    pub logging: LoggingSection,
}

/// `[data]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub observations_url: String,
    pub relationships_url: String,
    /// Local snapshots replacing the HTTP fetch.
    pub observations_file: Option<PathBuf>,
    pub relationships_file: Option<PathBuf>,
    /// Seconds a fetched dataset stays cached; 0 keeps it until refreshed.
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            observations_url: DEFAULT_OBSERVATIONS_URL.to_string(),
            relationships_url: DEFAULT_RELATIONSHIPS_URL.to_string(),
            observations_file: None,
            relationships_file: None,
            cache_ttl_secs: 3600,
            request_timeout_secs: 30,
        }
    }
}

impl DataSection {
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `[export]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub default_file_name: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            default_file_name: "crim_observations.csv".to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `env_logger` filter string, e.g. `"info"` or `"crim_viewer=debug"`.
    pub level: Option<String>,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_toml(&text).with_context(|| format!("in config {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.data.observations_file.is_none() && self.data.observations_url.trim().is_empty() {
            bail!("[data] needs observations_url or observations_file");
        }
        if self.data.relationships_file.is_none() && self.data.relationships_url.trim().is_empty() {
            bail!("[data] needs relationships_url or relationships_file");
        }
        if self.data.request_timeout_secs == 0 {
            bail!("[data] request_timeout_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.data.observations_url, DEFAULT_OBSERVATIONS_URL);
        assert_eq!(c.data.cache_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(c.export.default_file_name, "crim_observations.csv");
        assert!(c.logging.level.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = Config::from_toml(
            r#"
            [data]
            cache_ttl_secs = 0
            observations_file = "snapshots/observations.parquet"

            [logging]
            level = "debug"

            [future]
            ignored = true
            "#,
        )
        .unwrap();
        assert_eq!(c.data.cache_ttl(), None);
        assert_eq!(
            c.data.observations_file,
            Some(PathBuf::from("snapshots/observations.parquet"))
        );
        assert_eq!(c.data.relationships_url, DEFAULT_RELATIONSHIPS_URL);
        assert_eq!(c.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml("[data]\nobservations_url = \"\"").is_err());
        assert!(Config::from_toml("[data]\nrequest_timeout_secs = 0").is_err());
        assert!(Config::from_toml("[data]\ncache_ttl_secs = \"soon\"").is_err());
    }
}
