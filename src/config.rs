//! Engine configuration.
//!
//! Every tunable of the resolution pipeline lives here with the defaults the
//! content script shipped with. The CLI overrides individual fields.

use crate::error::{Result, ScholarIfError};
use std::path::PathBuf;
use std::time::Duration;

/// CrossRef REST API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.crossref.org";

/// File name of the bundled journal dataset
pub const DATASET_FILE_NAME: &str = "data.json";

/// Configuration for the resolver, scheduler and engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the bibliographic API (no trailing `/works`)
    pub api_base_url: String,
    /// Number of top matches requested per title query
    pub rows: u32,
    /// Per-attempt timeout
    pub request_timeout: Duration,
    /// Additional attempts after the first failed one
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Maximum in-flight metadata lookups
    pub max_concurrent: usize,
    /// Polite pool e-mail for CrossRef
    pub mailto: Option<String>,
    /// Skip rows whose title or journal contains Hangul
    pub skip_hangul: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            rows: 3,
            request_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            max_concurrent: 3,
            mailto: None,
            skip_hangul: true,
        }
    }
}

impl EngineConfig {
    /// Check values that would otherwise stall or misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(ScholarIfError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.rows == 0 {
            return Err(ScholarIfError::Config("rows must be at least 1".to_string()));
        }
        url::Url::parse(&self.api_base_url).map_err(|e| {
            ScholarIfError::Config(format!("Invalid API base URL '{}': {}", self.api_base_url, e))
        })?;
        Ok(())
    }

    /// User agent sent with every metadata request
    pub fn user_agent(&self) -> String {
        match &self.mailto {
            Some(email) => format!("scholarif/{} (mailto:{})", env!("CARGO_PKG_VERSION"), email),
            None => format!("scholarif/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Default dataset location: `$DATA_DIR/scholarif/data.json`, or `./data.json`
/// when the platform has no data directory.
pub fn default_dataset_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("scholarif").join(DATASET_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATASET_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rows, 3);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = EngineConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScholarIfError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = EngineConfig {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_user_agent_with_mailto() {
        let config = EngineConfig {
            mailto: Some("me@example.com".to_string()),
            ..Default::default()
        };
        assert!(config.user_agent().ends_with("(mailto:me@example.com)"));
    }

    #[test]
    fn test_default_dataset_path_file_name() {
        assert!(default_dataset_path().ends_with(DATASET_FILE_NAME));
    }
}
