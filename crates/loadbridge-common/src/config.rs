//! Bulk submission configuration
//!
//! Endpoint, session, and polling settings for the remote bulk service. The
//! deployment environment (`LOADBRIDGE_ENV`) picks which set of instance and
//! session variables is read, so prod, dev, and test credentials can live in
//! the same `.env` file.

use crate::error::{LoadbridgeError, Result};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Bulk Configuration Constants
// ============================================================================

/// Bulk API version used when `SALESFORCE_API_VERSION` is not set.
pub const DEFAULT_API_VERSION: &str = "59.0";

/// Seconds between batch status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Seconds to wait for a batch to reach a terminal state (10 minutes).
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;

/// Per-request HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "LOADBRIDGE_ENV";

/// Deployment environment, selecting the credential variable prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployEnvironment {
    Prod,
    Dev,
    #[default]
    Test,
}

impl DeployEnvironment {
    /// Map an environment name; anything other than prod/dev is test
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "prod" | "production" => DeployEnvironment::Prod,
            "dev" | "development" => DeployEnvironment::Dev,
            _ => DeployEnvironment::Test,
        }
    }

    /// Prefix of the instance and session variables for this environment
    pub fn var_prefix(self) -> &'static str {
        match self {
            DeployEnvironment::Prod => "PROD_SALESFORCE_",
            DeployEnvironment::Dev => "DEVSF_",
            DeployEnvironment::Test => "SALESFORCE_",
        }
    }
}

impl fmt::Display for DeployEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployEnvironment::Prod => write!(f, "prod"),
            DeployEnvironment::Dev => write!(f, "dev"),
            DeployEnvironment::Test => write!(f, "test"),
        }
    }
}

/// Settings for talking to the remote bulk service
#[derive(Clone)]
pub struct BulkConfig {
    /// Environment the credentials were selected for
    pub environment: DeployEnvironment,

    /// Instance base URL, e.g. `https://acme.my.salesforce.com`
    pub instance_url: String,

    /// Already-issued session id sent with every request
    pub session_id: String,

    /// Bulk API version, e.g. "59.0"
    pub api_version: String,

    /// Delay between batch status polls
    pub poll_interval: Duration,

    /// Upper bound on waiting for a batch; `None` waits indefinitely
    pub wait_timeout: Option<Duration>,

    /// Timeout applied to each HTTP request
    pub http_timeout: Duration,
}

impl fmt::Debug for BulkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkConfig")
            .field("environment", &self.environment)
            .field("instance_url", &self.instance_url)
            .field("session_id", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("poll_interval", &self.poll_interval)
            .field("wait_timeout", &self.wait_timeout)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl BulkConfig {
    /// Load configuration from `.env` and the process environment
    ///
    /// Environment variables:
    /// - `LOADBRIDGE_ENV`: prod, dev, or anything else for test
    /// - `<PREFIX>INSTANCE_URL`: instance URL (required)
    /// - `<PREFIX>SESSION_ID`: session id (required)
    /// - `SALESFORCE_API_VERSION`: API version (default "59.0")
    /// - `BULK_POLL_INTERVAL_SECS`: poll interval (default 10)
    /// - `BULK_WAIT_TIMEOUT_SECS`: wait timeout, 0 disables (default 600)
    /// - `BULK_HTTP_TIMEOUT_SECS`: HTTP request timeout (default 300)
    ///
    /// `<PREFIX>` is `PROD_SALESFORCE_`, `DEVSF_`, or `SALESFORCE_`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(ENVIRONMENT_VAR)
            .map(|name| DeployEnvironment::from_name(&name))
            .unwrap_or_default();
        let prefix = environment.var_prefix();

        let required = |suffix: &str| {
            let key = format!("{}{}", prefix, suffix);
            lookup(&key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(LoadbridgeError::MissingVar(key))
        };

        let secs = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    LoadbridgeError::config(format!("{} must be a whole number of seconds, got '{}'", key, raw))
                }),
                None => Ok(default),
            }
        };

        let wait_timeout_secs = secs("BULK_WAIT_TIMEOUT_SECS", DEFAULT_WAIT_TIMEOUT_SECS)?;

        let config = BulkConfig {
            environment,
            instance_url: normalize_instance_url(&required("INSTANCE_URL")?),
            session_id: required("SESSION_ID")?.trim().to_string(),
            api_version: lookup("SALESFORCE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            poll_interval: Duration::from_secs(secs(
                "BULK_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            wait_timeout: (wait_timeout_secs > 0).then(|| Duration::from_secs(wait_timeout_secs)),
            http_timeout: Duration::from_secs(secs(
                "BULK_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create a builder for programmatic construction
    pub fn builder(instance_url: impl Into<String>, session_id: impl Into<String>) -> BulkConfigBuilder {
        BulkConfigBuilder {
            config: BulkConfig {
                environment: DeployEnvironment::default(),
                instance_url: normalize_instance_url(&instance_url.into()),
                session_id: session_id.into(),
                api_version: DEFAULT_API_VERSION.to_string(),
                poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
                wait_timeout: Some(Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS)),
                http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            },
        }
    }

    /// Check invariants the bulk client relies on
    pub fn validate(&self) -> Result<()> {
        if self.instance_url.is_empty() {
            return Err(LoadbridgeError::config("instance URL must not be empty"));
        }
        if self.session_id.is_empty() {
            return Err(LoadbridgeError::config("session id must not be empty"));
        }
        if self.api_version.trim().is_empty() {
            return Err(LoadbridgeError::config("API version must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(LoadbridgeError::config("poll interval must be greater than zero"));
        }
        Ok(())
    }

    /// Base URL of the asynchronous bulk endpoint, with trailing slash
    pub fn bulk_base_url(&self) -> String {
        format!("{}/services/async/{}/", self.instance_url, self.api_version)
    }
}

/// Builder for BulkConfig
pub struct BulkConfigBuilder {
    config: BulkConfig,
}

impl BulkConfigBuilder {
    pub fn environment(mut self, environment: DeployEnvironment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    /// Finish the builder, validating the result
    pub fn build(self) -> Result<BulkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Accept bare hosts ("acme.my.salesforce.com") as well as full URLs
fn normalize_instance_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_environment_selects_prefix() {
        assert_eq!(DeployEnvironment::from_name("PROD").var_prefix(), "PROD_SALESFORCE_");
        assert_eq!(DeployEnvironment::from_name("dev").var_prefix(), "DEVSF_");
        assert_eq!(DeployEnvironment::from_name("staging"), DeployEnvironment::Test);
    }

    #[test]
    fn test_from_lookup_uses_environment_prefix() {
        let config = BulkConfig::from_lookup(lookup_from(&[
            ("LOADBRIDGE_ENV", "dev"),
            ("DEVSF_INSTANCE_URL", "dev.my.salesforce.com/"),
            ("DEVSF_SESSION_ID", "00Dxx!dev"),
            ("SALESFORCE_INSTANCE_URL", "https://test.my.salesforce.com"),
            ("SALESFORCE_SESSION_ID", "00Dxx!test"),
        ]))
        .unwrap();

        assert_eq!(config.environment, DeployEnvironment::Dev);
        assert_eq!(config.instance_url, "https://dev.my.salesforce.com");
        assert_eq!(config.session_id, "00Dxx!dev");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.poll_interval, Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        assert_eq!(
            config.bulk_base_url(),
            "https://dev.my.salesforce.com/services/async/59.0/"
        );
    }

    #[test]
    fn test_missing_session_is_reported_with_variable_name() {
        let err = BulkConfig::from_lookup(lookup_from(&[(
            "SALESFORCE_INSTANCE_URL",
            "https://test.my.salesforce.com",
        )]))
        .unwrap_err();

        assert!(matches!(err, LoadbridgeError::MissingVar(ref key) if key == "SALESFORCE_SESSION_ID"));
    }

    #[test]
    fn test_zero_wait_timeout_disables_timeout() {
        let config = BulkConfig::from_lookup(lookup_from(&[
            ("SALESFORCE_INSTANCE_URL", "https://test.my.salesforce.com"),
            ("SALESFORCE_SESSION_ID", "token"),
            ("BULK_WAIT_TIMEOUT_SECS", "0"),
            ("BULK_POLL_INTERVAL_SECS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.wait_timeout, None);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = BulkConfig::from_lookup(lookup_from(&[
            ("SALESFORCE_INSTANCE_URL", "https://test.my.salesforce.com"),
            ("SALESFORCE_SESSION_ID", "token"),
            ("BULK_POLL_INTERVAL_SECS", "soon"),
        ]))
        .unwrap_err();

        assert!(matches!(err, LoadbridgeError::Config(_)));
    }

    #[test]
    fn test_builder_rejects_zero_poll_interval() {
        let result = BulkConfig::builder("https://test.my.salesforce.com", "token")
            .poll_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_session() {
        let config = BulkConfig::builder("https://test.my.salesforce.com", "super-secret")
            .build()
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
