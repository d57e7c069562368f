//! Configuration loading and validation for `kv-check`.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/// Validated `kv-check` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// KMS key ID, ARN or alias values are encrypted under. **Required.**
    pub kms_key_id: String,

    /// Root directory of the file store under test. **Required.**
    pub store_path: String,

    /// Storage key passed to the self-test.
    #[serde(default = "default_test_key")]
    pub test_key: String,

    /// Region to use instead of the one discovered by the credential chain.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub aws_region_override: Option<String>,

    /// KMS endpoint override, e.g. a LocalStack URL.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub kms_endpoint_url: Option<String>,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_test_key() -> String {
    "kv-check".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// `FOO=` in the environment means "not set", not an empty override.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build kv-check configuration")?;

        Self::from_source(cfg)
    }

    fn from_source(cfg: config::Config) -> Result<Self> {
        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise kv-check configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.kms_key_id, "KMS_KEY_ID")?;
        ensure_non_empty(&self.store_path, "STORE_PATH")?;
        ensure_non_empty(&self.test_key, "TEST_KEY")?;
        if let Some(url) = &self.kms_endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("KMS_ENDPOINT_URL must be an http(s) URL, got {url:?}");
            }
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
