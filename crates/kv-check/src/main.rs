//! `kv-check` — verifies a KMS-encrypted file store end to end.
//!
//! Startup sequence:
//! 1. Load and validate [`config::Config`] from environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Discover the AWS session through the default credential chain.
//! 4. Wrap a [`kv::FileStore`] in an [`awskms::AwsKmsStore`] and run its self-test.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use awskms::{session, AwsKmsStore};
use kv::{FileStore, KvService};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: kv-check configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        store_path = %cfg.store_path,
        key_id = %cfg.kms_key_id,
        "kv-check starting"
    );

    // -----------------------------------------------------------------------
    // 3. AWS session
    // -----------------------------------------------------------------------
    let aws = session::load(
        cfg.aws_region_override.as_deref(),
        cfg.kms_endpoint_url.as_deref(),
    )
    .await;

    // -----------------------------------------------------------------------
    // 4. Self-test
    // -----------------------------------------------------------------------
    let store = AwsKmsStore::with_session(&aws, FileStore::new(&cfg.store_path), &cfg.kms_key_id)
        .context("failed to construct KMS-encrypted store")?;

    store
        .test(&cfg.test_key)
        .await
        .with_context(|| format!("self-test failed for key {:?}", cfg.test_key))?;

    info!(test_key = %cfg.test_key, "self-test passed");
    Ok(())
}
