//! AWS session discovery for the composition root.
//!
//! The store itself never discovers credentials unless asked to through
//! [`AwsKmsStore::new`](crate::AwsKmsStore::new); everything else receives a
//! resolved [`SdkConfig`] or a ready [`KmsClient`](crate::KmsClient).

use aws_config::{BehaviorVersion, Region, SdkConfig};
use kv::KvError;
use tracing::debug;

/// Load the default session through the standard AWS credential chain
/// (environment, profile, web identity, ECS/IMDS).
pub async fn load_default() -> SdkConfig {
    load(None, None).await
}

/// Load a session, optionally overriding the region and the endpoint URL.
///
/// The endpoint override is meant for KMS emulators such as LocalStack.
pub async fn load(region: Option<&str>, endpoint_url: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_owned()));
    }
    if let Some(url) = endpoint_url {
        loader = loader.endpoint_url(url);
    }
    let session = loader.load().await;
    debug!(
        region = session.region().map(|r| r.as_ref()),
        endpoint_url = session.endpoint_url(),
        "aws session loaded"
    );
    session
}

/// Check that `session` can sign KMS requests.
///
/// # Errors
///
/// Returns [`KvError::Session`] if no region or no credentials provider was
/// resolved.
pub fn validate(session: &SdkConfig) -> Result<(), KvError> {
    if session.region().is_none() {
        return Err(KvError::Session("no AWS region resolved".into()));
    }
    if session.credentials_provider().is_none() {
        return Err(KvError::Session("no AWS credentials provider resolved".into()));
    }
    Ok(())
}
