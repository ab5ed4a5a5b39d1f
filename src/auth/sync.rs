// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! User directory synchronization bridge
//!
//! After a successful login the CMS user directory is brought in line with the
//! identity that just signed in. The directory service is external; this module
//! only defines the call made to it ([`UserSynchronizer`]) and two implementations:
//!
//! - [`HttpUserSynchronizer`] posts the identity as JSON to a configured endpoint.
//! - [`LoggingUserSynchronizer`] is used when no endpoint is configured.
//!
//! The synchronizer is injected into the claims augmentor at construction time.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::claims::{Claim, ClaimsIdentity};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("user synchronization request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("user synchronization endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Single asynchronous call to the external user directory
#[async_trait]
pub trait UserSynchronizer: Send + Sync {
    async fn synchronize(&self, identity: &ClaimsIdentity) -> Result<(), SyncError>;
}

/// Synchronizer that only records the call in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingUserSynchronizer;

#[async_trait]
impl UserSynchronizer for LoggingUserSynchronizer {
    async fn synchronize(&self, identity: &ClaimsIdentity) -> Result<(), SyncError> {
        info!(
            "No user directory endpoint configured, skipping synchronization of {:?}",
            identity.name()
        );
        Ok(())
    }
}

/// JSON payload sent to the directory service
#[derive(Debug, Serialize)]
pub struct SyncPayload<'a> {
    pub name: Option<&'a str>,
    pub authentication_type: Option<&'a str>,
    pub role_claim_type: &'a str,
    pub claims: &'a [Claim],
    pub signed_in_at: DateTime<Utc>,
}

impl<'a> From<&'a ClaimsIdentity> for SyncPayload<'a> {
    fn from(identity: &'a ClaimsIdentity) -> Self {
        Self {
            name: identity.name(),
            authentication_type: identity.authentication_type.as_deref(),
            role_claim_type: &identity.role_claim_type,
            claims: &identity.claims,
            signed_in_at: Utc::now(),
        }
    }
}

/// Posts identities to an HTTP directory service
#[derive(Debug, Clone)]
pub struct HttpUserSynchronizer {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpUserSynchronizer {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl UserSynchronizer for HttpUserSynchronizer {
    async fn synchronize(&self, identity: &ClaimsIdentity) -> Result<(), SyncError> {
        debug!("Synchronizing {:?} with {}", identity.name(), self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&SyncPayload::from(identity))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::ROLE_CLAIM_TYPE;

    #[test]
    fn test_payload_borrows_identity_fields() {
        let identity = ClaimsIdentity::authenticated(
            "OpenIdConnect",
            vec![Claim::new("name", "Jane"), Claim::role("Editors")],
            "name",
            ROLE_CLAIM_TYPE,
        );
        let json = serde_json::to_value(SyncPayload::from(&identity)).unwrap();

        assert_eq!(json["name"], "Jane");
        assert_eq!(json["authentication_type"], "OpenIdConnect");
        assert_eq!(json["claims"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["claims"][1]["value"], "Editors");
        assert!(json["signed_in_at"].is_string());
    }

    #[tokio::test]
    async fn test_logging_synchronizer_always_succeeds() {
        let identity = ClaimsIdentity::default();
        assert!(LoggingUserSynchronizer.synchronize(&identity).await.is_ok());
    }
}
