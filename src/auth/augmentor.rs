// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Post-validation claims augmentation
//!
//! Runs once per successful token validation, before the session cookie is written:
//!
//! 1. The post-login redirect target is reduced to path + query when absolute, so a
//!    crafted `redirect_uri` can never bounce the user to another host.
//! 2. A new identity holding the supplementary claims of the configured
//!    [`ClaimsMapper`] is appended to the principal. Provider identities are kept.
//! 3. The user directory is synchronized through the injected [`UserSynchronizer`],
//!    and the call is awaited so the session only exists for a synchronized user.

use std::sync::Arc;

use log::{debug, warn};
use url::Url;

use super::claims::ClaimsIdentity;
use super::claims_mapping::ClaimsMapper;
use super::context::AuthenticationContext;
use super::sync::{SyncError, UserSynchronizer};

pub struct ClaimsAugmentor {
    mapper: Arc<dyn ClaimsMapper>,
    synchronizer: Arc<dyn UserSynchronizer>,
}

impl ClaimsAugmentor {
    pub fn new(mapper: Arc<dyn ClaimsMapper>, synchronizer: Arc<dyn UserSynchronizer>) -> Self {
        Self {
            mapper,
            synchronizer,
        }
    }

    /// Augment the principal of a validated context and synchronize the user
    ///
    /// # Errors
    ///
    /// Synchronization failures are returned as-is; nothing is retried.
    pub async fn augment(&self, ctx: &mut AuthenticationContext) -> Result<(), SyncError> {
        let Some(principal) = ctx.principal.as_mut() else {
            warn!("Token validated without a principal, skipping claims augmentation and user synchronization");
            return Ok(());
        };

        if let Some(redirect_uri) = ctx.properties.redirect_uri.as_mut() {
            if let Some(local) = normalize_redirect_uri(redirect_uri) {
                debug!("Post-login redirect {} reduced to {}", redirect_uri, local);
                *redirect_uri = local;
            }
        }

        let claims = self.mapper.supplementary_claims(principal);
        debug!("Adding identity with {} supplementary claims", claims.len());
        principal.add_identity(ClaimsIdentity::from_claims(claims));

        if let Some(identity) = principal.identity() {
            self.synchronizer.synchronize(identity).await?;
        }
        Ok(())
    }
}

const LOCAL_BASE: &str = "http://local.invalid/";

/// Reduce an absolute URI to its path and query
///
/// Network-path references (`//host/...`, and their backslash spellings that
/// browsers read the same way) name another host too and are reduced as well.
/// Returns `None` when the value is empty or a local relative reference, meaning it
/// should be kept.
pub fn normalize_redirect_uri(redirect_uri: &str) -> Option<String> {
    if redirect_uri.is_empty() {
        return None;
    }
    let url = match Url::parse(redirect_uri) {
        Ok(url) => url,
        Err(_) => {
            let base = Url::parse(LOCAL_BASE).ok()?;
            let Ok(resolved) = base.join(redirect_uri) else {
                return Some("/".to_string());
            };
            if resolved.host_str() == base.host_str() {
                return None;
            }
            resolved
        }
    };
    Some(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{Claim, ClaimsPrincipal, ROLE_CLAIM_TYPE};
    use crate::auth::claims_mapping::StaticRoleMapper;
    use crate::auth::context::AuthenticationProperties;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSynchronizer {
        calls: Mutex<Vec<ClaimsIdentity>>,
    }

    #[async_trait]
    impl UserSynchronizer for RecordingSynchronizer {
        async fn synchronize(&self, identity: &ClaimsIdentity) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push(identity.clone());
            Ok(())
        }
    }

    struct FailingSynchronizer;

    #[async_trait]
    impl UserSynchronizer for FailingSynchronizer {
        async fn synchronize(&self, _identity: &ClaimsIdentity) -> Result<(), SyncError> {
            Err(SyncError::Status {
                status: 503,
                body: "directory offline".to_string(),
            })
        }
    }

    fn provider_principal() -> ClaimsPrincipal {
        ClaimsPrincipal::new(ClaimsIdentity::authenticated(
            "OpenIdConnect",
            vec![Claim::new("sub", "00u1"), Claim::new("name", "Jane")],
            "name",
            ROLE_CLAIM_TYPE,
        ))
    }

    fn augmentor(sync: Arc<dyn UserSynchronizer>) -> ClaimsAugmentor {
        ClaimsAugmentor::new(Arc::new(StaticRoleMapper::default()), sync)
    }

    #[test]
    fn test_normalize_redirect_uri() {
        assert_eq!(
            normalize_redirect_uri("https://example.com/dashboard?x=1").as_deref(),
            Some("/dashboard?x=1")
        );
        assert_eq!(
            normalize_redirect_uri("https://localhost:5000/account").as_deref(),
            Some("/account")
        );
        assert_eq!(normalize_redirect_uri("https://example.com").as_deref(), Some("/"));
        assert_eq!(normalize_redirect_uri("/account?tab=2"), None);
        assert_eq!(normalize_redirect_uri("account"), None);
        assert_eq!(normalize_redirect_uri(""), None);
    }

    #[test]
    fn test_network_path_references_are_reduced() {
        assert_eq!(
            normalize_redirect_uri("//evil.com/account").as_deref(),
            Some("/account")
        );
        assert_eq!(
            normalize_redirect_uri("/\\evil.com/account?tab=2").as_deref(),
            Some("/account?tab=2")
        );
        assert_eq!(
            normalize_redirect_uri("\\\\evil.com/account").as_deref(),
            Some("/account")
        );
        assert_eq!(normalize_redirect_uri("//evil.com").as_deref(), Some("/"));
        assert_eq!(normalize_redirect_uri("//[evil").as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn test_augment_adds_role_identity_and_keeps_existing_claims() {
        let sync = Arc::new(RecordingSynchronizer::default());
        let mut ctx = AuthenticationContext::for_token_validated(
            Some(provider_principal()),
            AuthenticationProperties::with_redirect_uri("https://localhost:5000/account"),
        );
        let before: Vec<Claim> = provider_principal().claims().cloned().collect();

        augmentor(sync.clone()).augment(&mut ctx).await.unwrap();

        let principal = ctx.principal.as_ref().unwrap();
        assert_eq!(ctx.properties.redirect_uri.as_deref(), Some("/account"));
        assert_eq!(principal.identities.len(), 2);
        assert_eq!(principal.identities[1].claims, vec![Claim::role("WebAdmins")]);
        assert!(principal.has_claim(ROLE_CLAIM_TYPE, "WebAdmins"));
        for claim in &before {
            assert!(principal.claims().any(|c| c == claim));
        }

        let calls = sync.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].find_first("sub"), Some("00u1"));
    }

    #[tokio::test]
    async fn test_relative_redirect_is_kept() {
        let sync = Arc::new(RecordingSynchronizer::default());
        let mut ctx = AuthenticationContext::for_token_validated(
            Some(provider_principal()),
            AuthenticationProperties::with_redirect_uri("/cms?page=3"),
        );

        augmentor(sync).augment(&mut ctx).await.unwrap();
        assert_eq!(ctx.properties.redirect_uri.as_deref(), Some("/cms?page=3"));
    }

    #[tokio::test]
    async fn test_missing_principal_skips_everything() {
        let sync = Arc::new(RecordingSynchronizer::default());
        let mut ctx = AuthenticationContext::for_token_validated(
            None,
            AuthenticationProperties::with_redirect_uri("https://localhost:5000/account"),
        );

        augmentor(sync.clone()).augment(&mut ctx).await.unwrap();

        assert!(ctx.principal.is_none());
        assert_eq!(
            ctx.properties.redirect_uri.as_deref(),
            Some("https://localhost:5000/account")
        );
        assert!(sync.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_running_twice_adds_two_identities() {
        let sync = Arc::new(RecordingSynchronizer::default());
        let augmentor = augmentor(sync.clone());
        let mut ctx = AuthenticationContext::for_token_validated(
            Some(provider_principal()),
            AuthenticationProperties::default(),
        );

        augmentor.augment(&mut ctx).await.unwrap();
        augmentor.augment(&mut ctx).await.unwrap();

        let principal = ctx.principal.unwrap();
        let role_identities = principal
            .identities
            .iter()
            .filter(|i| i.has_claim(ROLE_CLAIM_TYPE, "WebAdmins"))
            .count();
        assert_eq!(role_identities, 2);
        assert_eq!(sync.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_failure_propagates_after_claims_were_added() {
        let mut ctx = AuthenticationContext::for_token_validated(
            Some(provider_principal()),
            AuthenticationProperties::default(),
        );

        let err = augmentor(Arc::new(FailingSynchronizer))
            .augment(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Status { status: 503, .. }));
        assert_eq!(ctx.principal.unwrap().identities.len(), 2);
    }
}
