// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Flow driver tests without the HTTP layer

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_cms_oidc::auth::claims::{Claim, ClaimsIdentity, ClaimsPrincipal, ROLE_CLAIM_TYPE};
use rust_cms_oidc::auth::flow::{
    CallbackOutcome, CallbackParams, ChallengeOutcome, ChallengeRequest, Handshake,
};
use rust_cms_oidc::auth::sync::{SyncError, UserSynchronizer};
use rust_cms_oidc::auth::{build_events, oidc_settings, AuthError, OidcHandler};
use rust_cms_oidc::config::Config;
use rust_cms_oidc::provider::{CodeExchange, ExchangeOutcome, IdentityProvider, ProviderError};

struct StaticProvider;

#[async_trait]
impl IdentityProvider for StaticProvider {
    fn authorization_endpoint(&self) -> String {
        "https://idp.example.com/authorize".to_string()
    }

    fn end_session_endpoint(&self) -> String {
        "https://idp.example.com/logout".to_string()
    }

    async fn exchange_code(
        &self,
        _request: &CodeExchange<'_>,
    ) -> Result<ExchangeOutcome, ProviderError> {
        Ok(ExchangeOutcome {
            principal: Some(ClaimsPrincipal::new(ClaimsIdentity::authenticated(
                "OpenIdConnect",
                vec![Claim::new("sub", "00u7"), Claim::new("name", "Sam")],
                "name",
                ROLE_CLAIM_TYPE,
            ))),
            id_token: None,
        })
    }
}

#[derive(Default)]
struct CountingSynchronizer {
    calls: Mutex<usize>,
}

#[async_trait]
impl UserSynchronizer for CountingSynchronizer {
    async fn synchronize(&self, _identity: &ClaimsIdentity) -> Result<(), SyncError> {
        *self.calls.lock().unwrap() += 1;
        Ok(())
    }
}

fn handler(config: &Config, synchronizer: Arc<dyn UserSynchronizer>) -> OidcHandler {
    OidcHandler::new(
        Arc::new(StaticProvider),
        Arc::new(build_events(config, synchronizer)),
        oidc_settings(config),
    )
}

fn request(return_url: &str, authenticated: bool) -> ChallengeRequest {
    ChallengeRequest {
        base_url: "http://localhost:5000".to_string(),
        return_url: Some(return_url.to_string()),
        status: 401,
        request_authenticated: authenticated,
    }
}

async fn handshake_for(handler: &OidcHandler, return_url: &str) -> Handshake {
    match handler.challenge(request(return_url, false)).await.unwrap() {
        ChallengeOutcome::Redirect { handshake, .. } => handshake,
        other => panic!("expected a redirect, got {:?}", other),
    }
}

fn params_for(handshake: &Handshake) -> CallbackParams {
    CallbackParams {
        code: Some("code-1".to_string()),
        state: Some(handshake.state.clone()),
        ..CallbackParams::default()
    }
}

#[tokio::test]
async fn test_absolute_return_url_is_reduced_to_local_path() {
    let handler = handler(&Config::default(), Arc::new(CountingSynchronizer::default()));
    let handshake = handshake_for(&handler, "https://localhost:5000/account?tab=2").await;

    assert_eq!(
        handshake.redirect_uri,
        "https://localhost:5000/authorization-code/callback"
    );

    match handler
        .complete(params_for(&handshake), Some(handshake))
        .await
        .unwrap()
    {
        CallbackOutcome::SignedIn { redirect_uri, .. } => assert_eq!(redirect_uri, "/account?tab=2"),
        other => panic!("expected a sign-in, got {:?}", other),
    }
}

#[tokio::test]
async fn test_network_path_return_url_stays_on_site() {
    let handler = handler(&Config::default(), Arc::new(CountingSynchronizer::default()));

    for return_url in ["//evil.com/account", "/\\evil.com/account"] {
        let handshake = handshake_for(&handler, return_url).await;
        match handler
            .complete(params_for(&handshake), Some(handshake))
            .await
            .unwrap()
        {
            CallbackOutcome::SignedIn { redirect_uri, .. } => {
                assert_eq!(redirect_uri, "/account")
            }
            other => panic!("expected a sign-in, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_authenticated_challenge_is_handled_as_forbidden() {
    let handler = handler(&Config::default(), Arc::new(CountingSynchronizer::default()));

    match handler.challenge(request("/cms", true)).await.unwrap() {
        ChallengeOutcome::Handled { status, body } => {
            assert_eq!(status, 403);
            assert!(body.is_empty());
        }
        other => panic!("expected a handled response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_each_callback_synchronizes_once() {
    let synchronizer = Arc::new(CountingSynchronizer::default());
    let handler = handler(&Config::default(), synchronizer.clone());

    for _ in 0..2 {
        let handshake = handshake_for(&handler, "/").await;
        let outcome = handler
            .complete(params_for(&handshake), Some(handshake))
            .await
            .unwrap();
        assert!(matches!(outcome, CallbackOutcome::SignedIn { .. }));
    }
    assert_eq!(*synchronizer.calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_state_is_single_valued_per_challenge() {
    let handler = handler(&Config::default(), Arc::new(CountingSynchronizer::default()));
    let first = handshake_for(&handler, "/").await;
    let second = handshake_for(&handler, "/").await;
    assert_ne!(first.state, second.state);

    // Completing the second handshake with the first state fails
    let outcome = handler
        .complete(params_for(&first), Some(second))
        .await
        .unwrap();
    match outcome {
        CallbackOutcome::Failed { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(String::from_utf8(body).unwrap(), AuthError::StateMismatch.to_string());
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[test]
fn test_logout_url_carries_post_logout_redirect() {
    let handler = handler(&Config::default(), Arc::new(CountingSynchronizer::default()));
    let url = handler.logout_url(None).unwrap();
    assert_eq!(
        url,
        "https://idp.example.com/logout?post_logout_redirect_uri=https%3A%2F%2Flocalhost%3A5000%2F"
    );
}
