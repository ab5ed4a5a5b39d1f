// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authorization-code flow driver
//!
//! [`OidcHandler`] owns the identity provider client and the registered
//! [`OidcEvents`], and raises the events in protocol order. A single login attempt
//! walks through the following stages:
//!
//! ```text
//! Unauthenticated -> ChallengeIssued -> ProviderExchange -> TokenValidated -> SessionEstablished
//!        |                  |                  |                  \-> Rejected
//!        |                  \------------------+-> AuthenticationFailed -> ResponseHandled
//!        \-> Forbidden   (401 for an already authenticated request)
//! ```
//!
//! The challenge and the callback are two separate HTTP requests; the state needed
//! by the callback travels in a [`Handshake`] that the web layer stores in a private
//! cookie.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::claims::ClaimsPrincipal;
use super::context::{AuthenticationContext, AuthenticationProperties, ProtocolMessage};
use super::error::AuthError;
use super::events::OidcEvents;
use crate::provider::{CodeExchange, IdentityProvider, ProviderError};

/// Stages of one login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Unauthenticated,
    ChallengeIssued,
    ProviderExchange,
    TokenValidated,
    SessionEstablished,
    Rejected,
    AuthenticationFailed,
    ResponseHandled,
    Forbidden,
}

impl LoginStage {
    pub fn can_advance_to(self, next: LoginStage) -> bool {
        use LoginStage::*;
        matches!(
            (self, next),
            (Unauthenticated, ChallengeIssued)
                | (Unauthenticated, Forbidden)
                | (Unauthenticated, AuthenticationFailed)
                | (ChallengeIssued, ProviderExchange)
                | (ChallengeIssued, AuthenticationFailed)
                | (ProviderExchange, TokenValidated)
                | (ProviderExchange, AuthenticationFailed)
                | (TokenValidated, SessionEstablished)
                | (TokenValidated, Rejected)
                | (AuthenticationFailed, ResponseHandled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoginStage::SessionEstablished
                | LoginStage::Rejected
                | LoginStage::ResponseHandled
                | LoginStage::Forbidden
        )
    }
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the stage of one attempt and refuses out-of-order transitions
#[derive(Debug)]
pub struct LoginAttempt {
    stage: LoginStage,
}

impl LoginAttempt {
    pub fn new() -> Self {
        Self::starting_at(LoginStage::Unauthenticated)
    }

    pub fn starting_at(stage: LoginStage) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> LoginStage {
        self.stage
    }

    pub fn advance(&mut self, next: LoginStage) -> Result<(), AuthError> {
        if !self.stage.can_advance_to(next) {
            return Err(AuthError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        debug!("Login attempt {} -> {}", self.stage, next);
        self.stage = next;
        Ok(())
    }
}

impl Default for LoginAttempt {
    fn default() -> Self {
        Self::new()
    }
}

/// State carried from the challenge to the callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub state: String,
    pub nonce: String,
    /// Callback URI exactly as sent to the provider
    pub redirect_uri: String,
    pub properties: AuthenticationProperties,
}

/// What the web layer knows about a request that needs a challenge
#[derive(Debug, Clone)]
pub struct ChallengeRequest {
    /// Scheme and authority the request came in on, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Where to return after login
    pub return_url: Option<String>,
    /// Status code of the response being challenged (401 for the default challenge)
    pub status: u16,
    pub request_authenticated: bool,
}

#[derive(Debug, Clone)]
pub enum ChallengeOutcome {
    /// Send the user to the provider and remember the handshake
    Redirect { location: String, handshake: Handshake },
    /// A hook handled the response itself
    Handled { status: u16, body: Vec<u8> },
}

/// Parameters the provider sends back to the callback path
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    SignedIn {
        principal: ClaimsPrincipal,
        redirect_uri: String,
        id_token: Option<String>,
    },
    /// Failure response produced by the failure hook (or the default one)
    Failed { status: u16, body: Vec<u8> },
    /// Tokens were validated but no principal came out of them
    NoIdentity,
}

/// Static parameters of the authorization requests
#[derive(Debug, Clone)]
pub struct OidcSettings {
    pub client_id: String,
    pub scopes: Vec<String>,
    pub callback_path: String,
    pub public_base_url: Option<String>,
    pub post_logout_redirect_uri: String,
}

pub struct OidcHandler {
    provider: Arc<dyn IdentityProvider>,
    events: Arc<dyn OidcEvents>,
    settings: OidcSettings,
}

impl OidcHandler {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        events: Arc<dyn OidcEvents>,
        settings: OidcSettings,
    ) -> Self {
        Self {
            provider,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Build the outbound challenge and run the redirect hook
    pub async fn challenge(&self, request: ChallengeRequest) -> Result<ChallengeOutcome, AuthError> {
        let mut attempt = LoginAttempt::new();
        let state = random_token();
        let nonce = random_token();
        let message = ProtocolMessage {
            issuer_address: self.provider.authorization_endpoint(),
            client_id: self.settings.client_id.clone(),
            redirect_uri: format!(
                "{}{}",
                request.base_url.trim_end_matches('/'),
                self.settings.callback_path
            ),
            response_type: "code".to_string(),
            scope: self.settings.scopes.join(" "),
            state: Some(state.clone()),
            nonce: Some(nonce.clone()),
            post_logout_redirect_uri: None,
            id_token_hint: None,
        };
        let properties = AuthenticationProperties {
            redirect_uri: request.return_url,
            ..AuthenticationProperties::default()
        };
        let mut ctx = AuthenticationContext::for_challenge(
            message,
            properties,
            request.status,
            request.request_authenticated,
        );

        self.events.on_redirect_to_identity_provider(&mut ctx).await;

        if ctx.response.is_handled() {
            attempt.advance(LoginStage::Forbidden)?;
            return Ok(ChallengeOutcome::Handled {
                status: ctx.response.status,
                body: ctx.response.body,
            });
        }

        let location = ctx.protocol_message.create_authentication_request_url()?;
        attempt.advance(LoginStage::ChallengeIssued)?;
        Ok(ChallengeOutcome::Redirect {
            location: location.to_string(),
            handshake: Handshake {
                state,
                nonce,
                redirect_uri: ctx.protocol_message.redirect_uri,
                properties: ctx.properties,
            },
        })
    }

    /// Complete the flow on the callback path
    ///
    /// # Errors
    ///
    /// Errors raised by the token-validated hook (user synchronization) are
    /// returned to the caller; provider failures are turned into a handled
    /// [`CallbackOutcome::Failed`] instead.
    pub async fn complete(
        &self,
        params: CallbackParams,
        handshake: Option<Handshake>,
    ) -> Result<CallbackOutcome, AuthError> {
        let Some(handshake) = handshake else {
            let mut attempt = LoginAttempt::new();
            return self
                .fail(&mut attempt, AuthenticationProperties::default(), AuthError::MissingHandshake)
                .await;
        };
        let mut attempt = LoginAttempt::starting_at(LoginStage::ChallengeIssued);

        if let Some(error) = params.error.as_deref() {
            let failure = ProviderError::from_oauth_error(error, params.error_description.as_deref());
            return self.fail(&mut attempt, handshake.properties, failure.into()).await;
        }
        if params.state.as_deref() != Some(handshake.state.as_str()) {
            return self
                .fail(&mut attempt, handshake.properties, AuthError::StateMismatch)
                .await;
        }
        let Some(code) = params.code.as_deref() else {
            let failure = ProviderError::Protocol("missing authorization code".to_string());
            return self.fail(&mut attempt, handshake.properties, failure.into()).await;
        };

        attempt.advance(LoginStage::ProviderExchange)?;
        let exchange = CodeExchange {
            code,
            redirect_uri: &handshake.redirect_uri,
            nonce: Some(&handshake.nonce),
        };
        let outcome = match self.provider.exchange_code(&exchange).await {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(&mut attempt, handshake.properties, err.into()).await,
        };

        attempt.advance(LoginStage::TokenValidated)?;
        let mut ctx = AuthenticationContext::for_token_validated(outcome.principal, handshake.properties);
        if let Err(err) = self.events.on_token_validated(&mut ctx).await {
            attempt.advance(LoginStage::Rejected)?;
            return Err(err);
        }

        match ctx.principal {
            Some(principal) => {
                attempt.advance(LoginStage::SessionEstablished)?;
                info!("User {:?} signed in", principal.name());
                Ok(CallbackOutcome::SignedIn {
                    principal,
                    redirect_uri: ctx
                        .properties
                        .redirect_uri
                        .filter(|uri| !uri.is_empty())
                        .unwrap_or_else(|| "/".to_string()),
                    id_token: outcome.id_token,
                })
            }
            None => {
                attempt.advance(LoginStage::Rejected)?;
                Ok(CallbackOutcome::NoIdentity)
            }
        }
    }

    /// End-session URL at the provider
    pub fn logout_url(&self, id_token_hint: Option<String>) -> Result<String, AuthError> {
        let message = ProtocolMessage {
            issuer_address: self.provider.end_session_endpoint(),
            client_id: self.settings.client_id.clone(),
            post_logout_redirect_uri: Some(self.settings.post_logout_redirect_uri.clone()),
            id_token_hint,
            ..ProtocolMessage::default()
        };
        Ok(message.create_logout_request_url()?.to_string())
    }

    async fn fail(
        &self,
        attempt: &mut LoginAttempt,
        properties: AuthenticationProperties,
        failure: AuthError,
    ) -> Result<CallbackOutcome, AuthError> {
        attempt.advance(LoginStage::AuthenticationFailed)?;
        let mut ctx = AuthenticationContext::for_failure(properties);
        self.events.on_authentication_failed(&mut ctx, &failure).await;
        attempt.advance(LoginStage::ResponseHandled)?;

        if !ctx.response.is_handled() {
            // Default failure handling: no details in the body
            return Ok(CallbackOutcome::Failed {
                status: ctx.response.status,
                body: Vec::new(),
            });
        }
        Ok(CallbackOutcome::Failed {
            status: ctx.response.status,
            body: ctx.response.body,
        })
    }
}

fn random_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
