// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-attempt authentication context
//!
//! An [`AuthenticationContext`] is created for each login attempt (challenge, callback
//! or failure) and handed to the event hooks, which are the only code allowed to
//! mutate it. Once the hooks return, the web layer turns the context into an HTTP
//! response and drops it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::claims::ClaimsPrincipal;

/// HTTP 401 status code
pub const STATUS_UNAUTHORIZED: u16 = 401;
/// HTTP 403 status code
pub const STATUS_FORBIDDEN: u16 = 403;
/// HTTP 500 status code
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// State carried across the round trip to the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationProperties {
    /// Where to send the user once the login completes (relative or absolute)
    pub redirect_uri: Option<String>,
    /// Free-form items preserved across the round trip
    #[serde(default)]
    pub items: BTreeMap<String, String>,
}

impl AuthenticationProperties {
    pub fn with_redirect_uri(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: Some(redirect_uri.into()),
            items: BTreeMap::new(),
        }
    }
}

/// OpenID Connect protocol message sent to the identity provider
///
/// Only the fields used by the authorization and end-session requests are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolMessage {
    /// Provider endpoint the message is addressed to
    pub issuer_address: String,
    pub client_id: String,
    /// Callback URI the provider redirects back to
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub post_logout_redirect_uri: Option<String>,
    pub id_token_hint: Option<String>,
}

impl ProtocolMessage {
    /// Build the authorization request URL (`issuer_address?client_id=...`)
    pub fn create_authentication_request_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.issuer_address)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", &self.response_type)
                .append_pair("scope", &self.scope);
            if let Some(state) = &self.state {
                query.append_pair("state", state);
            }
            if let Some(nonce) = &self.nonce {
                query.append_pair("nonce", nonce);
            }
        }
        Ok(url)
    }

    /// Build the end-session (logout) request URL
    pub fn create_logout_request_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.issuer_address)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(hint) = &self.id_token_hint {
                query.append_pair("id_token_hint", hint);
            }
            if let Some(uri) = &self.post_logout_redirect_uri {
                query.append_pair("post_logout_redirect_uri", uri);
            }
        }
        Ok(url)
    }
}

/// Mutable view of the HTTP response being produced for the current attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseState {
    pub status: u16,
    pub body: Vec<u8>,
    handled: bool,
}

impl ResponseState {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            handled: false,
        }
    }

    /// Mark the response as handled, suppressing the default pipeline behavior
    /// (challenge redirect or error page)
    pub fn handle_response(&mut self) {
        self.handled = true;
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn write_body(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One in-flight OIDC exchange, as seen by the event hooks
#[derive(Debug, Clone)]
pub struct AuthenticationContext {
    pub principal: Option<ClaimsPrincipal>,
    pub properties: AuthenticationProperties,
    pub protocol_message: ProtocolMessage,
    pub response: ResponseState,
    /// Whether the current request already carries an authenticated identity
    pub request_authenticated: bool,
}

impl AuthenticationContext {
    /// Context for an outbound challenge
    pub fn for_challenge(
        protocol_message: ProtocolMessage,
        properties: AuthenticationProperties,
        status: u16,
        request_authenticated: bool,
    ) -> Self {
        Self {
            principal: None,
            properties,
            protocol_message,
            response: ResponseState::new(status),
            request_authenticated,
        }
    }

    /// Context for a completed token validation
    pub fn for_token_validated(
        principal: Option<ClaimsPrincipal>,
        properties: AuthenticationProperties,
    ) -> Self {
        Self {
            principal,
            properties,
            protocol_message: ProtocolMessage::default(),
            response: ResponseState::new(200),
            request_authenticated: false,
        }
    }

    /// Context for a provider-side failure; status defaults to 500
    pub fn for_failure(properties: AuthenticationProperties) -> Self {
        Self {
            principal: None,
            properties,
            protocol_message: ProtocolMessage::default(),
            response: ResponseState::new(STATUS_INTERNAL_SERVER_ERROR),
            request_authenticated: false,
        }
    }
}
