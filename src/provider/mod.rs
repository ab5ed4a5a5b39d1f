// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity provider client
//!
//! The provider is treated as a black box exposing three things: where to send the
//! user to log in, where to send them to log out, and how to turn an authorization
//! code into a principal. [`okta::OktaProvider`] talks to an Okta authorization
//! server; tests plug in their own [`IdentityProvider`].

pub mod claims;
pub mod okta;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::claims::ClaimsPrincipal;

pub use okta::OktaProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Protocol(String),

    #[error("invalid id token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ProviderError {
    /// Error reported by the provider as `error` / `error_description` parameters
    pub fn from_oauth_error(error: &str, description: Option<&str>) -> Self {
        match description {
            Some(description) if !description.is_empty() => {
                Self::Protocol(format!("{}: {}", error, description))
            }
            _ => Self::Protocol(error.to_string()),
        }
    }
}

/// Parameters of an authorization-code exchange
#[derive(Debug, Clone)]
pub struct CodeExchange<'a> {
    pub code: &'a str,
    /// Must be the exact redirect URI sent with the authorization request
    pub redirect_uri: &'a str,
    pub nonce: Option<&'a str>,
}

/// Result of a successful exchange
#[derive(Debug, Clone, Default)]
pub struct ExchangeOutcome {
    /// Principal built from the token and userinfo claims, when a subject was present
    pub principal: Option<ClaimsPrincipal>,
    pub id_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorization_endpoint(&self) -> String;

    fn end_session_endpoint(&self) -> String;

    async fn exchange_code(
        &self,
        request: &CodeExchange<'_>,
    ) -> Result<ExchangeOutcome, ProviderError>;
}
