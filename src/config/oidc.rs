// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect client configuration
//!
//! [`OidcConfig`] describes the registration of this application at the identity
//! provider, [`TokenValidationConfig`] how the returned id token is checked and how
//! its claims are interpreted.

use serde::{Deserialize, Serialize};

use crate::auth::claims::ROLE_CLAIM_TYPE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OidcConfig {
    /// Base URL of the provider organisation, e.g. `https://dev-123456.okta.com`
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Identifier of the custom authorization server. Default is `default`.
    #[serde(default = "default_authorization_server_id")]
    pub authorization_server_id: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Scopes requested at login. Must contain `openid`.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Path the provider redirects back to after login
    #[serde(default = "default_callback_path")]
    pub callback_path: String,

    /// Scheme and authority this site is reached on, e.g. `https://cms.example.com`.
    ///
    /// The login callback URI is built from it. When unset the request's `Host`
    /// header is used.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Where the provider sends the user after logout
    #[serde(default = "default_post_logout_redirect_uri")]
    pub post_logout_redirect_uri: String,

    /// Rewrite outbound `http:` redirect URIs to `https:`.
    ///
    /// Needed when the server runs behind a TLS-terminating proxy and therefore sees
    /// plain HTTP requests.
    #[serde(default = "default_true")]
    pub force_https_redirect: bool,

    /// Query the userinfo endpoint after the code exchange and merge its claims
    #[serde(default = "default_true")]
    pub get_claims_from_userinfo_endpoint: bool,
}

impl OidcConfig {
    /// Issuer URL of the configured authorization server
    pub fn issuer(&self) -> String {
        format!(
            "{}/oauth2/{}",
            self.domain.trim_end_matches('/'),
            self.authorization_server_id
        )
    }
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            authorization_server_id: default_authorization_server_id(),
            client_id: default_client_id(),
            client_secret: String::new(),
            scopes: default_scopes(),
            callback_path: default_callback_path(),
            public_base_url: None,
            post_logout_redirect_uri: default_post_logout_redirect_uri(),
            force_https_redirect: true,
            get_claims_from_userinfo_endpoint: true,
        }
    }
}

fn default_domain() -> String {
    "https://dev-000000.okta.com".to_string()
}

fn default_authorization_server_id() -> String {
    "default".to_string()
}

fn default_client_id() -> String {
    "cms-client".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "profile".to_string(), "email".to_string()]
}

fn default_callback_path() -> String {
    "/authorization-code/callback".to_string()
}

fn default_post_logout_redirect_uri() -> String {
    "https://localhost:5000/".to_string()
}

fn default_true() -> bool {
    true
}

/// Id token validation and claim interpretation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenValidationConfig {
    /// Claim type holding roles on the provider identity
    #[serde(default = "default_role_claim_type")]
    pub role_claim_type: String,

    /// Claim type holding the display name on the provider identity
    #[serde(default = "default_name_claim_type")]
    pub name_claim_type: String,

    /// Check the `iss` claim against the configured issuer
    #[serde(default = "default_true")]
    pub validate_issuer: bool,

    /// Check the `aud` claim against the client id
    #[serde(default = "default_true")]
    pub validate_audience: bool,
}

fn default_role_claim_type() -> String {
    ROLE_CLAIM_TYPE.to_string()
}

fn default_name_claim_type() -> String {
    "name".to_string()
}

impl Default for TokenValidationConfig {
    fn default() -> Self {
        Self {
            role_claim_type: default_role_claim_type(),
            name_claim_type: default_name_claim_type(),
            validate_issuer: true,
            validate_audience: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_ignores_trailing_slash() {
        let config = OidcConfig {
            domain: "https://dev-42.okta.com/".to_string(),
            ..OidcConfig::default()
        };
        assert_eq!(config.issuer(), "https://dev-42.okta.com/oauth2/default");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: OidcConfig = serde_yml::from_str("client_id: my-cms\n").unwrap();
        assert_eq!(config.client_id, "my-cms");
        assert_eq!(config.scopes, vec!["openid", "profile", "email"]);
        assert!(config.force_https_redirect);
    }
}
