// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claims-based identity model
//!
//! An authenticated user is represented by a [`ClaimsPrincipal`], which holds one or
//! more [`ClaimsIdentity`] values. Each identity is a list of typed [`Claim`]s issued
//! by some authority (the identity provider, or the local claims-mapping policy).
//!
//! The principal is what ends up serialized into the session cookie once the login
//! flow completes.

use serde::{Deserialize, Serialize};

/// Standard role claim type identifier
pub const ROLE_CLAIM_TYPE: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Standard name claim type identifier
pub const NAME_CLAIM_TYPE: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";

/// Value type for plain string claims
pub const STRING_VALUE_TYPE: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Authentication type recorded on identities built from an OIDC login
pub const OIDC_AUTHENTICATION_TYPE: &str = "OpenIdConnect";

/// A single typed assertion about a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type, e.g. [`ROLE_CLAIM_TYPE`] or `"email"`
    pub claim_type: String,
    /// Claim value
    pub value: String,
    /// Value type, [`STRING_VALUE_TYPE`] unless the issuer says otherwise
    pub value_type: String,
}

impl Claim {
    /// Create a string-valued claim
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_value_type(claim_type, value, STRING_VALUE_TYPE)
    }

    pub fn with_value_type(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: value_type.into(),
        }
    }

    /// Create a role claim using the standard role claim type
    pub fn role(value: impl Into<String>) -> Self {
        Self::new(ROLE_CLAIM_TYPE, value)
    }
}

/// A set of claims issued together by one authority
///
/// An identity is considered authenticated when it carries a non-empty
/// authentication type. Identities created locally to hold supplementary claims
/// have no authentication type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    pub authentication_type: Option<String>,
    pub name_claim_type: String,
    pub role_claim_type: String,
    pub claims: Vec<Claim>,
}

impl Default for ClaimsIdentity {
    fn default() -> Self {
        Self {
            authentication_type: None,
            name_claim_type: NAME_CLAIM_TYPE.to_string(),
            role_claim_type: ROLE_CLAIM_TYPE.to_string(),
            claims: Vec::new(),
        }
    }
}

impl ClaimsIdentity {
    /// Build an unauthenticated identity holding the given claims
    pub fn from_claims(claims: Vec<Claim>) -> Self {
        Self {
            claims,
            ..Self::default()
        }
    }

    /// Build an authenticated identity with explicit name and role claim types
    pub fn authenticated(
        authentication_type: impl Into<String>,
        claims: Vec<Claim>,
        name_claim_type: impl Into<String>,
        role_claim_type: impl Into<String>,
    ) -> Self {
        Self {
            authentication_type: Some(authentication_type.into()),
            name_claim_type: name_claim_type.into(),
            role_claim_type: role_claim_type.into(),
            claims,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_type
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }

    /// Value of the first claim whose type is this identity's name claim type
    pub fn name(&self) -> Option<&str> {
        self.find_first(&self.name_claim_type)
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims
            .iter()
            .any(|c| c.claim_type == claim_type && c.value == value)
    }

    /// Role check using this identity's role claim type
    ///
    /// Supplementary identities always use [`ROLE_CLAIM_TYPE`], so the standard type
    /// is accepted as well.
    pub fn is_in_role(&self, role: &str) -> bool {
        self.has_claim(&self.role_claim_type, role) || self.has_claim(ROLE_CLAIM_TYPE, role)
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }
}

/// The authenticated user, composed of zero or more identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPrincipal {
    pub identities: Vec<ClaimsIdentity>,
}

impl ClaimsPrincipal {
    pub fn new(identity: ClaimsIdentity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    /// Primary identity (the first one), if any
    pub fn identity(&self) -> Option<&ClaimsIdentity> {
        self.identities.first()
    }

    pub fn add_identity(&mut self, identity: ClaimsIdentity) {
        self.identities.push(identity);
    }

    /// True when the primary identity is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some_and(ClaimsIdentity::is_authenticated)
    }

    /// All claims across every identity, in identity order
    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.identities.iter().flat_map(|i| i.claims.iter())
    }

    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.identities.iter().any(|i| i.has_claim(claim_type, value))
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.identities.iter().any(|i| i.is_in_role(role))
    }

    pub fn name(&self) -> Option<&str> {
        self.identity().and_then(ClaimsIdentity::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_identity() -> ClaimsIdentity {
        ClaimsIdentity::authenticated(
            OIDC_AUTHENTICATION_TYPE,
            vec![
                Claim::new("sub", "00u1"),
                Claim::new("name", "Jane Editor"),
                Claim::new("groups", "Editors"),
            ],
            "name",
            ROLE_CLAIM_TYPE,
        )
    }

    #[test]
    fn test_identity_without_authentication_type_is_not_authenticated() {
        let identity = ClaimsIdentity::from_claims(vec![Claim::role("WebAdmins")]);
        assert!(!identity.is_authenticated());

        let empty = ClaimsIdentity {
            authentication_type: Some(String::new()),
            ..ClaimsIdentity::default()
        };
        assert!(!empty.is_authenticated());
    }

    #[test]
    fn test_name_uses_configured_name_claim_type() {
        let identity = provider_identity();
        assert_eq!(identity.name(), Some("Jane Editor"));
    }

    #[test]
    fn test_principal_primary_identity_is_first() {
        let mut principal = ClaimsPrincipal::new(provider_identity());
        principal.add_identity(ClaimsIdentity::from_claims(vec![Claim::role("WebAdmins")]));

        assert!(principal.is_authenticated());
        assert_eq!(principal.identities.len(), 2);
        assert_eq!(principal.identity().and_then(|i| i.find_first("sub")), Some("00u1"));
        assert!(principal.is_in_role("WebAdmins"));
        assert_eq!(principal.claims().count(), 4);
    }

    #[test]
    fn test_role_claim_has_string_value_type() {
        let claim = Claim::role("WebAdmins");
        assert_eq!(claim.claim_type, ROLE_CLAIM_TYPE);
        assert_eq!(claim.value_type, STRING_VALUE_TYPE);
    }
}
