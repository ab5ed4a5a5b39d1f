// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claims-mapping policies
//!
//! A [`ClaimsMapper`] turns the claims delivered by the identity provider into
//! supplementary claims added to the principal after login. The default
//! [`StaticRoleMapper`] grants a fixed list of roles to every user who signs in.

use super::claims::{Claim, ClaimsPrincipal};

/// Policy deriving supplementary claims from the provider's principal
pub trait ClaimsMapper: Send + Sync {
    fn supplementary_claims(&self, principal: &ClaimsPrincipal) -> Vec<Claim>;
}

/// Grants the same role claims to everyone
#[derive(Debug, Clone)]
pub struct StaticRoleMapper {
    roles: Vec<String>,
}

impl StaticRoleMapper {
    pub fn new(roles: Vec<String>) -> Self {
        Self { roles }
    }
}

impl Default for StaticRoleMapper {
    fn default() -> Self {
        Self::new(vec![crate::config::DEFAULT_ADMIN_ROLE.to_string()])
    }
}

impl ClaimsMapper for StaticRoleMapper {
    fn supplementary_claims(&self, _principal: &ClaimsPrincipal) -> Vec<Claim> {
        self.roles.iter().map(Claim::role).collect()
    }
}

/// Closures can be used as ad-hoc policies
impl<F> ClaimsMapper for F
where
    F: Fn(&ClaimsPrincipal) -> Vec<Claim> + Send + Sync,
{
    fn supplementary_claims(&self, principal: &ClaimsPrincipal) -> Vec<Claim> {
        self(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{ClaimsIdentity, ROLE_CLAIM_TYPE};

    #[test]
    fn test_default_mapper_grants_web_admins() {
        let claims = StaticRoleMapper::default().supplementary_claims(&ClaimsPrincipal::default());
        assert_eq!(claims, vec![Claim::new(ROLE_CLAIM_TYPE, "WebAdmins")]);
    }

    #[test]
    fn test_closure_mapper_can_read_provider_claims() {
        let mapper = |p: &ClaimsPrincipal| {
            p.claims()
                .filter(|c| c.claim_type == "groups")
                .map(|c| Claim::role(c.value.clone()))
                .collect::<Vec<_>>()
        };
        let principal = ClaimsPrincipal::new(ClaimsIdentity::from_claims(vec![
            Claim::new("groups", "Editors"),
            Claim::new("email", "jane@example.com"),
        ]));

        let claims = mapper.supplementary_claims(&principal);
        assert_eq!(claims, vec![Claim::role("Editors")]);
    }
}
