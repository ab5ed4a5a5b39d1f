// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Settings of the post-login pipeline: claims added to the principal, user
//! synchronization and failure reporting.

use serde::{Deserialize, Serialize};

use super::DEFAULT_ADMIN_ROLE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimsConfig {
    /// Role claims granted to every user signing in through the provider
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
}

fn default_roles() -> Vec<String> {
    vec![DEFAULT_ADMIN_ROLE.to_string()]
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            roles: default_roles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// CMS endpoint receiving the signed-in identity.
    ///
    /// When absent, synchronization only logs the identity.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthFailureConfig {
    /// Write the provider's error message in the failure response body.
    ///
    /// When disabled a generic message is written and the details only go to the log.
    #[serde(default = "default_expose_details")]
    pub expose_details: bool,
}

fn default_expose_details() -> bool {
    true
}

impl Default for AuthFailureConfig {
    fn default() -> Self {
        Self {
            expose_details: default_expose_details(),
        }
    }
}
