// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect authentication pipeline
//!
//! Four pieces plug into the authorization-code flow driven by [`flow::OidcHandler`]:
//!
//! - [`redirect_policy::RedirectPolicy`] rewrites the outbound redirect and breaks the
//!   login loop for authenticated requests answered with 401
//! - [`augmentor::ClaimsAugmentor`] normalizes the post-login redirect and adds the
//!   application roles to the principal
//! - [`sync::UserSynchronizer`] pushes the signed-in identity to the CMS user store
//! - [`failure::AuthFailureReporter`] turns provider failures into a response body
//!
//! [`build_events`] assembles them from the configuration.

pub mod augmentor;
pub mod claims;
pub mod claims_mapping;
pub mod context;
pub mod error;
pub mod events;
pub mod failure;
pub mod flow;
pub mod redirect_policy;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use url::Url;

use crate::config::Config;

pub use augmentor::ClaimsAugmentor;
pub use claims::{Claim, ClaimsIdentity, ClaimsPrincipal};
pub use claims_mapping::{ClaimsMapper, StaticRoleMapper};
pub use context::{AuthenticationContext, AuthenticationProperties, ProtocolMessage};
pub use error::AuthError;
pub use events::{CmsAuthEvents, OidcEvents};
pub use failure::AuthFailureReporter;
pub use flow::{LoginStage, OidcHandler, OidcSettings};
pub use redirect_policy::RedirectPolicy;
pub use sync::{HttpUserSynchronizer, LoggingUserSynchronizer, UserSynchronizer};

/// Synchronizer selected by the `sync` section
pub fn build_synchronizer(config: &Config) -> Result<Arc<dyn UserSynchronizer>> {
    match &config.sync.endpoint {
        Some(endpoint) => {
            let endpoint = Url::parse(endpoint)
                .with_context(|| format!("Invalid sync endpoint: {}", endpoint))?;
            info!("Users are synchronized to {}", endpoint);
            let synchronizer =
                HttpUserSynchronizer::new(endpoint, Duration::from_millis(config.sync.timeout_ms))
                    .context("Failed to build the sync HTTP client")?;
            Ok(Arc::new(synchronizer))
        }
        None => {
            info!("No sync endpoint configured, signed-in users are only logged");
            Ok(Arc::new(LoggingUserSynchronizer))
        }
    }
}

/// Event hooks for the configured pipeline, with the given synchronizer
pub fn build_events(config: &Config, synchronizer: Arc<dyn UserSynchronizer>) -> CmsAuthEvents {
    let mapper = Arc::new(StaticRoleMapper::new(config.claims.roles.clone()));
    CmsAuthEvents::new(
        RedirectPolicy::new(config.oidc.force_https_redirect),
        ClaimsAugmentor::new(mapper, synchronizer),
        AuthFailureReporter::new(config.auth_failure.expose_details),
    )
}

/// Request parameters of the configured client registration
pub fn oidc_settings(config: &Config) -> OidcSettings {
    OidcSettings {
        client_id: config.oidc.client_id.clone(),
        scopes: config.oidc.scopes.clone(),
        callback_path: config.oidc.callback_path.clone(),
        public_base_url: config.oidc.public_base_url.clone(),
        post_logout_redirect_uri: config.oidc.post_logout_redirect_uri.clone(),
    }
}
