// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OIDC lifecycle hooks
//!
//! [`OidcEvents`] is the capability the identity-provider client calls into at the
//! three points of the authorization-code flow this application cares about.
//! [`CmsAuthEvents`] is the one implementation, composed of the redirect policy,
//! the claims augmentor and the failure reporter, and registered on the
//! [`OidcHandler`](super::flow::OidcHandler) at startup.

use async_trait::async_trait;

use super::augmentor::ClaimsAugmentor;
use super::context::AuthenticationContext;
use super::error::AuthError;
use super::failure::AuthFailureReporter;
use super::redirect_policy::RedirectPolicy;

#[async_trait]
pub trait OidcEvents: Send + Sync {
    /// Called before a request is redirected to the identity provider
    async fn on_redirect_to_identity_provider(&self, ctx: &mut AuthenticationContext);

    /// Called once the provider's tokens have been validated, before sign-in
    async fn on_token_validated(&self, ctx: &mut AuthenticationContext) -> Result<(), AuthError>;

    /// Called when the provider exchange itself failed
    async fn on_authentication_failed(
        &self,
        ctx: &mut AuthenticationContext,
        failure: &AuthError,
    );
}

pub struct CmsAuthEvents {
    redirect_policy: RedirectPolicy,
    augmentor: ClaimsAugmentor,
    failure_reporter: AuthFailureReporter,
}

impl CmsAuthEvents {
    pub fn new(
        redirect_policy: RedirectPolicy,
        augmentor: ClaimsAugmentor,
        failure_reporter: AuthFailureReporter,
    ) -> Self {
        Self {
            redirect_policy,
            augmentor,
            failure_reporter,
        }
    }
}

#[async_trait]
impl OidcEvents for CmsAuthEvents {
    async fn on_redirect_to_identity_provider(&self, ctx: &mut AuthenticationContext) {
        self.redirect_policy.rewrite_outbound(ctx);
        self.redirect_policy.intercept_unauthorized(ctx);
    }

    async fn on_token_validated(&self, ctx: &mut AuthenticationContext) -> Result<(), AuthError> {
        self.augmentor.augment(ctx).await?;
        Ok(())
    }

    async fn on_authentication_failed(
        &self,
        ctx: &mut AuthenticationContext,
        failure: &AuthError,
    ) {
        self.failure_reporter.report(ctx, failure);
    }
}
