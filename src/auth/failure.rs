// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reporting of provider-side authentication failures
//!
//! When the code exchange or the userinfo call fails, the failure reason is written
//! as plain text into the response body and the response is marked handled, which
//! suppresses the default error page. The raw message can leak provider or network
//! details to the client; `expose_details = false` replaces it with a generic text.
//! The full error is always logged.

use log::error;

use super::context::AuthenticationContext;

/// Body written when failure details are not exposed
pub const GENERIC_FAILURE_MESSAGE: &str = "Authentication failed.";

#[derive(Debug, Clone, Copy)]
pub struct AuthFailureReporter {
    expose_details: bool,
}

impl Default for AuthFailureReporter {
    fn default() -> Self {
        Self {
            expose_details: true,
        }
    }
}

impl AuthFailureReporter {
    pub fn new(expose_details: bool) -> Self {
        Self { expose_details }
    }

    pub fn report(&self, ctx: &mut AuthenticationContext, failure: &dyn std::error::Error) {
        error!("Authentication failed at the identity provider: {}", failure);
        ctx.response.handle_response();
        if self.expose_details {
            ctx.response.write_body(failure.to_string().as_bytes());
        } else {
            ctx.response.write_body(GENERIC_FAILURE_MESSAGE.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::context::{AuthenticationProperties, STATUS_INTERNAL_SERVER_ERROR};
    use crate::provider::ProviderError;

    #[test]
    fn test_failure_message_written_to_body() {
        let mut ctx = AuthenticationContext::for_failure(AuthenticationProperties::default());
        let failure = ProviderError::Protocol("invalid_grant: code expired".to_string());

        AuthFailureReporter::default().report(&mut ctx, &failure);

        assert!(ctx.response.is_handled());
        assert_eq!(ctx.response.status, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.response.body_text(), failure.to_string());
    }

    #[test]
    fn test_generic_message_when_details_hidden() {
        let mut ctx = AuthenticationContext::for_failure(AuthenticationProperties::default());
        let failure = ProviderError::Protocol("invalid_client".to_string());

        AuthFailureReporter::new(false).report(&mut ctx, &failure);

        assert!(ctx.response.is_handled());
        assert_eq!(ctx.response.body_text(), GENERIC_FAILURE_MESSAGE);
    }
}
