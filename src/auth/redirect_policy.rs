// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Redirect policy for outbound challenges
//!
//! Two rewrites happen before a request is forwarded to the identity provider:
//!
//! - **Forced HTTPS**: behind a TLS-terminating proxy the application sees plain
//!   HTTP and would build an `http:` callback URI. When forced HTTPS is enabled the
//!   scheme token is substituted in place; the rest of the URI is left untouched.
//! - **Redirect loop breaker**: a 401 raised for a request that already carries an
//!   authenticated identity means "authenticated but not allowed". Sending that user
//!   back to the provider would log them in again and land on the same 401, forever.
//!   The response is turned into a handled 403 instead.

use log::{debug, info};

use super::context::{AuthenticationContext, STATUS_FORBIDDEN, STATUS_UNAUTHORIZED};

const INSECURE_SCHEME_TOKEN: &str = "http:";
const SECURE_SCHEME_TOKEN: &str = "https:";

#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectPolicy {
    force_https: bool,
}

impl RedirectPolicy {
    pub fn new(force_https: bool) -> Self {
        Self { force_https }
    }

    pub fn force_https(&self) -> bool {
        self.force_https
    }

    /// Rewrite the outbound redirect URI scheme when forced HTTPS is enabled
    pub fn rewrite_outbound(&self, ctx: &mut AuthenticationContext) {
        if !self.force_https {
            return;
        }
        let redirect_uri = &mut ctx.protocol_message.redirect_uri;
        if redirect_uri.contains(INSECURE_SCHEME_TOKEN) {
            *redirect_uri = redirect_uri.replace(INSECURE_SCHEME_TOKEN, SECURE_SCHEME_TOKEN);
            debug!("Outbound redirect URI rewritten to {}", redirect_uri);
        }
    }

    /// Convert `401 + already authenticated` into a handled 403
    pub fn intercept_unauthorized(&self, ctx: &mut AuthenticationContext) {
        if ctx.response.status == STATUS_UNAUTHORIZED && ctx.request_authenticated {
            info!("Authenticated request denied access, answering 403 instead of a new challenge");
            ctx.response.status = STATUS_FORBIDDEN;
            ctx.response.handle_response();
        }
    }
}
