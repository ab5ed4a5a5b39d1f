// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Challenge catcher
//!
//! Every 401 produced by a guard is turned into an OpenID Connect challenge: a
//! redirect to the provider's authorization endpoint, unless the redirect hook
//! handled the response itself (an authenticated request lacking a role gets 403).

use log::{debug, error, warn};
use rocket::response::Redirect;
use rocket::{catch, Request, Responder};

use super::session::{read_principal, store_handshake};
use super::HandledResponse;
use crate::auth::context::{STATUS_INTERNAL_SERVER_ERROR, STATUS_UNAUTHORIZED};
use crate::auth::flow::{ChallengeOutcome, ChallengeRequest, OidcHandler};

#[derive(Debug, Responder)]
pub enum ChallengeResponse {
    Redirect(Redirect),
    Handled(HandledResponse),
}

/// Configured public base URL, else the scheme and authority the request came in on
fn request_base_url(request: &Request<'_>, public_base_url: Option<&str>) -> String {
    if let Some(base_url) = public_base_url {
        return base_url.to_string();
    }
    let config = request.rocket().config();
    let scheme = if config.tls_enabled() { "https" } else { "http" };
    match request.host() {
        Some(host) => format!("{}://{}", scheme, host),
        None => {
            warn!(
                "No Host header and no public base URL, callback URI uses localhost:{}",
                config.port
            );
            format!("{}://localhost:{}", scheme, config.port)
        }
    }
}

#[catch(401)]
pub async fn challenge(request: &Request<'_>) -> ChallengeResponse {
    let Some(handler) = request.rocket().state::<OidcHandler>() else {
        error!("OIDC handler is not registered");
        return ChallengeResponse::Handled(HandledResponse::new(
            STATUS_INTERNAL_SERVER_ERROR,
            Vec::new(),
        ));
    };

    let challenge = ChallengeRequest {
        base_url: request_base_url(request, handler.settings().public_base_url.as_deref()),
        return_url: Some(request.uri().to_string()),
        status: STATUS_UNAUTHORIZED,
        request_authenticated: read_principal(request.cookies())
            .is_some_and(|principal| principal.is_authenticated()),
    };
    debug!("Challenging request for {}", request.uri());

    match handler.challenge(challenge).await {
        Ok(ChallengeOutcome::Redirect { location, handshake }) => {
            if let Err(err) = store_handshake(request.cookies(), &handshake) {
                error!("Failed to store the login handshake: {}", err);
                return ChallengeResponse::Handled(HandledResponse::new(
                    STATUS_INTERNAL_SERVER_ERROR,
                    Vec::new(),
                ));
            }
            ChallengeResponse::Redirect(Redirect::found(location))
        }
        Ok(ChallengeOutcome::Handled { status, body }) => {
            ChallengeResponse::Handled(HandledResponse::new(status, body))
        }
        Err(err) => {
            error!("Failed to build the login challenge: {}", err);
            ChallengeResponse::Handled(HandledResponse::new(
                STATUS_INTERNAL_SERVER_ERROR,
                Vec::new(),
            ))
        }
    }
}
