// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cookie session and request guards
//!
//! The signed-in principal lives in an encrypted private cookie, as does the
//! handshake between the challenge and the callback. Both use `SameSite=Lax` so
//! that they survive the top-level redirect back from the identity provider.

use log::{debug, warn};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::claims::ClaimsPrincipal;
use crate::auth::flow::Handshake;
use crate::config::DEFAULT_ADMIN_ROLE;

/// Private cookie holding the signed-in principal
pub const SESSION_COOKIE: &str = "cms_session";
/// Private cookie holding the pending login handshake
pub const HANDSHAKE_COOKIE: &str = "oidc_handshake";
/// Private cookie holding the id token, used as logout hint
pub const ID_TOKEN_COOKIE: &str = "oidc_id_token";

fn store<T: Serialize>(
    cookies: &CookieJar<'_>,
    name: &'static str,
    value: &T,
) -> Result<(), serde_json::Error> {
    let mut cookie = Cookie::new(name, serde_json::to_string(value)?);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookies.add_private(cookie);
    Ok(())
}

fn load<T: DeserializeOwned>(cookies: &CookieJar<'_>, name: &str) -> Option<T> {
    let cookie = cookies.get_private(name)?;
    match serde_json::from_str(cookie.value()) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Discarding unreadable {} cookie: {}", name, err);
            None
        }
    }
}

pub fn read_principal(cookies: &CookieJar<'_>) -> Option<ClaimsPrincipal> {
    load(cookies, SESSION_COOKIE)
}

pub fn store_principal(
    cookies: &CookieJar<'_>,
    principal: &ClaimsPrincipal,
) -> Result<(), serde_json::Error> {
    store(cookies, SESSION_COOKIE, principal)
}

pub fn store_handshake(cookies: &CookieJar<'_>, handshake: &Handshake) -> Result<(), serde_json::Error> {
    store(cookies, HANDSHAKE_COOKIE, handshake)
}

/// Read and remove the pending handshake; it is single use
pub fn take_handshake(cookies: &CookieJar<'_>) -> Option<Handshake> {
    let handshake = load(cookies, HANDSHAKE_COOKIE);
    cookies.remove_private(HANDSHAKE_COOKIE);
    handshake
}

pub fn store_id_token(cookies: &CookieJar<'_>, id_token: &str) {
    let mut cookie = Cookie::new(ID_TOKEN_COOKIE, id_token.to_string());
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookies.add_private(cookie);
}

pub fn read_id_token(cookies: &CookieJar<'_>) -> Option<String> {
    cookies
        .get_private(ID_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Drop the local session (principal and id token)
pub fn clear_session(cookies: &CookieJar<'_>) {
    cookies.remove_private(SESSION_COOKIE);
    cookies.remove_private(ID_TOKEN_COOKIE);
}

/// Request guard for a signed-in principal
///
/// Forwards with 401 when there is no valid session, which ends up in the
/// challenge catcher.
pub struct AuthenticatedPrincipal(pub ClaimsPrincipal);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedPrincipal {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match read_principal(request.cookies()) {
            Some(principal) if principal.is_authenticated() => {
                debug!("Authenticated principal: {:?}", principal.name());
                Outcome::Success(AuthenticatedPrincipal(principal))
            }
            _ => {
                debug!("No session cookie found");
                Outcome::Forward(Status::Unauthorized)
            }
        }
    }
}

/// Request guard for principals holding the CMS administrator role
///
/// A signed-in principal without the role is answered with 401 as well; the
/// redirect policy turns that into 403 instead of starting a new login.
pub struct CmsAdministrator(pub ClaimsPrincipal);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CmsAdministrator {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let principal = match AuthenticatedPrincipal::from_request(request).await {
            Outcome::Success(AuthenticatedPrincipal(principal)) => principal,
            Outcome::Forward(status) => return Outcome::Forward(status),
            Outcome::Error(err) => return Outcome::Error(err),
        };
        if principal.is_in_role(DEFAULT_ADMIN_ROLE) {
            Outcome::Success(CmsAdministrator(principal))
        } else {
            debug!(
                "Principal {:?} lacks the {} role",
                principal.name(),
                DEFAULT_ADMIN_ROLE
            );
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}
