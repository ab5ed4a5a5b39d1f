// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use log::{error, info, warn};
use rocket::http::CookieJar;
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{get, Responder, State};

use super::session::{
    clear_session, read_id_token, store_id_token, store_principal, take_handshake,
    AuthenticatedPrincipal, CmsAdministrator,
};
use super::HandledResponse;
use crate::auth::claims::ClaimsPrincipal;
use crate::auth::context::{STATUS_FORBIDDEN, STATUS_INTERNAL_SERVER_ERROR};
use crate::auth::flow::{CallbackOutcome, CallbackParams, OidcHandler};

#[derive(Debug, Responder)]
pub enum FlowResponse {
    Redirect(Redirect),
    Handled(HandledResponse),
}

/// Authorization-code callback, mounted at the configured callback path
#[get("/?<code>&<state>&<error>&<error_description>")]
pub async fn callback(
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    handler: &State<OidcHandler>,
    cookies: &CookieJar<'_>,
) -> FlowResponse {
    let params = CallbackParams {
        code,
        state,
        error,
        error_description,
    };
    let handshake = take_handshake(cookies);

    match handler.complete(params, handshake).await {
        Ok(CallbackOutcome::SignedIn {
            principal,
            redirect_uri,
            id_token,
        }) => {
            if let Err(err) = store_principal(cookies, &principal) {
                error!("Failed to store the session: {}", err);
                return FlowResponse::Handled(HandledResponse::new(
                    STATUS_INTERNAL_SERVER_ERROR,
                    Vec::new(),
                ));
            }
            if let Some(id_token) = id_token {
                store_id_token(cookies, &id_token);
            }
            FlowResponse::Redirect(Redirect::found(redirect_uri))
        }
        Ok(CallbackOutcome::Failed { status, body }) => {
            FlowResponse::Handled(HandledResponse::new(status, body))
        }
        Ok(CallbackOutcome::NoIdentity) => {
            warn!("Login completed without an identity");
            FlowResponse::Handled(HandledResponse::new(
                STATUS_FORBIDDEN,
                "login produced no identity",
            ))
        }
        Err(err) => {
            error!("Sign-in could not be completed: {}", err);
            FlowResponse::Handled(HandledResponse::new(
                STATUS_INTERNAL_SERVER_ERROR,
                "sign-in could not be completed",
            ))
        }
    }
}

/// Sign out locally, then at the provider
#[get("/logout")]
pub fn logout(handler: &State<OidcHandler>, cookies: &CookieJar<'_>) -> FlowResponse {
    let id_token = read_id_token(cookies);
    clear_session(cookies);
    match handler.logout_url(id_token) {
        Ok(location) => {
            info!("Session cleared, redirecting to the provider logout");
            FlowResponse::Redirect(Redirect::found(location))
        }
        Err(err) => {
            error!("Failed to build the logout URL: {}", err);
            FlowResponse::Handled(HandledResponse::new(
                STATUS_INTERNAL_SERVER_ERROR,
                Vec::new(),
            ))
        }
    }
}

#[get("/")]
pub fn index(user: AuthenticatedPrincipal) -> RawHtml<String> {
    let name = user.0.name().unwrap_or("user").to_string();
    RawHtml(format!(
        "<!DOCTYPE html><html><body><h1>Welcome {}</h1><a href=\"/logout\">Sign out</a></body></html>",
        escape_html(&name)
    ))
}

/// Back-office entry point
#[get("/cms")]
pub fn cms(admin: CmsAdministrator) -> RawHtml<String> {
    let name = admin.0.name().unwrap_or("administrator").to_string();
    RawHtml(format!(
        "<!DOCTYPE html><html><body><h1>CMS</h1><p>Signed in as {}</p></body></html>",
        escape_html(&name)
    ))
}

#[get("/me")]
pub fn me(user: AuthenticatedPrincipal) -> Json<ClaimsPrincipal> {
    Json(user.0)
}

fn escape_html(value: &str) -> String {
    handlebars::html_escape(value)
}
