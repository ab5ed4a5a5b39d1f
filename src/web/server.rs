// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::{debug, info};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::Header;
use rocket::{catchers, routes, Build, Request, Response, Rocket};

use super::{catchers as web_catchers, routes as web_routes, search};
use crate::auth::{self, OidcHandler, UserSynchronizer};
use crate::config::Config;
use crate::provider::{IdentityProvider, OktaProvider};

/// Disable caching of every response; they all depend on the session
pub struct NoStore;

#[rocket::async_trait]
impl Fairing for NoStore {
    fn info(&self) -> Info {
        Info {
            name: "Add Cache-Control: no-store to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Cache-Control", "no-store"));
    }
}

/// Rocket figment for the `server` section
///
/// # Errors
///
/// Fails when the TLS material is not valid base64.
pub fn figment_from_config(config: &Config) -> Result<Figment> {
    let server = &config.server;
    let mut figment = rocket::Config::figment()
        .merge(("ident", server.name.clone()))
        .merge(("limits", Limits::new().limit("json", 1.mebibytes())))
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
        .merge(("log_level", LogLevel::Normal));

    if let Some(secret_key) = &server.secret_key {
        figment = figment.merge(("secret_key", secret_key.clone()));
    }

    if let (Some(cert), Some(key)) = (&server.cert, &server.key) {
        debug!("SSL certificates found in configuration, enabling TLS");
        let cert_data = BASE64_STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
        let key_data = BASE64_STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));
        info!("TLS enabled for web server");
    }

    Ok(figment)
}

/// Build the server talking to the configured Okta authorization server
pub fn build_rocket(figment: Figment, config: &Config) -> Result<Rocket<Build>> {
    let provider = OktaProvider::new(&config.oidc, &config.token_validation)
        .context("Failed to build the identity provider client")?;
    info!("Identity provider issuer: {}", provider.issuer());
    let synchronizer = auth::build_synchronizer(config)?;
    build_rocket_with(figment, config, Arc::new(provider), synchronizer)
}

/// Build the server with explicit collaborators
pub fn build_rocket_with(
    figment: Figment,
    config: &Config,
    provider: Arc<dyn IdentityProvider>,
    synchronizer: Arc<dyn UserSynchronizer>,
) -> Result<Rocket<Build>> {
    let events = Arc::new(auth::build_events(config, synchronizer));
    let handler = OidcHandler::new(provider, events, auth::oidc_settings(config));
    let templates = search::templates().context("Failed to register the page templates")?;
    let callback_path = config.oidc.callback_path.clone();

    let rocket = rocket::custom(figment)
        .attach(NoStore)
        .mount(
            "/",
            routes![
                web_routes::index,
                web_routes::cms,
                web_routes::me,
                web_routes::logout,
                search::search_json,
                search::search_html,
            ],
        )
        .mount(callback_path, routes![web_routes::callback])
        .register("/", catchers![web_catchers::challenge])
        .manage(handler)
        .manage(templates);
    Ok(rocket)
}
