// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! Schema handling and the validation rules that the JSON schema cannot express.

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, warn};
use url::Url;

use super::{Config, DEFAULT_ADMIN_ROLE};

const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// Called when the `--show-config-schema` flag is provided on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_cms_oidc --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

/// Validate a configuration document against the embedded schema
pub fn validate_against_schema(document: &serde_json::Value) -> Result<()> {
    let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA).with_context(|| {
        debug!("JSON schema string: {}", CONFIG_SCHEMA);
        "Failed to parse JSON schema"
    })?;

    let validator = jsonschema::draft202012::options()
        .should_validate_formats(true)
        .build(&schema)?;

    if let Err(error) = validator.validate(document) {
        anyhow::bail!("Configuration validation failed: {}", error);
    }
    Ok(())
}

/// Check if a string is a valid IP address
///
/// Accepts IPv4/IPv6 addresses and the special values "localhost", "::" and "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

fn absolute_url(value: &str, what: &str) -> Result<Url> {
    let url = Url::parse(value).with_context(|| format!("{} is not an absolute URL: {}", what, value))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("{} is not a hierarchical URL: {}", what, value);
    }
    Ok(url)
}

/// Validates the configuration against rules not covered by the JSON schema.
///
/// # Validation Rules
///
/// - **TLS**: a certificate needs a key and vice versa, both valid base64
/// - **Cookie key**: when set, base64 of 32 or 64 bytes
/// - **Port Range**: 1-65534
/// - **Provider**: domain and post-logout URI are absolute URLs, client id is set,
///   scopes contain `openid`, callback path starts with `/`
/// - **Public base URL**: absolute URL when set
/// - **Claims**: at least one role is injected
/// - **Sync endpoint**: absolute URL when set
///
/// Disabled issuer or audience validation is allowed but logged as a warning, as is
/// a role list without the CMS administrator role.
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");
    let server = &config.server;

    match (&server.cert, &server.key) {
        (Some(cert), Some(key)) => {
            base64::engine::general_purpose::STANDARD
                .decode(cert)
                .context("SSL certificate is not valid base64")?;
            base64::engine::general_purpose::STANDARD
                .decode(key)
                .context("SSL key is not valid base64")?;
        }
        (Some(_), None) => anyhow::bail!("SSL certificate provided without a key"),
        (None, Some(_)) => anyhow::bail!("SSL key provided without a certificate"),
        (None, None) => {}
    }

    if let Some(secret) = &server.secret_key {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(secret)
            .context("Secret key is not valid base64")?;
        if decoded.len() != 32 && decoded.len() != 64 {
            anyhow::bail!(
                "Secret key must be 256 or 512 bits, got {} bits",
                decoded.len() * 8
            );
        }
    }

    if server.port < 1 || server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", server.port);
    }

    if !is_valid_ip_address(&server.address) {
        debug!("Potentially invalid address format: {}", server.address);
    }

    let oidc = &config.oidc;
    absolute_url(&oidc.domain, "Provider domain")?;
    absolute_url(&oidc.post_logout_redirect_uri, "Post logout redirect URI")?;

    if oidc.client_id.trim().is_empty() {
        anyhow::bail!("OIDC client id must not be empty");
    }
    if !oidc.scopes.iter().any(|scope| scope == "openid") {
        anyhow::bail!("OIDC scopes must contain \"openid\"");
    }
    if !oidc.callback_path.starts_with('/') {
        anyhow::bail!(
            "Callback path must start with '/': {}",
            oidc.callback_path
        );
    }

    if let Some(base_url) = &oidc.public_base_url {
        absolute_url(base_url, "Public base URL")?;
    }

    if config.claims.roles.is_empty() {
        anyhow::bail!("At least one role must be added to signed-in users");
    }
    if !config.claims.roles.iter().any(|role| role == DEFAULT_ADMIN_ROLE) {
        warn!(
            "Signed-in users do not receive the {} role, the CMS area is unreachable",
            DEFAULT_ADMIN_ROLE
        );
    }

    if let Some(endpoint) = &config.sync.endpoint {
        absolute_url(endpoint, "Sync endpoint")?;
    }

    if !config.token_validation.validate_issuer {
        warn!("Id token issuer validation is disabled");
    }
    if !config.token_validation.validate_audience {
        warn!("Id token audience validation is disabled");
    }

    Ok(())
}
