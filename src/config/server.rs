// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP server configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Rocket server hosting the CMS front.
///
/// ### TLS Configuration
///
/// For HTTPS, both `cert` and `key` must be provided as Base64-encoded PEM files.
/// If either is missing the server runs without TLS, which is the usual setup behind
/// a TLS-terminating reverse proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server name reported in the `Server` header.
    #[serde(default = "default_name")]
    pub name: String,

    /// The network address the server binds to. Default is "127.0.0.1".
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port, valid range is 1-65534. Default is 5000.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Key used to encrypt the session and handshake cookies.
    ///
    /// Base64 encoded, 256 or 512 bits. When absent Rocket generates a volatile key,
    /// which only works in debug builds and drops all sessions on restart.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// TLS certificate chain in PEM format, Base64 encoded.
    #[serde(default)]
    pub cert: Option<String>,

    /// TLS private key in PEM format, Base64 encoded.
    #[serde(default)]
    pub key: Option<String>,
}

fn default_name() -> String {
    format!("CmsOidcServer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            address: default_address(),
            port: default_port(),
            secret_key: None,
            cert: None,
            key: None,
        }
    }
}
