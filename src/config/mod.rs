// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the CMS OpenID Connect front
//!
//! The configuration is backed by a YAML file and validated against an embedded JSON
//! schema before being deserialized, then checked against rules the schema cannot
//! express (see [`utils::validate_specific_rules`]).
//!
//! ## Configuration Structure
//!
//! - `server`: binding, cookie encryption key and TLS material
//! - `oidc`: client registration at the identity provider
//! - `token_validation`: id token checks and claim types
//! - `claims`: roles granted to every signed-in user
//! - `sync`: where signed-in users are synchronized to
//! - `auth_failure`: failure response behavior
//!
//! ## Usage
//!
//! ```no_run
//! use rust_cms_oidc::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8443),                                  // Port
//!     Some("0.0.0.0".to_string()),                 // Address
//!     Some("https://dev-1.okta.com".to_string()),  // Provider domain
//!     None,                                        // Client id
//!     None,                                        // Client secret
//!     Some(false),                                 // Force HTTPS redirect
//! );
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod oidc;
pub mod pipeline;
pub mod server;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use oidc::{OidcConfig, TokenValidationConfig};
pub use pipeline::{AuthFailureConfig, ClaimsConfig, SyncConfig};
pub use server::ServerConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Role granted to users signing in through the identity provider
pub const DEFAULT_ADMIN_ROLE: &str = "WebAdmins";

/// Root configuration structure.
///
/// Every section falls back to its defaults when omitted, so an empty file is a
/// valid (development) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub oidc: OidcConfig,

    #[serde(default)]
    pub token_validation: TokenValidationConfig,

    #[serde(default)]
    pub claims: ClaimsConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub auth_failure: AuthFailureConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample_path = path.as_ref().with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file failing
    /// validation leaves a `.sample.yaml` next to it and returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(err) = utils::validate_against_schema(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            return Err(err);
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate an in-memory configuration with the same rules as [`Config::from_file`]
    pub fn validate(&self) -> Result<()> {
        let json_value =
            serde_json::to_value(self).context("Failed to convert configuration to JSON")?;
        utils::validate_against_schema(&json_value)?;
        utils::validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only the provided values override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `port` - TCP port for the server
    /// * `address` - Network address for the server to bind to
    /// * `domain` - Identity provider domain
    /// * `client_id` - OIDC client identifier
    /// * `client_secret` - OIDC client secret
    /// * `force_https` - Rewrite outbound redirect URIs to HTTPS
    pub fn apply_args(
        &mut self,
        port: Option<u16>,
        address: Option<String>,
        domain: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        force_https: Option<bool>,
    ) {
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }
        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }
        if let Some(domain) = domain {
            debug!("Overriding provider domain from command line: {}", domain);
            self.oidc.domain = domain;
        }
        if let Some(client_id) = client_id {
            debug!("Overriding client id from command line: {}", client_id);
            self.oidc.client_id = client_id;
        }
        if let Some(secret) = client_secret {
            debug!("Overriding client secret from command line");
            self.oidc.client_secret = secret;
        }
        if let Some(force_https) = force_https {
            debug!("Overriding forced HTTPS redirect from command line: {}", force_https);
            self.oidc.force_https_redirect = force_https;
        }
    }
}
