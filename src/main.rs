// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the CMS OpenID Connect front server
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use rust_cms_oidc::config::{self, Config};
use rust_cms_oidc::web;

/// CMS front server signing users in through OpenID Connect
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Web server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Web server address
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Identity provider domain, e.g. https://dev-123456.okta.com
    #[arg(long)]
    domain: Option<String>,

    /// OIDC client id
    #[arg(long)]
    client_id: Option<String>,

    /// OIDC client secret
    #[arg(long, env = "OIDC_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Rewrite outbound redirect URIs to HTTPS
    #[arg(long)]
    force_https: Option<bool>,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port,
        args.address.clone(),
        args.domain.clone(),
        args.client_id.clone(),
        args.client_secret.clone(),
        args.force_https,
    );
    // Overrides go through the same rules as the file
    config.validate()?;

    info!(
        "Starting {} on {}:{}",
        config.server.name, config.server.address, config.server.port
    );
    let figment = web::figment_from_config(&config)?;
    let rocket = web::build_rocket(figment, &config)?;
    let _rocket = rocket.launch().await?;

    Ok(())
}
