// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_cms_oidc::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

fn assert_sample_created(config_path: &Path) -> Result<()> {
    let sample_path = config_path.with_extension("sample.yaml");
    assert!(sample_path.exists(), "Sample config file was not created");

    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_schema_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Valid YAML, wrong types
    fs::write(
        &config_path,
        r#"
server:
  port: "not-an-integer"
oidc:
  scopes: "openid"
  force_https_redirect: "yes"
"#,
    )?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");
    assert_sample_created(&config_path)
}

#[test]
fn test_unknown_section_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
visualization:
  port: 8080
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    assert_sample_created(&config_path)
}

#[test]
fn test_port_out_of_range_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
server:
  port: 99999
  address: "127.0.0.1"
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("validation failed"));
    assert_sample_created(&config_path)
}

#[test]
fn test_specific_rule_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Passes the schema, fails the openid scope rule
    fs::write(
        &config_path,
        r#"
oidc:
  scopes: ["profile", "email"]
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("openid"));
    assert_sample_created(&config_path)
}

#[test]
fn test_empty_role_list_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
claims:
  roles: []
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("validation failed"));
    assert_sample_created(&config_path)
}

#[test]
fn test_malformed_yaml_is_an_error() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "server: [unclosed")?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}
