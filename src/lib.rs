// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect sign-in for a content management system
//!
//! The crate is organised in four layers:
//!
//! - [`config`]: YAML configuration validated against an embedded JSON schema
//! - [`auth`]: the authentication pipeline plugged into the authorization-code flow
//! - [`provider`]: the identity provider client (Okta)
//! - [`web`]: the Rocket server, its session cookies and the challenge catcher

pub mod auth;
pub mod config;
pub mod provider;
pub mod web;
