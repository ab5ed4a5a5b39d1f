// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use thiserror::Error;

use super::flow::LoginStage;
use super::sync::SyncError;
use crate::provider::ProviderError;

/// Errors surfaced by the authentication flow
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("authentication state mismatch")]
    StateMismatch,

    #[error("missing authentication handshake")]
    MissingHandshake,

    #[error("invalid provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("session encoding failed: {0}")]
    Session(#[from] serde_json::Error),

    #[error("login attempt cannot move from {from} to {to}")]
    InvalidTransition { from: LoginStage, to: LoginStage },
}
