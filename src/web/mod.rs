// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket front of the CMS
//!
//! Cookie authentication is the default scheme: routes take
//! [`session::AuthenticatedPrincipal`] or [`session::CmsAdministrator`] guards and
//! a request without a usable session ends in the 401 catcher, which issues the
//! OpenID Connect challenge.

pub mod catchers;
pub mod routes;
pub mod search;
pub mod server;
pub mod session;

use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{Request, Response};

pub use server::{build_rocket, build_rocket_with, figment_from_config};

/// Response whose status and body were decided by the authentication hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HandledResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl<'r> Responder<'r, 'static> for HandledResponse {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        Response::build()
            .status(Status::new(self.status))
            .header(ContentType::Plain)
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}
