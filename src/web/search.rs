// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-cms-oidc project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Site search page
//!
//! No search service is wired in: every query answers an empty result set flagged
//! as disabled. Served as HTML to browsers and to clients stating no preference,
//! as JSON otherwise.

use handlebars::Handlebars;
use log::error;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{get, State};
use serde::{Deserialize, Serialize};

const SEARCH_TEMPLATE: &str = "search";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub number_of_hits: usize,
    pub search_service_disabled: bool,
    pub searched_query: Option<String>,
}

impl SearchPage {
    pub fn disabled(query: Option<String>) -> Self {
        Self {
            hits: Vec::new(),
            number_of_hits: 0,
            search_service_disabled: true,
            searched_query: query,
        }
    }
}

/// Template registry holding the search page
pub fn templates() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_template_string(
        SEARCH_TEMPLATE,
        include_str!("../../resources/templates/search.hbs"),
    )?;
    Ok(handlebars)
}

#[get("/search?<q>", format = "html", rank = 1)]
pub fn search_html(
    q: Option<String>,
    templates: &State<Handlebars<'static>>,
) -> Result<RawHtml<String>, Status> {
    templates
        .render(SEARCH_TEMPLATE, &SearchPage::disabled(q))
        .map(RawHtml)
        .map_err(|err| {
            error!("Failed to render the search page: {}", err);
            Status::InternalServerError
        })
}

#[get("/search?<q>", rank = 2)]
pub fn search_json(q: Option<String>) -> Json<SearchPage> {
    Json(SearchPage::disabled(q))
}
