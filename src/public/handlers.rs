// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::app_state::AppState;
use crate::markdown;
use crate::public::error;
use crate::store::{PageStatus, StoreError, is_valid_slug};
use crate::templates::render_minijinja_template;
use actix_web::{HttpResponse, Result, web};
use log::debug;
use minijinja::context;
use serde::Serialize;

const EXCERPT_CHARS: usize = 180;

#[derive(Serialize)]
struct HomeEntry {
    slug: String,
    title: String,
    date: String,
    excerpt: String,
}

pub async fn home(app_state: web::Data<AppState>) -> Result<HttpResponse> {
    let pages = match app_state.store.list() {
        Ok(pages) => pages,
        Err(err) => {
            log::error!("Failed to list pages for home: {}", err);
            return error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
    };

    let mut entries = Vec::new();
    for page in pages
        .into_iter()
        .filter(|page| page.status == PageStatus::Published)
    {
        let excerpt = match markdown::plain_excerpt(&page.body, EXCERPT_CHARS) {
            Ok(excerpt) => excerpt,
            Err(err) => {
                log::error!("Failed to build excerpt for {}: {}", page.slug, err);
                return error::serve_500(
                    &app_state.error_renderer,
                    Some(app_state.templates.as_ref()),
                );
            }
        };
        entries.push(HomeEntry {
            slug: page.slug,
            title: page.title,
            date: page.date,
            excerpt,
        });
    }

    let context = context! {
        app_name => &app_state.config.app.name,
        app_description => &app_state.config.app.description,
        pages => entries,
    };

    match render_minijinja_template(app_state.templates.as_ref(), "public/home.html", context) {
        Ok(html) => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html)),
        Err(err) => {
            log::error!("Failed to render home template: {}", err);
            error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            )
        }
    }
}

/// Catch-all for paths no route claims, such as nested segments.
pub async fn not_found(app_state: web::Data<AppState>) -> Result<HttpResponse> {
    error::serve_404(
        &app_state.error_renderer,
        Some(app_state.templates.as_ref()),
    )
}

pub async fn page(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let slug = path.into_inner();
    if !is_valid_slug(&slug) {
        debug!("Rejected page request with invalid slug: {}", slug);
        return error::serve_404(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        );
    }

    let page = match app_state.store.get(&slug) {
        Ok(Some(page)) => page,
        Ok(None) => {
            return error::serve_404(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
        Err(StoreError::InvalidSlug(_)) => {
            return error::serve_404(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
        Err(err) => {
            log::error!("Failed to load page {}: {}", slug, err);
            return error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
    };

    // Drafts are invisible on the public site.
    if page.status == PageStatus::Draft {
        return error::serve_404(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        );
    }

    let html = match markdown::render_markdown(&page.body) {
        Ok(html) => html,
        Err(err) => {
            log::error!("Failed to render page {}: {}", slug, err);
            return error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
    };

    let context = context! {
        app_name => &app_state.config.app.name,
        app_description => &app_state.config.app.description,
        page => context! {
            slug => &page.slug,
            title => &page.title,
            date => &page.date,
            html => html,
        },
    };

    match render_minijinja_template(app_state.templates.as_ref(), "public/page.html", context) {
        Ok(html) => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html)),
        Err(err) => {
            log::error!("Failed to render page template: {}", err);
            error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            )
        }
    }
}
