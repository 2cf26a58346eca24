// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::admin::middleware::AdminSession;
use crate::app_state::AppState;
use crate::auth::password::verify_password;
use crate::auth::sessions::{SESSION_COOKIE_NAME, token_matches};
use crate::public::error;
use crate::store::{PageFields, PageStatus, is_valid_slug, slugify};
use crate::templates::render_minijinja_template;
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::http::header::LOCATION;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, Result, web};
use minijinja::context;
use serde::Deserialize;
use serde::Serialize;

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub return_path: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub return_path: Option<String>,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub deleted: Option<String>,
}

#[derive(Deserialize)]
pub struct EditQuery {
    #[serde(default)]
    pub saved: Option<String>,
}

#[derive(Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub original_slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Serialize)]
struct DashboardRow {
    slug: String,
    title: String,
    date: String,
    status: &'static str,
}

pub async fn login_form(
    req: HttpRequest,
    query: web::Query<LoginQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    // An already-authenticated admin has no business on the login page.
    if let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) {
        if app_state.sessions.validate(cookie.value()).is_some() {
            return Ok(redirect_to(&app_state.config.admin.path));
        }
    }

    render_login(&app_state, query.return_path.as_deref(), None)
}

pub async fn login_submit(
    form: web::Form<LoginForm>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let verified = match verify_password(&form.password, &app_state.config.admin.password_hash) {
        Ok(verified) => verified,
        Err(err) => {
            log::error!("Password verification failed: {}", err);
            return error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
    };

    if !verified {
        log::warn!("Failed admin login attempt");
        let page = render_login(
            &app_state,
            form.return_path.as_deref(),
            Some("Incorrect password."),
        )?;
        return Ok(HttpResponse::Unauthorized()
            .content_type("text/html; charset=utf-8")
            .body(page.into_body()));
    }

    let handle = app_state.sessions.create();
    if handle.session_id.is_empty() {
        log::error!("Session store returned an empty session");
        return error::serve_500(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        );
    }

    let destination = sanitize_return_path(
        form.return_path.as_deref(),
        &app_state.config.admin.path,
    );
    let cookie = Cookie::build(SESSION_COOKIE_NAME, handle.session_id.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    log::info!("Admin login succeeded");
    Ok(HttpResponse::Found()
        .insert_header((LOCATION, destination))
        .cookie(cookie)
        .finish())
}

pub async fn logout(
    req: HttpRequest,
    form: web::Form<CsrfForm>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = match checked_session(&req, &form.csrf_token) {
        Ok(session) => session,
        Err(response) => return Ok(response),
    };

    app_state.sessions.destroy(&session.session_id);

    let mut removal = Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    removal.set_max_age(CookieDuration::ZERO);

    Ok(HttpResponse::Found()
        .insert_header((
            LOCATION,
            format!("{}/login", app_state.config.admin.path),
        ))
        .cookie(removal)
        .finish())
}

pub async fn dashboard(
    req: HttpRequest,
    query: web::Query<DashboardQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = match admin_session(&req) {
        Some(session) => session,
        None => return Ok(missing_session_response()),
    };

    let pages = match app_state.store.list() {
        Ok(pages) => pages,
        Err(err) => {
            log::error!("Failed to list pages for dashboard: {}", err);
            return error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            );
        }
    };

    let published = pages
        .iter()
        .filter(|page| page.status == PageStatus::Published)
        .count();
    let rows: Vec<DashboardRow> = pages
        .iter()
        .map(|page| DashboardRow {
            slug: page.slug.clone(),
            title: page.title.clone(),
            date: page.date.clone(),
            status: page.status.as_str(),
        })
        .collect();

    let context = context! {
        app_name => &app_state.config.app.name,
        admin_path => &app_state.config.admin.path,
        csrf_token => &session.csrf_token,
        deleted => query.deleted.as_deref() == Some("1"),
        stats => context! {
            total => rows.len(),
            published => published,
            draft => rows.len() - published,
        },
        pages => rows,
    };

    render_admin_page(&app_state, "admin/dashboard.html", context)
}

pub async fn new_form(req: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = match admin_session(&req) {
        Some(session) => session,
        None => return Ok(missing_session_response()),
    };

    let editor = EditorView {
        title: String::new(),
        slug: String::new(),
        date: today(),
        status: PageStatus::Published,
        body: String::new(),
        original_slug: String::new(),
        saved: false,
        error: None,
    };
    render_editor(&app_state, &session, editor)
}

pub async fn edit_form(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<EditQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = match admin_session(&req) {
        Some(session) => session,
        None => return Ok(missing_session_response()),
    };

    let slug = path.into_inner();
    let page = match load_page_or_404(&app_state, &slug) {
        Ok(page) => page,
        Err(response) => return response,
    };

    let editor = EditorView {
        title: page.title,
        slug: page.slug.clone(),
        date: page.date,
        status: page.status,
        body: page.body,
        original_slug: page.slug,
        saved: query.saved.as_deref() == Some("1"),
        error: None,
    };
    render_editor(&app_state, &session, editor)
}

pub async fn save(
    req: HttpRequest,
    form: web::Form<SaveForm>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = match checked_session(&req, &form.csrf_token) {
        Ok(session) => session,
        Err(response) => return Ok(response),
    };

    let form = form.into_inner();
    let title = form.title.trim().to_string();
    if title.is_empty() {
        let editor = EditorView {
            title,
            slug: form.slug,
            date: form.date,
            status: PageStatus::parse(&form.status),
            body: form.body,
            original_slug: form.original_slug,
            saved: false,
            error: Some("A title is required."),
        };
        return render_editor(&app_state, &session, editor);
    }

    let requested = if form.slug.trim().is_empty() {
        &title
    } else {
        &form.slug
    };
    let slug = slugify(requested);
    if slug.is_empty() {
        let editor = EditorView {
            title,
            slug: form.slug,
            date: form.date,
            status: PageStatus::parse(&form.status),
            body: form.body,
            original_slug: form.original_slug,
            saved: false,
            error: Some("The slug must contain at least one letter or digit."),
        };
        return render_editor(&app_state, &session, editor);
    }

    let date = if form.date.trim().is_empty() {
        today()
    } else {
        form.date.trim().to_string()
    };
    let fields = PageFields {
        title,
        date,
        status: PageStatus::parse(&form.status),
        body: form.body,
    };

    if let Err(err) = app_state.store.save(&slug, &fields) {
        log::error!("Failed to save page {}: {}", slug, err);
        return error::serve_500(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        );
    }

    // A renamed page keeps its old file until the new one is safely on
    // disk, so a failed save never loses the record.
    let original = form.original_slug.trim();
    if !original.is_empty() && original != slug && is_valid_slug(original) {
        if let Err(err) = app_state.store.delete(original) {
            log::warn!("Failed to remove renamed page {}: {}", original, err);
        }
    }

    Ok(redirect_to(&format!(
        "{}/edit/{}?saved=1",
        app_state.config.admin.path, slug
    )))
}

pub async fn delete_confirm(
    req: HttpRequest,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = match admin_session(&req) {
        Some(session) => session,
        None => return Ok(missing_session_response()),
    };

    let slug = path.into_inner();
    let page = match load_page_or_404(&app_state, &slug) {
        Ok(page) => page,
        Err(response) => return response,
    };

    let context = context! {
        app_name => &app_state.config.app.name,
        admin_path => &app_state.config.admin.path,
        csrf_token => &session.csrf_token,
        page => context! {
            slug => &page.slug,
            title => &page.title,
        },
    };
    render_admin_page(&app_state, "admin/delete_confirm.html", context)
}

pub async fn delete(
    req: HttpRequest,
    path: web::Path<String>,
    form: web::Form<CsrfForm>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if let Err(response) = checked_session(&req, &form.csrf_token) {
        return Ok(response);
    }

    let slug = path.into_inner();
    if !is_valid_slug(&slug) {
        return error::serve_404(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        );
    }

    if let Err(err) = app_state.store.delete(&slug) {
        log::error!("Failed to delete page {}: {}", slug, err);
        return error::serve_500(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        );
    }

    log::info!("Deleted page {}", slug);
    Ok(redirect_to(&format!(
        "{}?deleted=1",
        app_state.config.admin.path
    )))
}

struct EditorView {
    title: String,
    slug: String,
    date: String,
    status: PageStatus,
    body: String,
    original_slug: String,
    saved: bool,
    error: Option<&'static str>,
}

fn render_editor(
    app_state: &AppState,
    session: &AdminSession,
    view: EditorView,
) -> Result<HttpResponse> {
    let context = context! {
        app_name => &app_state.config.app.name,
        admin_path => &app_state.config.admin.path,
        csrf_token => &session.csrf_token,
        original_slug => &view.original_slug,
        saved => view.saved,
        error => view.error,
        page => context! {
            title => &view.title,
            slug => &view.slug,
            date => &view.date,
            status => view.status.as_str(),
            body => &view.body,
        },
    };
    render_admin_page(app_state, "admin/editor.html", context)
}

fn render_login(
    app_state: &AppState,
    return_path: Option<&str>,
    error_message: Option<&str>,
) -> Result<HttpResponse> {
    let context = context! {
        app_name => &app_state.config.app.name,
        admin_path => &app_state.config.admin.path,
        return_path => return_path,
        error => error_message,
    };
    render_admin_page(app_state, "admin/login.html", context)
}

fn render_admin_page(
    app_state: &AppState,
    template_name: &str,
    context: minijinja::Value,
) -> Result<HttpResponse> {
    match render_minijinja_template(app_state.templates.as_ref(), template_name, context) {
        Ok(html) => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
            .body(html)),
        Err(err) => {
            log::error!("Failed to render {}: {}", template_name, err);
            error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            )
        }
    }
}

fn load_page_or_404(
    app_state: &AppState,
    slug: &str,
) -> std::result::Result<crate::store::Page, Result<HttpResponse>> {
    if !is_valid_slug(slug) {
        return Err(error::serve_404(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        ));
    }
    match app_state.store.get(slug) {
        Ok(Some(page)) => Ok(page),
        Ok(None) => Err(error::serve_404(
            &app_state.error_renderer,
            Some(app_state.templates.as_ref()),
        )),
        Err(err) => {
            log::error!("Failed to load page {}: {}", slug, err);
            Err(error::serve_500(
                &app_state.error_renderer,
                Some(app_state.templates.as_ref()),
            ))
        }
    }
}

fn admin_session(req: &HttpRequest) -> Option<AdminSession> {
    req.extensions().get::<AdminSession>().cloned()
}

/// State-changing POSTs must carry the CSRF token bound to the session.
/// A missing session or a token mismatch both end the request here.
fn checked_session(
    req: &HttpRequest,
    submitted_token: &str,
) -> std::result::Result<AdminSession, HttpResponse> {
    let session = match admin_session(req) {
        Some(session) => session,
        None => return Err(missing_session_response()),
    };
    if submitted_token.is_empty() || !token_matches(submitted_token, &session.csrf_token) {
        log::warn!("Rejected admin POST with invalid CSRF token");
        return Err(HttpResponse::Forbidden()
            .content_type("text/plain; charset=utf-8")
            .body("Invalid CSRF token"));
    }
    Ok(session)
}

fn missing_session_response() -> HttpResponse {
    // The middleware always attaches a session; reaching this means the
    // route was registered outside the admin scope.
    log::error!("Admin handler invoked without a session extension");
    HttpResponse::InternalServerError()
        .content_type("text/plain; charset=utf-8")
        .body("Session missing")
}

fn sanitize_return_path(raw: Option<&str>, admin_path: &str) -> String {
    match raw {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => admin_path.to_string(),
    }
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.to_string()))
        .finish()
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
