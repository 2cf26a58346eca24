// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use quire::admin;
use quire::app_state::AppState;
use quire::auth::password::hash_password;
use quire::auth::sessions::SESSION_COOKIE_NAME;
use quire::config::{AdminConfig, AppConfig, LoggingConfig, ServerConfig, ValidatedConfig};
use quire::public;
use quire::runtime_paths::RuntimePaths;
use quire::store::{PageFields, PageStatus};
use quire::util::test_fixtures::TestFixtureRoot;

pub const ADMIN_PASSWORD: &str = "test-password";

pub struct TestHarness {
    pub fixture: TestFixtureRoot,
    pub config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub app_state: web::Data<AppState>,
}

pub struct AuthSession {
    pub cookie: actix_web::cookie::Cookie<'static>,
    pub csrf_token: String,
}

#[derive(Clone)]
pub struct AppBundle {
    pub app_state: web::Data<AppState>,
    pub admin_path: String,
}

impl TestHarness {
    pub fn new() -> Self {
        let fixture = TestFixtureRoot::new_unique("quire-test-suite").expect("fixture root");
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");

        let config = build_config();
        let app_state = web::Data::new(AppState::new(config.clone(), runtime_paths.clone()));

        seed_content(&app_state);

        Self {
            fixture,
            config,
            runtime_paths,
            app_state,
        }
    }

    /// Creates a logged-in admin session without going through the login
    /// form, returning its cookie and CSRF token.
    pub fn admin_auth(&self) -> AuthSession {
        let handle = self.app_state.sessions.create();
        assert!(!handle.session_id.is_empty(), "session store unavailable");
        let cookie =
            actix_web::cookie::Cookie::new(SESSION_COOKIE_NAME, handle.session_id.clone());

        AuthSession {
            cookie: cookie.into_owned(),
            csrf_token: handle.csrf_token,
        }
    }

    pub fn app_bundle(&self) -> AppBundle {
        AppBundle {
            app_state: self.app_state.clone(),
            admin_path: self.config.admin.path.clone(),
        }
    }
}

fn build_config() -> ValidatedConfig {
    let password_hash = hash_password(ADMIN_PASSWORD).expect("password hash");
    ValidatedConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7080,
            workers: 1,
        },
        admin: AdminConfig {
            path: "/admin".to_string(),
            password_hash,
            session_ttl_seconds: 600,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
        },
        app: AppConfig {
            name: "Quire Test".to_string(),
            description: "Test site".to_string(),
        },
    }
}

fn seed_content(app_state: &AppState) {
    let seeds = [
        (
            "hello",
            PageFields {
                title: "Hello World".to_string(),
                date: "2026-01-05".to_string(),
                status: PageStatus::Published,
                body: "# Welcome\n\nThis is **bold** and [a link](/older).".to_string(),
            },
        ),
        (
            "older",
            PageFields {
                title: "Older Post".to_string(),
                date: "2026-01-01".to_string(),
                status: PageStatus::Published,
                body: "Some older text.".to_string(),
            },
        ),
        (
            "secret-draft",
            PageFields {
                title: "Secret Draft".to_string(),
                date: "2026-01-06".to_string(),
                status: PageStatus::Draft,
                body: "Not ready yet.".to_string(),
            },
        ),
    ];

    for (slug, fields) in seeds {
        app_state.store.save(slug, &fields).expect("seed page");
    }
}

pub fn build_test_app(
    bundle: AppBundle,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let admin_path = bundle.admin_path;

    App::new()
        .app_data(bundle.app_state)
        .configure(move |cfg| admin::configure(cfg, &admin_path))
        .configure(public::configure)
        .default_service(web::route().to(test_default_not_found))
}

async fn test_default_not_found(
    app_state: web::Data<AppState>,
) -> actix_web::Result<actix_web::HttpResponse> {
    quire::public::error::serve_404(
        &app_state.error_renderer,
        Some(app_state.templates.as_ref()),
    )
}
