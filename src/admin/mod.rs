// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::web;

pub mod handlers;
pub mod middleware;

/// Registers the admin area under the configured path. The login routes sit
/// in front of the session middleware; everything else requires a valid
/// session cookie.
pub fn configure(cfg: &mut web::ServiceConfig, admin_path: &str) {
    cfg.route(
        &format!("{}/login", admin_path),
        web::get().to(handlers::login_form),
    )
    .route(
        &format!("{}/login", admin_path),
        web::post().to(handlers::login_submit),
    )
    .service(
        web::scope(admin_path)
            .wrap(middleware::RequireAdminMiddleware::new())
            .route("", web::get().to(handlers::dashboard))
            .route("/new", web::get().to(handlers::new_form))
            .route("/edit/{slug}", web::get().to(handlers::edit_form))
            .route("/save", web::post().to(handlers::save))
            .route("/delete/{slug}", web::get().to(handlers::delete_confirm))
            .route("/delete/{slug}", web::post().to(handlers::delete))
            .route("/logout", web::post().to(handlers::logout)),
    );
}
