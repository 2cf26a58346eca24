// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod common;

use actix_web::{http::StatusCode, test};
use quire::auth::sessions::SESSION_COOKIE_NAME;

#[actix_web::test]
async fn login_with_correct_password_sets_session_cookie() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form([("password", common::ADMIN_PASSWORD)])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let location = resp
        .headers()
        .get("Location")
        .and_then(|value| value.to_str().ok())
        .expect("redirect location");
    assert_eq!(location, "/admin");

    let set_cookie = resp
        .headers()
        .get("Set-Cookie")
        .and_then(|value| value.to_str().ok())
        .expect("session cookie");
    assert!(set_cookie.starts_with(&format!("{}=qsn_", SESSION_COOKIE_NAME)));
    assert!(set_cookie.contains("HttpOnly"));
}

#[actix_web::test]
async fn login_with_wrong_password_is_rejected() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form([("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get("Set-Cookie").is_none());

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).expect("utf8 body");
    assert!(body.contains("Incorrect password."));
}

#[actix_web::test]
async fn login_redirect_honors_local_return_path() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form([
            ("password", common::ADMIN_PASSWORD),
            ("return_path", "/admin/new"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let location = resp
        .headers()
        .get("Location")
        .and_then(|value| value.to_str().ok())
        .expect("redirect location");
    assert_eq!(location, "/admin/new");
}

#[actix_web::test]
async fn login_redirect_rejects_external_return_path() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form([
            ("password", common::ADMIN_PASSWORD),
            ("return_path", "https://evil.example/phish"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let location = resp
        .headers()
        .get("Location")
        .and_then(|value| value.to_str().ok())
        .expect("redirect location");
    assert_eq!(location, "/admin");
}

#[actix_web::test]
async fn state_changing_post_without_csrf_token_is_forbidden() {
    let harness = common::TestHarness::new();
    let auth = harness.admin_auth();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/save")
        .cookie(auth.cookie.clone())
        .set_form([("title", "No Token"), ("body", "x")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn state_changing_post_with_wrong_csrf_token_is_forbidden() {
    let harness = common::TestHarness::new();
    let auth = harness.admin_auth();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/delete/hello")
        .cookie(auth.cookie.clone())
        .set_form([("csrf_token", "not-the-right-token")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The record must survive a rejected delete.
    assert!(harness
        .app_state
        .store
        .get("hello")
        .expect("get")
        .is_some());
}

#[actix_web::test]
async fn csrf_tokens_are_bound_to_their_session() {
    let harness = common::TestHarness::new();
    let first = harness.admin_auth();
    let second = harness.admin_auth();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    // A valid token from another session must not pass.
    let req = test::TestRequest::post()
        .uri("/admin/delete/hello")
        .cookie(first.cookie.clone())
        .set_form([("csrf_token", second.csrf_token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn logout_destroys_the_session() {
    let harness = common::TestHarness::new();
    let auth = harness.admin_auth();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::post()
        .uri("/admin/logout")
        .cookie(auth.cookie.clone())
        .set_form([("csrf_token", auth.csrf_token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    // The cookie no longer opens the admin area.
    let req = test::TestRequest::get()
        .uri("/admin")
        .cookie(auth.cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp
        .headers()
        .get("Location")
        .and_then(|value| value.to_str().ok())
        .expect("redirect location");
    assert!(location.starts_with("/admin/login"));
}

#[actix_web::test]
async fn login_form_is_reachable_without_session() {
    let harness = common::TestHarness::new();
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;

    let req = test::TestRequest::get().uri("/admin/login").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).expect("utf8 body");
    assert!(body.contains("name=\"password\""));
}
