// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::app_state::AppState;
use crate::auth::sessions::SESSION_COOKIE_NAME;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::LOCATION,
    web,
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use urlencoding;

/// Session data attached to requests that passed the admin gate. Handlers
/// read the CSRF token from here when rendering forms.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub session_id: String,
    pub csrf_token: String,
}

/// Middleware guarding the admin area: requests without a valid session
/// cookie are redirected to the login page with a return path.
pub struct RequireAdminMiddleware;

impl RequireAdminMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequireAdminMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAdminMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAdminMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAdminMiddlewareService { service }))
    }
}

pub struct RequireAdminMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequireAdminMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session = req.app_data::<web::Data<AppState>>().and_then(|state| {
            let cookie = req.request().cookie(SESSION_COOKIE_NAME)?;
            state.sessions.validate(cookie.value())
        });

        let admin_path = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.config.admin.path.clone())
            .unwrap_or_else(|| "/admin".to_string());

        match session {
            Some(handle) => {
                req.extensions_mut().insert(AdminSession {
                    session_id: handle.session_id,
                    csrf_token: handle.csrf_token,
                });
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            None => {
                let (req, _) = req.into_parts();
                let current_path = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or(req.uri().path());
                let redirect_location = format!(
                    "{}/login?return_path={}",
                    admin_path,
                    urlencoding::encode(current_path)
                );

                let response = HttpResponse::Found()
                    .insert_header((LOCATION, redirect_location))
                    .finish()
                    .map_into_right_body();

                Box::pin(async move { Ok(ServiceResponse::new(req, response)) })
            }
        }
    }
}
