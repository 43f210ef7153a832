use std::sync::Arc;

use common::http::RouteError;
use hyper::http::header;
use hyper::{Body, StatusCode};
use routerify::prelude::RequestExt as _;
use routerify::Middleware;

use crate::api::error::ApiError;
use crate::api::ext::RequestExt as _;
use crate::api::jwt::JwtState;
use crate::api::request_context::{AuthData, RequestContext};
use crate::auth;
use crate::global::GlobalState;

#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("invalid token")]
    InvalidToken,
    #[error("session expired")]
    SessionExpired,
    #[error("profile incomplete")]
    ProfileIncomplete,
    #[error("forbidden")]
    Forbidden,
    #[error("failed to fetch session")]
    FetchSession,
    #[error("failed to resolve identity")]
    ResolveIdentity,
}

impl From<AuthError> for RouteError<ApiError> {
    fn from(value: AuthError) -> Self {
        RouteError::from(match &value {
            AuthError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "not logged in"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid token"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "session expired"),
            AuthError::ProfileIncomplete => (StatusCode::PRECONDITION_REQUIRED, "profile incomplete"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AuthError::FetchSession => (StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch session"),
            AuthError::ResolveIdentity => {
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to resolve identity")
            }
        })
        .with_source(Some(ApiError::Auth(value)))
    }
}

/// Attaches the resolved identity to the request context when a valid
/// bearer token is presented. Requests without an Authorization header pass
/// through anonymously; the route guards decide what is actually required.
pub fn auth_middleware(_: &Arc<GlobalState>) -> Middleware<Body, RouteError<ApiError>> {
    Middleware::pre(|req| async move {
        let context = RequestContext::default();
        req.set_context(context.clone());

        let Some(token) = req.headers().get(header::AUTHORIZATION) else {
            return Ok(req);
        };

        let global = req.get_global()?;

        let Ok(token) = token.to_str() else {
            return Err(AuthError::InvalidToken.into());
        };

        let Some(token) = token.strip_prefix("Bearer ") else {
            return Err(AuthError::InvalidToken.into());
        };

        let Some(jwt) = JwtState::verify(&global.config.jwt, token) else {
            return Err(AuthError::InvalidToken.into());
        };

        let session = global
            .store
            .session_by_id(jwt.session_id)
            .await
            .map_err(|_| AuthError::FetchSession)?
            .ok_or(AuthError::InvalidToken)?;

        if !session.is_valid() {
            return Err(AuthError::SessionExpired.into());
        }

        let resolution = auth::resolve(&*global.store, &*global.store, session.user_id)
            .await
            .map_err(|_| AuthError::ResolveIdentity)?;

        context.set_auth(AuthData { session, resolution }).await;

        Ok(req)
    })
}
