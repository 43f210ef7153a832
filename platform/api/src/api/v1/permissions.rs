use std::sync::Arc;

use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{query_param, RequestExt as _};
use crate::api::guards::identity_guard;
use crate::global::GlobalState;
use crate::permissions;

/// Evaluates the caller's effective role against an application path. The
/// frontend asks this before navigating; an `org` query parameter selects
/// the active organization context.
async fn check(req: Request<Body>) -> Result<Response<Body>> {
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let Some(path) = query_param(&req, "path") else {
        return Err((StatusCode::BAD_REQUEST, "path query parameter is required").into());
    };

    let active_organization = match query_param(&req, "org") {
        None => None,
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| RouteError::from((StatusCode::BAD_REQUEST, "org must be a uuid")))?,
        ),
    };

    let role = identity.effective_role(active_organization);

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "role": role,
            "path": path,
            "allowed": permissions::is_path_accessible(role, &path),
            "redirect": permissions::default_redirect(role),
        })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", check)
        .build()
        .expect("failed to build router")
}
