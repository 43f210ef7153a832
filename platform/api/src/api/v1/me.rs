use std::sync::Arc;

use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{map_store_error, ApiError, Result};
use crate::api::ext::{parse_json_body, query_param, RequestExt as _};
use crate::api::guards::{auth_guard, identity_guard};
use crate::auth::Resolution;
use crate::global::GlobalState;
use crate::permissions;
use crate::store::ProfileStore;

#[derive(serde::Deserialize)]
struct UpdateProfileRequest {
    first_name: String,
    last_name: String,
}

/// The active organization context, selected by the `org` query parameter.
fn active_organization(req: &Request<Body>) -> Result<Option<Uuid>> {
    match query_param(req, "org") {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| (StatusCode::BAD_REQUEST, "org must be a uuid").into()),
    }
}

async fn me(req: Request<Body>) -> Result<Response<Body>> {
    let context = req.get_req_context();
    let auth = auth_guard(&context).await?;

    let identity = match &auth.resolution {
        // A distinct state, not an error: the client routes to profile
        // completion.
        Resolution::ProfileIncomplete => {
            return Ok(make_response!(
                StatusCode::OK,
                json!({
                    "profile": null,
                    "profile_incomplete": true,
                })
            ));
        }
        Resolution::Resolved(identity) => identity,
    };

    let role = identity.effective_role(active_organization(&req)?);

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "profile": identity.profile,
            "organizations": identity.memberships,
            "role": role,
            "redirect": permissions::default_redirect(role),
            "profile_incomplete": false,
        })
    ))
}

async fn update(mut req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let body: UpdateProfileRequest = parse_json_body(&mut req).await?;

    let first_name = body.first_name.trim();
    let last_name = body.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "first and last name are required").into());
    }

    let profile = global
        .store
        .update_profile_names(identity.profile.id, first_name, last_name)
        .await
        .map_err(map_store_error)?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "profile": profile,
        })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", me)
        .post("/", update)
        .build()
        .expect("failed to build router")
}
