use std::sync::Arc;

use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use crate::api::error::{map_store_error, ApiError, Result};
use crate::api::ext::RequestExt as _;
use crate::api::guards::{app_admin_guard, identity_guard};
use crate::global::GlobalState;
use crate::store::ProfileStore;

/// App admin view of every active profile across all organizations.
async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;
    app_admin_guard(&identity)?;

    let users = global
        .store
        .list_active_profiles()
        .await
        .map_err(map_store_error)?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "users": users
        })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", list)
        .build()
        .expect("failed to build router")
}
