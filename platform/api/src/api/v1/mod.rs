use std::sync::Arc;

use common::http::RouteError;
use hyper::Body;
use routerify::Router;

use super::error::ApiError;
use crate::global::GlobalState;

pub mod auth;
pub mod health;
pub mod me;
pub mod organizations;
pub mod permissions;
pub mod users;

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .scope("/health", health::routes(global))
        .scope("/auth", auth::routes(global))
        .scope("/me", me::routes(global))
        .scope("/permissions", permissions::routes(global))
        .scope("/organizations", organizations::routes(global))
        .scope("/users", users::routes(global))
        .build()
        .expect("failed to build router")
}
