use std::sync::{Arc, Weak};

use hyper::{Body, Request, StatusCode};
use routerify::prelude::RequestExt as _;
use serde::de::DeserializeOwned;

use super::error::{ApiError, Result};
use super::request_context::RequestContext;
use crate::global::GlobalState;

pub trait RequestExt {
    fn get_global(&self) -> Result<Arc<GlobalState>>;

    fn get_req_context(&self) -> RequestContext;
}

impl RequestExt for Request<Body> {
    fn get_global(&self) -> Result<Arc<GlobalState>> {
        self.data::<Weak<GlobalState>>()
            .expect("global state not set")
            .upgrade()
            .ok_or_else(|| "failed to upgrade global state".into())
    }

    fn get_req_context(&self) -> RequestContext {
        self.context::<RequestContext>().unwrap_or_default()
    }
}

/// Reads and deserializes a json request body. Malformed json is the
/// client's fault, not ours.
pub async fn parse_json_body<T: DeserializeOwned>(req: &mut Request<Body>) -> Result<T> {
    let body = hyper::body::to_bytes(req.body_mut())
        .await
        .map_err(|err| {
            common::http::RouteError::from((StatusCode::BAD_REQUEST, "failed to read request body"))
                .with_source(Some(ApiError::ParseHttpBody(err)))
        })?;

    serde_json::from_slice(&body).map_err(|err| {
        common::http::RouteError::from((
            StatusCode::BAD_REQUEST,
            format!("invalid request body: {err}"),
        ))
        .with_source(Some(ApiError::ParseJson(err)))
    })
}

/// Returns the first value of a query parameter, if present.
pub fn query_param(req: &Request<Body>, name: &str) -> Option<String> {
    let query = req.uri().query()?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
