use std::sync::Arc;

use chrono::{Duration, Utc};
use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{map_store_error, ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt as _};
use crate::api::guards::auth_guard;
use crate::api::jwt::JwtState;
use crate::database::{NewProfile, Profile};
use crate::global::GlobalState;
use crate::store::{OrganizationStore, ProfileStore};

/// Sessions last a week unless the login asks for less.
const DEFAULT_SESSION_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(serde::Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    /// Provisions a new organization with this user as its admin.
    organization_name: Option<String>,
    /// Joins an existing organization as a member.
    organization_code: Option<String>,
}

#[derive(serde::Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    /// The duration of the session in seconds, capped at the default.
    validity: Option<i64>,
}

async fn issue_session(
    global: &Arc<GlobalState>,
    profile: &Profile,
    validity: Option<i64>,
) -> Result<String> {
    let validity = validity
        .unwrap_or(DEFAULT_SESSION_SECONDS)
        .clamp(60, DEFAULT_SESSION_SECONDS);

    let session = global
        .store
        .create_session(profile.id, Utc::now() + Duration::seconds(validity))
        .await
        .map_err(map_store_error)?;

    JwtState::from(session)
        .serialize(&global.config.jwt)
        .ok_or_else(|| "failed to serialize session token".into())
}

async fn register(mut req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let body: RegisterRequest = parse_json_body(&mut req).await?;

    let email = body.email.trim().to_lowercase();
    if let Err(message) = Profile::validate_email(&email) {
        return Err((StatusCode::BAD_REQUEST, message).into());
    }
    if let Err(message) = Profile::validate_password(&body.password) {
        return Err((StatusCode::BAD_REQUEST, message).into());
    }

    let first_name = body.first_name.trim();
    let last_name = body.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "first and last name are required").into());
    }

    if global
        .store
        .profile_by_email(&email)
        .await
        .map_err(map_store_error)?
        .is_some()
    {
        return Err((StatusCode::CONFLICT, "a profile already exists for this email").into());
    }

    let profile = global
        .store
        .insert_profile(NewProfile {
            id: Uuid::new_v4(),
            email,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_app_admin: false,
            password_hash: Profile::hash_password(&body.password),
        })
        .await
        .map_err(map_store_error)?;

    tracing::info!(profile = %profile.id, "profile created");

    // Organization setup mirrors the signup metadata: a name provisions a
    // new organization with this user as admin, a code joins an existing
    // one as a member.
    let organization = match (&body.organization_name, &body.organization_code) {
        (Some(name), _) => Some(
            global
                .provisioner
                .create_organization_with_admin(name, profile.id)
                .await
                .map_err(map_store_error)?,
        ),
        (None, Some(code)) => {
            let membership = global
                .provisioner
                .join_by_code(profile.id, code)
                .await
                .map_err(map_store_error)?;

            global
                .store
                .organization_by_id(membership.organization_id)
                .await
                .map_err(map_store_error)?
        }
        (None, None) => None,
    };

    let token = issue_session(&global, &profile, None).await?;

    Ok(make_response!(
        StatusCode::CREATED,
        json!({
            "success": true,
            "token": token,
            "profile": profile,
            "organization": organization,
        })
    ))
}

async fn login(mut req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let body: LoginRequest = parse_json_body(&mut req).await?;

    let profile = global
        .store
        .profile_by_email(body.email.trim())
        .await
        .map_err(map_store_error)?;

    // A missing profile and a bad password are indistinguishable on purpose.
    let Some(profile) = profile else {
        return Err((StatusCode::UNAUTHORIZED, "invalid email or password").into());
    };
    if !profile.verify_password(&body.password) {
        return Err((StatusCode::UNAUTHORIZED, "invalid email or password").into());
    }

    if !profile.is_active {
        return Err((StatusCode::FORBIDDEN, "this profile has been deactivated").into());
    }

    let token = issue_session(&global, &profile, body.validity).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "token": token,
            "profile": profile,
        })
    ))
}

async fn logout(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();

    let auth = auth_guard(&context).await?;

    global
        .store
        .delete_session(auth.session.id)
        .await
        .map_err(map_store_error)?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true
        })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .post("/register", register)
        .post("/login", login)
        .post("/logout", logout)
        .build()
        .expect("failed to build router")
}
