use std::sync::Arc;

use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::prelude::RequestExt as _;
use routerify::Router;
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{map_store_error, ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt as _};
use crate::api::guards::{app_admin_guard, identity_guard, org_admin_guard};
use crate::database::{MembershipRole, OrganizationSummary};
use crate::global::GlobalState;
use crate::store::{MembershipStore, OrganizationStore, ProfileStore};

#[derive(serde::Deserialize)]
struct CreateOrganizationRequest {
    name: String,
    /// App admins may provision an organization for another user.
    admin_user_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct JoinOrganizationRequest {
    code: String,
}

#[derive(serde::Deserialize)]
struct AssignMemberRequest {
    user_id: Uuid,
    /// Deserialization alone keeps `app-admin` out: it is not a
    /// representable membership role.
    role: MembershipRole,
}

fn uuid_param(req: &Request<Body>, name: &str) -> Result<Uuid> {
    req.param(name)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("{name} must be a uuid")).into())
}

/// App admin view: every active organization with its member count, counted
/// in one batched query.
async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;
    app_admin_guard(&identity)?;

    let organizations = global
        .store
        .list_active_organizations()
        .await
        .map_err(map_store_error)?;

    let ids: Vec<Uuid> = organizations.iter().map(|o| o.id).collect();
    let mut counts = global
        .store
        .member_counts(&ids)
        .await
        .map_err(map_store_error)?;

    let summaries: Vec<OrganizationSummary> = organizations
        .into_iter()
        .map(|organization| OrganizationSummary {
            member_count: counts.remove(&organization.id).unwrap_or(0),
            organization,
        })
        .collect();

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "organizations": summaries
        })
    ))
}

async fn create(mut req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let body: CreateOrganizationRequest = parse_json_body(&mut req).await?;

    // Provisioning on behalf of someone else is an app admin operation.
    let admin_user_id = match body.admin_user_id {
        Some(other) if other != identity.profile.id => {
            app_admin_guard(&identity)?;
            other
        }
        _ => identity.profile.id,
    };

    let organization = global
        .provisioner
        .create_organization_with_admin(&body.name, admin_user_id)
        .await
        .map_err(map_store_error)?;

    Ok(make_response!(
        StatusCode::CREATED,
        json!({
            "success": true,
            "organization": organization,
        })
    ))
}

async fn join(mut req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let body: JoinOrganizationRequest = parse_json_body(&mut req).await?;

    let membership = global
        .provisioner
        .join_by_code(identity.profile.id, &body.code)
        .await
        .map_err(map_store_error)?;

    Ok(make_response!(
        StatusCode::CREATED,
        json!({
            "success": true,
            "membership": membership,
        })
    ))
}

async fn deactivate(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;
    app_admin_guard(&identity)?;

    let organization_id = uuid_param(&req, "orgId")?;

    global
        .store
        .deactivate_organization(organization_id)
        .await
        .map_err(map_store_error)?;

    tracing::info!(organization = %organization_id, "organization deactivated");

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true
        })
    ))
}

async fn list_members(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let organization_id = uuid_param(&req, "orgId")?;
    org_admin_guard(&identity, organization_id)?;

    let members = global
        .store
        .memberships_for_organization(organization_id)
        .await
        .map_err(map_store_error)?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "members": members
        })
    ))
}

async fn assign_member(mut req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let organization_id = uuid_param(&req, "orgId")?;
    org_admin_guard(&identity, organization_id)?;

    let body: AssignMemberRequest = parse_json_body(&mut req).await?;

    global
        .store
        .profile_by_id(body.user_id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| RouteError::from((StatusCode::NOT_FOUND, "profile not found")))?;

    let membership = global
        .store
        .insert_membership(body.user_id, organization_id, body.role)
        .await
        .map_err(map_store_error)?;

    tracing::info!(
        organization = %organization_id,
        user = %body.user_id,
        role = %body.role,
        "membership assigned"
    );

    Ok(make_response!(
        StatusCode::CREATED,
        json!({
            "success": true,
            "membership": membership,
        })
    ))
}

async fn remove_member(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let context = req.get_req_context();
    let (_, identity) = identity_guard(&context).await?;

    let organization_id = uuid_param(&req, "orgId")?;
    org_admin_guard(&identity, organization_id)?;

    let user_id = uuid_param(&req, "userId")?;

    // Idempotent by contract: removing an already removed member succeeds.
    global
        .store
        .delete_membership(user_id, organization_id)
        .await
        .map_err(map_store_error)?;

    tracing::info!(
        organization = %organization_id,
        user = %user_id,
        "membership removed"
    );

    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .expect("failed to build response"))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", list)
        .post("/", create)
        .post("/join", join)
        .post("/:orgId/deactivate", deactivate)
        .get("/:orgId/members", list_members)
        .post("/:orgId/members", assign_member)
        .delete("/:orgId/members/:userId", remove_member)
        .build()
        .expect("failed to build router")
}
