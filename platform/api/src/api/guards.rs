//! Request guards sitting between the auth middleware and the handlers.
//! The middleware never fails a request; these decide what each route
//! actually requires.

use uuid::Uuid;

use super::error::Result;
use super::middleware::auth::AuthError;
use super::request_context::{AuthData, RequestContext};
use crate::auth::{Identity, Resolution};

/// The request must carry a valid session.
pub async fn auth_guard(context: &RequestContext) -> Result<AuthData> {
    context.auth().await.ok_or_else(|| AuthError::NotLoggedIn.into())
}

/// The request must carry a valid session whose profile exists. The
/// profile-incomplete state maps to a distinct status so clients can route
/// to profile completion.
pub async fn identity_guard(context: &RequestContext) -> Result<(AuthData, Identity)> {
    let auth = auth_guard(context).await?;

    match &auth.resolution {
        Resolution::ProfileIncomplete => Err(AuthError::ProfileIncomplete.into()),
        Resolution::Resolved(identity) => {
            let identity = identity.clone();
            Ok((auth, identity))
        }
    }
}

/// Only app admins may pass.
pub fn app_admin_guard(identity: &Identity) -> Result<()> {
    if identity.is_app_admin() {
        return Ok(());
    }

    Err(AuthError::Forbidden.into())
}

/// App admins, or admins of the given organization, may pass.
pub fn org_admin_guard(identity: &Identity, organization_id: Uuid) -> Result<()> {
    if identity.is_admin_of(organization_id) {
        return Ok(());
    }

    Err(AuthError::Forbidden.into())
}
