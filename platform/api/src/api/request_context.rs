use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::Resolution;
use crate::database::Session;

/// What the auth middleware attaches for a request that presented a valid
/// session token.
#[derive(Clone)]
pub struct AuthData {
    pub session: Session,
    pub resolution: Resolution,
}

#[derive(Default)]
pub struct ContextData {
    pub auth: Option<AuthData>,
}

#[derive(Default, Clone)]
pub struct RequestContext(Arc<RwLock<ContextData>>);

impl RequestContext {
    pub async fn set_auth(&self, data: AuthData) {
        let mut guard = self.0.write().await;
        guard.auth = Some(data);
    }

    pub async fn auth(&self) -> Option<AuthData> {
        let guard = self.0.read().await;
        guard.auth.clone()
    }
}
