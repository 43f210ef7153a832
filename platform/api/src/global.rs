use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::provision::Provisioner;
use crate::store::PgStore;

pub struct GlobalState {
    pub config: AppConfig,
    pub store: Arc<PgStore>,
    pub provisioner: Provisioner,
    pub shutdown: CancellationToken,
}

impl GlobalState {
    pub fn new(config: AppConfig, db: Arc<sqlx::PgPool>) -> Self {
        let store = Arc::new(PgStore::new(db));

        Self {
            config,
            provisioner: Provisioner::new(store.clone(), store.clone(), store.clone()),
            store,
            shutdown: CancellationToken::new(),
        }
    }
}
