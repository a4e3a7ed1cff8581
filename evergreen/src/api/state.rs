use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::services::{FamilyService, PaymentProcessor};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub family: FamilyService,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let family = FamilyService::new(db.clone(), payments);
        Self {
            config: Arc::new(config),
            db,
            family,
        }
    }
}
