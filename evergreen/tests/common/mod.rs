// Common test utilities for integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use evergreen::api::{create_router, AppState};
use evergreen::config::{Config, DatabaseConfig, PaymentConfig};
use evergreen::db::{Database, DatabaseBackend, LibSqlBackend};
use evergreen::services::{PaymentProcessor, SimulatedProcessor};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A running server on an ephemeral port backed by a temp-dir database.
pub struct TestServer {
    pub addr: SocketAddr,
    pub db: Database,
    _dir: TempDir,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn family_url(&self, memorial_id: &str) -> String {
        format!("{}/api/v1/memorials/{memorial_id}/family", self.base_url())
    }
}

pub async fn spawn_app() -> TestServer {
    spawn_app_with(Arc::new(SimulatedProcessor::new(Duration::ZERO))).await
}

pub async fn spawn_app_with(payments: Arc<dyn PaymentProcessor>) -> TestServer {
    init_test_logger();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("evergreen_test.db");

    let mut config = Config::default();
    config.database = DatabaseConfig::local(format!("file:{}", db_path.display()));
    config.payments = PaymentConfig {
        simulated_delay_ms: 0,
        ..PaymentConfig::default()
    };

    let db = Database::new(&config.database)
        .await
        .expect("Failed to create database");
    let backend: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(db.clone()));
    let app = create_router(AppState::new(config, backend, payments));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestServer { addr, db, _dir: dir }
}
