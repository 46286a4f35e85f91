//! Test utilities for integration testing (available with `test-utils` feature).

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{password, session},
    billing::{LedgerStore, MemoryLedgerStore, PredictionGateway, tiers::ModelTier},
    config::{Config, PoolSettings},
    db::{
        handlers::{PgLedgerStore, Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    inference::{Features, InferenceError, Predictor},
    payment_providers::dummy::DummyProvider,
};
use async_trait::async_trait;
use axum_test::TestServer;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};

/// Password given to every user made by [`create_test_user`]
pub const TEST_PASSWORD: &str = "correct-horse";

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 1,
        min_connections: 0,
        ..Default::default()
    };
    config.auth.allow_registration = true;
    config
}

/// A pool that never connects unless a query is actually run. Handlers that stay off the
/// database can be tested without Postgres.
fn lazy_pool(config: &Config) -> PgPool {
    PgPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_millis(100))
        .connect_lazy(&config.database.url)
        .expect("Failed to create lazy pool")
}

fn build_state(db: PgPool, config: Config, ledger: Arc<dyn LedgerStore>, predictor: Arc<dyn Predictor>) -> AppState {
    let gateway = Arc::new(PredictionGateway::new(ledger.clone(), predictor, config.inference.timeout));
    AppState::builder()
        .db(db)
        .config(config)
        .ledger(ledger)
        .gateway(gateway)
        .payments(Arc::new(DummyProvider::new(false)))
        .build()
}

/// In-memory ledger, a predictor that always answers `1`, no database.
pub fn create_test_state() -> AppState {
    create_test_state_with_ledger(Arc::new(MemoryLedgerStore::new()), Arc::new(FixedPredictor(1)))
}

pub fn create_test_state_with_ledger(ledger: Arc<MemoryLedgerStore>, predictor: Arc<dyn Predictor>) -> AppState {
    let config = create_test_config();
    build_state(lazy_pool(&config), config, ledger, predictor)
}

/// Everything backed by `pool`, including the ledger.
pub fn create_test_state_with_pool(pool: PgPool) -> AppState {
    let ledger = Arc::new(PgLedgerStore::new(pool.clone()));
    build_state(pool, create_test_config(), ledger, Arc::new(FixedPredictor(1)))
}

pub fn test_server(state: AppState) -> TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// An active, non-superuser account with [`TEST_PASSWORD`]
pub async fn create_test_user(pool: &PgPool, email: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let request = UserCreateDBRequest {
        email: email.to_string(),
        full_name: Some("Test User".to_string()),
        password_hash: Some(password::hash_string(TEST_PASSWORD).expect("Failed to hash password")),
        is_active: true,
        is_superuser: false,
    };
    Users::new(&mut conn).create(&request).await.expect("Failed to create test user")
}

pub fn create_test_token(user: &CurrentUser, config: &Config) -> String {
    session::create_session_token(user, config).expect("Failed to create test token")
}

/// A creditworthy applicant
pub fn applicant() -> Features {
    Features {
        married: 1.0,
        income: 5000.0,
        education: 1.0,
        loan_amount: 150.0,
        credit_history: 1.0,
    }
}

/// Always predicts the wrapped label
pub struct FixedPredictor(pub i64);

#[async_trait]
impl Predictor for FixedPredictor {
    async fn predict(&self, _tier: ModelTier, _features: &Features) -> Result<i64, InferenceError> {
        Ok(self.0)
    }
}

/// Never produces a prediction
pub struct FailingPredictor;

#[async_trait]
impl Predictor for FailingPredictor {
    async fn predict(&self, tier: ModelTier, _features: &Features) -> Result<i64, InferenceError> {
        Err(InferenceError::InvalidArtifact {
            tier,
            reason: "stub predictor always fails".to_string(),
        })
    }
}

/// Sleeps before answering, to hold requests in flight
pub struct SlowPredictor {
    delay: Duration,
    label: i64,
}

impl SlowPredictor {
    pub fn new(delay: Duration, label: i64) -> Self {
        Self { delay, label }
    }
}

#[async_trait]
impl Predictor for SlowPredictor {
    async fn predict(&self, _tier: ModelTier, _features: &Features) -> Result<i64, InferenceError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.label)
    }
}
