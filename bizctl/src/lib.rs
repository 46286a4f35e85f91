//! # bizctl: business-record administration with a credit-gated prediction service
//!
//! `bizctl` is an HTTP backend for a small business admin panel. Authenticated users manage five
//! kinds of business records (commercial customers, personal customers, projects, employees and
//! competitors), buy access to three loan-approval models, and spend credits on predictions.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! The **API layer** ([`api`]) exposes `/authentication/*` at the root and everything else under
//! `/api/v1/*`. Every `/api/v1` route authenticates through the
//! [`CurrentUser`](api::models::users::CurrentUser) extractor, which accepts the session cookie or
//! the same JWT as a bearer token.
//!
//! The **database layer** ([`db`]) uses the repository pattern. The five record tables share one
//! generic repository, [`db::handlers::Records`], driven by the
//! [`BusinessRecord`](db::models::records::BusinessRecord) trait.
//!
//! The **billing layer** ([`billing`]) owns the credit ledger. A prediction is admitted against the
//! caller's entitlements, run by a [`Predictor`](inference::Predictor) from [`inference`], and only
//! then settled. Requests for the same user are serialized so the balance can never be overspent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use bizctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = bizctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     bizctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod errors;
pub mod inference;
mod openapi;
pub mod payment_providers;
pub mod sample_data;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    api::handlers::records::record_routes,
    auth::password,
    billing::{LedgerStore, PredictionGateway, tiers::ModelTier},
    config::CorsOrigin,
    db::{
        handlers::{PgLedgerStore, Repository, Users},
        models::{
            records::{CommercialCustomer, Competitor, Employee, PersonalCustomer, Project},
            users::{UserCreateDBRequest, UserUpdateDBRequest},
        },
    },
    inference::ModelRegistry,
    openapi::ApiDoc,
    payment_providers::PaymentProvider,
};
use axum::{
    Json, Router, http,
    http::HeaderValue,
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
pub use types::{RecordId, UserId};

/// Application state shared across all request handlers.
///
/// - `db`: PostgreSQL connection pool
/// - `config`: Application configuration loaded from file and environment
/// - `ledger`: Credit and entitlement storage
/// - `gateway`: Runs paid predictions against `ledger`
/// - `payments`: Charges purchases before credits are granted
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .ledger(ledger)
///     .gateway(gateway)
///     .payments(payments)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub ledger: Arc<dyn LedgerStore>,
    pub gateway: Arc<PredictionGateway>,
    pub payments: Arc<dyn PaymentProvider>,
}

/// Get the bizctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial superuser, or bring an existing account back to superuser.
///
/// Idempotent: on an existing account the password is replaced when one is given, and the
/// account is made active and a superuser again. Returns the user's id either way.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        let update = UserUpdateDBRequest {
            password_hash,
            is_active: Some(true),
            is_superuser: Some(true),
            ..Default::default()
        };
        user_repo.update(existing_user.id, &update).await?;
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let user_create = UserCreateDBRequest {
        email: email.to_string(),
        full_name: None,
        password_hash,
        is_active: true,
        is_superuser: true,
    };
    let created_user = user_repo.create(&user_create).await?;

    tx.commit().await?;
    info!("Created initial superuser {email}");
    Ok(created_user.id)
}

/// Connect, run migrations and make sure the initial superuser exists
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `/healthz` liveness probe
/// - `/authentication/*` registration, login and logout
/// - `/api/v1/*` users, records, payments, predictions and entitlements
/// - `/api/v1/openapi.json` and the rendered reference at `/api/docs`
///
/// # Errors
///
/// Returns an error if the CORS configuration cannot be turned into headers.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/authentication/register", post(api::handlers::auth::register))
        .route("/authentication/login", post(api::handlers::auth::login))
        .route("/authentication/logout", post(api::handlers::auth::logout));

    let api_routes = Router::new()
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Users
        .route("/users", get(api::handlers::users::list_users))
        .route("/users/current", get(api::handlers::users::get_current_user))
        .route(
            "/users/{id}",
            get(api::handlers::users::get_user).delete(api::handlers::users::delete_user),
        )
        // Billing
        .route("/payments/{option}", post(api::handlers::payments::purchase))
        .route("/predictions/{model_name}", post(api::handlers::predictions::predict))
        .route(
            "/entitlements/current",
            get(api::handlers::entitlements::get_current_entitlements),
        )
        .route(
            "/entitlements/current/transactions",
            get(api::handlers::entitlements::list_current_transactions),
        )
        .route(
            "/entitlements/{user_id}",
            get(api::handlers::entitlements::get_user_entitlements),
        );

    // Business records
    let api_routes = record_routes::<CommercialCustomer>(api_routes);
    let api_routes = record_routes::<PersonalCustomer>(api_routes);
    let api_routes = record_routes::<Project>(api_routes);
    let api_routes = record_routes::<Employee>(api_routes);
    let api_routes = record_routes::<Competitor>(api_routes);

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The assembled service: router plus the resources it owns.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations, seeds the
///    initial superuser and loads the prediction models
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests finish, then the pool
///    is closed and telemetry flushed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting bizctl with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;

        // Missing artifacts are not fatal: that tier answers with an error until one appears
        let registry = Arc::new(ModelRegistry::new(
            config.inference.models_dir.clone(),
            config.inference.cache_capacity,
        ));
        let loaded = registry.warm_up().await;
        info!("Loaded {loaded} of {} prediction models", ModelTier::COUNT);

        let ledger: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
        let gateway = Arc::new(PredictionGateway::new(ledger.clone(), registry, config.inference.timeout));
        let payments: Arc<dyn PaymentProvider> = Arc::from(payment_providers::create_provider(config.payment.clone()));

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .ledger(ledger)
            .gateway(gateway)
            .payments(payments)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "bizctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
