//! # canteen: School Canteen Platform Service
//!
//! `canteen` backs a school canteen platform. Schools import their official student registry
//! and parents enroll their own children by declaring them; a declaration is accepted only
//! when it matches a student of the school's registry.
//!
//! ## Overview
//!
//! School staff upload the registry as a PDF, CSV/TSV or Excel file. The upload is turned into
//! rows of text, interpreted as students (with or without a header row), normalized and
//! deduplicated, and then atomically replaces the school's previous registry. A file that
//! yields no valid student leaves the previous registry untouched.
//!
//! Parents enroll a child by declaring first name, last name, birth date, class and student
//! code. The declaration is matched against the registry in tiers: exact normalized identity
//! first, then student code plus birth date with class and name used to choose between several
//! candidates. A registry student can be linked to at most one child record.
//!
//! ## Architecture
//!
//! - [`registry`]: text normalization, file extraction, row interpretation, import pipeline
//!   and enrollment matching
//! - [`db`]: the [`db::Store`] abstraction with a PostgreSQL and an in-memory implementation
//! - [`api`]: HTTP handlers and request/response models under `/api/v1`
//! - [`auth`]: identity forwarded by the auth gateway and role-based permissions
//! - [`config`]: YAML + environment configuration via figment
//! - [`telemetry`]: tracing subscriber and optional OTLP export
//!
//! ## Quick Start
//!
//! ```ignore
//! use canteen::{Application, Config};
//!
//! let config = Config::load(&args)?;
//! let app = Application::new(config).await?;
//! app.serve(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod registry;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use config::{CorsOrigin, DatabaseConfig, PoolSettings};
use db::{InMemoryStore, PgStore, Store};
use openapi::ApiDoc;

pub use types::{ChildId, ImportId, RegistryRowId, SchoolId, UserId};

/// Room left in the request body limit for multipart boundaries and the other form fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .store(Arc::new(PgStore::new(pool)))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
}

/// Get the canteen database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    Ok(options.connect(url).await?)
}

/// Create the store the configuration asks for, running migrations against PostgreSQL.
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Memory { schools } => {
            info!(schools = schools.len(), "Using in-memory store, data will be lost on shutdown");
            let store = InMemoryStore::with_schools(schools.iter().cloned()).await;
            Ok((Arc::new(store), None))
        }
        DatabaseConfig::External { url, pool } => {
            info!("Using external database");
            let pool = connect_pool(url, pool).await?;
            migrator().run(&pool).await?;
            Ok((Arc::new(PgStore::new(pool.clone())), Some(pool)))
        }
    }
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        if config.cors.allow_credentials {
            anyhow::bail!("CORS wildcard origin cannot be combined with allow_credentials");
        }
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/api/v1/registry/import` and `/api/v1/registry` for school staff
/// - `/api/v1/children` for parents
/// - `/healthz` for liveness probes
/// - `/docs` for the OpenAPI reference
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = usize::try_from(state.config.registry.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        .route(
            "/registry/import",
            post(api::handlers::registry::import_registry_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/registry", get(api::handlers::registry::list_registry))
        .route(
            "/children",
            post(api::handlers::children::enroll).get(api::handlers::children::list_my_children),
        );

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct that owns the router, the store and the database pool.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] sets up the store (running migrations for PostgreSQL)
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown future resolves, in-flight requests finish and the pool closes
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting canteen with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;
        let mut app = Self::new_with_store(config, store)?;
        app.pool = pool;
        Ok(app)
    }

    /// Create an application over an already constructed store
    pub fn new_with_store(config: Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let state = AppState::builder().store(store).config(config.clone()).build();
        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            pool: None,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Canteen listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}
