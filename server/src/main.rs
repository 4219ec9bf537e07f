mod api;
mod auth;
mod config;
mod db;
mod error;
mod media;
mod models;
mod schema;
mod store;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::Router;
use config::{AdminAccount, Config, ConfigError, StoreKind};
use media::MediaStore;
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use recipebox_core::{AccountError, NewAccount};
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use store::{MemoryStore, PgStore, Store, StoreError};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<MediaStore>,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] db::DbSetupError),

    #[error("Failed to bootstrap admin account: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid admin account: {0}")]
    Account(#[from] AccountError),

    #[error("Failed to hash admin password: {0}")]
    PasswordHash(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_console_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Quick TCP check to see if the collector is up (resolve hostname first)
fn collector_reachable(endpoint: &str) -> bool {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://");

    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false)
}

/// Initialize telemetry with optional OpenTelemetry export.
/// If OTEL_EXPORTER_OTLP_ENDPOINT is set and reachable, traces and logs are sent to the collector.
/// Otherwise, only console logging is used.
fn init_telemetry() {
    let Some(endpoint) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok() else {
        init_console_logging();
        tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only");
        return;
    };

    if !collector_reachable(&endpoint) {
        init_console_logging();
        tracing::info!(
            "OpenTelemetry endpoint {} not reachable, using console logging only",
            endpoint
        );
        return;
    }

    let service_name =
        env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "recipebox-server".to_string());

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.clone())
        .build();

    let trace_exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            init_console_logging();
            tracing::warn!("Failed to create OTLP trace exporter: {}", e);
            return;
        }
    };

    let log_exporter = match opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            init_console_logging();
            tracing::warn!("Failed to create OTLP log exporter: {}", e);
            return;
        }
    };

    let trace_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();

    let tracer = trace_provider.tracer("recipebox-server");
    opentelemetry::global::set_tracer_provider(trace_provider);

    let log_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(OpenTelemetryTracingBridge::new(&log_provider))
        .init();

    tracing::info!(
        "OpenTelemetry enabled, exporting traces and logs to {} as {}",
        endpoint,
        service_name
    );
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    Router::new()
        .merge(api::public::router())
        .nest("/api/recipes", api::recipes::router())
        .nest("/api/tags", api::tags::router())
        .nest("/api/ingredients", api::ingredients::router())
        .merge(swagger_ui)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}

/// Create the configured superuser unless an account with that email exists.
fn bootstrap_admin(store: &dyn Store, admin: &AdminAccount) -> Result<(), StartupError> {
    let account = NewAccount::superuser(&admin.email, &admin.password)?;
    if store.find_user_by_email(&account.email)?.is_some() {
        tracing::debug!("Admin account {} already exists", account.email);
        return Ok(());
    }

    let password_hash = auth::hash_password(&account.password)
        .map_err(|e| StartupError::PasswordHash(e.to_string()))?;
    let user = store.create_user(&account, &password_hash)?;
    tracing::info!(user_id = user.id, "Created admin account {}", user.email);
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn Store>, StartupError> {
    match config.store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing { key: "DATABASE_URL" })?;
            Ok(Arc::new(PgStore::new(db::create_pool(database_url)?)))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::load()?;

    let store = open_store(&config)?;
    if let Some(admin) = &config.admin {
        bootstrap_admin(store.as_ref(), admin)?;
    }

    let state = AppState {
        store,
        media: Arc::new(MediaStore::new(&config.media_root, &config.media_url)),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec available at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        match api::openapi().to_pretty_json() {
            Ok(spec) => println!("{}", spec),
            Err(e) => {
                eprintln!("Failed to render OpenAPI spec: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    init_telemetry();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, StatusCode};
    use axum::response::Response;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// A router over a fresh `MemoryStore` and a temporary media root.
    pub struct TestApp {
        pub state: AppState,
        pub media_dir: TempDir,
    }

    impl TestApp {
        pub fn new() -> Self {
            let media_dir = tempfile::tempdir().unwrap();
            let state = AppState {
                store: Arc::new(MemoryStore::new()),
                media: Arc::new(MediaStore::new(media_dir.path(), "/media/")),
            };
            Self { state, media_dir }
        }

        /// Sign up a user through the API and return `(user_id, token)`.
        pub async fn signup(&self, email: &str) -> (i64, String) {
            let response = self
                .request(
                    Method::POST,
                    "/api/auth/signup",
                    None,
                    Some(serde_json::json!({"email": email, "password": "testpass123"})),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = body_json(response).await;
            (
                body["user_id"].as_i64().unwrap(),
                body["token"].as_str().unwrap().to_string(),
            )
        }

        pub async fn send(&self, request: Request<Body>) -> Response {
            app(self.state.clone()).oneshot(request).await.unwrap()
        }

        pub async fn request(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> Response {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.send(request).await
        }
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_openapi_json_served() {
        let app = TestApp::new();
        let response = app
            .request(Method::GET, "/api-docs/openapi.json", None, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["paths"]["/api/recipes"].is_object());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let store = MemoryStore::new();
        let admin = AdminAccount {
            email: "admin@EXAMPLE.com".to_string(),
            password: "adminpass".to_string(),
        };
        bootstrap_admin(&store, &admin).unwrap();
        bootstrap_admin(&store, &admin).unwrap();

        let user = store
            .find_user_by_email("admin@example.com")
            .unwrap()
            .unwrap();
        assert!(user.is_superuser);
        assert!(user.is_staff);
    }
}
