use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;
pub mod storage;

// Routing split by access level (public, authenticated).
pub mod routes;
use auth::AuthenticatedActor;
use config::Env;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockDocumentStore, S3DocumentStore, StorageState};

/// Every route is served under this prefix.
pub const API_PREFIX: &str = "/api/v1";

/// ApiDoc
///
/// Generated OpenAPI document, served at `/api-docs/openapi.json`. Paths are relative
/// to `API_PREFIX`.
#[derive(OpenApi)]
#[openapi(
    servers((url = "/api/v1")),
    paths(
        handlers::health, handlers::register, handlers::login, handlers::logout, handlers::me,
        handlers::list_jobs, handlers::get_job, handlers::create_job, handlers::update_job,
        handlers::delete_job, handlers::list_applications, handlers::applied_job_ids,
        handlers::get_application, handlers::create_application,
        handlers::update_application_status, handlers::delete_application,
        handlers::dashboard_stats
    ),
    components(
        schemas(
            models::Role, models::ApplicationStatus, models::Account, models::Job,
            models::JobView, models::Application, models::ApplicationView,
            models::RegisterRequest, models::LoginRequest, models::CreateJobRequest,
            models::UpdateJobRequest, models::UpdateStatusRequest, models::AuthPayload,
            models::Pagination, models::StatusCounts, models::DashboardStats,
            error::FieldError, handlers::ApplicationForm,
        )
    ),
    tags(
        (name = "job-portal", description = "Job Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into every
/// request. Handlers and extractors pull out the parts they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Record store (Postgres or in-memory).
    pub repo: RepositoryState,
    /// Document storage for resumes and cover letters.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Route layer for `authenticated_routes`. Extracting `AuthenticatedActor` rejects the
/// request with the 401 envelope before any handler runs.
async fn auth_middleware(_actor: AuthenticatedActor, request: Request, next: Next) -> Response {
    next.run(request).await
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match config.env {
        Env::Local => cors.allow_origin(Any),
        Env::Production => match HeaderValue::from_str(&config.client_url) {
            Ok(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
            Err(_) => {
                tracing::warn!(client_url = %config.client_url, "CLIENT_URL is not a valid origin; CORS requests will be refused");
                cors
            }
        },
    }
}

/// create_router
///
/// Assembles the routing tree, the middleware stack and the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Two documents plus multipart framing.
    let body_limit = state.config.max_document_bytes * 2 + 64 * 1024;

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(API_PREFIX, api)
        .with_state(state);

    // Observability and correlation layers.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, URI and the request id, so every log line of one
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
