use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token: health, the account gateway, and the job detail page
/// (shareable links must open without logging in).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and the container orchestrator.
        .route("/health", get(handlers::health))
        // POST /auth/register
        // Jobseeker or employer sign-up. Admins are never created here.
        .route("/auth/register", post(handlers::register))
        // POST /auth/login
        .route("/auth/login", post(handlers::login))
        // POST /auth/logout
        // Stateless; the client discards its token.
        .route("/auth/logout", post(handlers::logout))
        // GET /jobs/{id}
        // Single posting with employer name and company.
        .route("/jobs/{id}", get(handlers::get_job))
}
