use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Authenticated Router Module
///
/// Every route here sits behind the authentication route layer: job browsing and
/// management, the application lifecycle (submission, review, withdrawal) and the
/// dashboard.
///
/// Access Control Strategy:
/// The route layer only proves the caller is a known account. Handlers take the
/// `AuthenticatedActor` explicitly and pass it to the services, which resolve the
/// record first (404) and then consult the `policy` module for role and ownership
/// decisions (403). Listings are narrowed to the actor's scope before user filters.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        // The caller's account plus a refreshed token.
        .route("/auth/me", get(handlers::me))
        // --- Jobs ---
        // GET /jobs?page=&limit=&search=&category=&location=&type=&employerId=
        // POST /jobs (employers and admins)
        .route("/jobs", get(handlers::list_jobs).post(handlers::create_job))
        // PATCH/DELETE /jobs/{id}
        // Owner or admin. Shares its path with the public GET; the routers are merged.
        .route(
            "/jobs/{id}",
            patch(handlers::update_job).delete(handlers::delete_job),
        )
        // --- Applications ---
        // GET /applications?page=&limit=&jobId=&userId=&status=
        // Scoped by role before any filter is applied.
        // POST /applications (multipart: jobId, resume, coverLetter)
        .route(
            "/applications",
            get(handlers::list_applications).post(handlers::create_application),
        )
        // GET /applications/applied-jobs
        // Ids of jobs the caller already applied to; the client disables "Apply" for them.
        .route(
            "/applications/applied-jobs",
            get(handlers::applied_job_ids),
        )
        // GET/DELETE /applications/{id}
        .route(
            "/applications/{id}",
            get(handlers::get_application).delete(handlers::delete_application),
        )
        // PATCH /applications/{id}/status
        // Employer who owns the job, or an admin.
        .route(
            "/applications/{id}/status",
            patch(handlers::update_application_status),
        )
        // --- Dashboard ---
        // GET /dashboard/stats
        // Job and per-status application counts within the caller's scope.
        .route("/dashboard/stats", get(handlers::dashboard_stats))
}
