use crate::{
    AppState,
    auth::AuthenticatedActor,
    error::AppError,
    models::{
        ApiResponse, Application, ApplicationView, AuthPayload, CreateJobRequest,
        DashboardStats, Job, JobSearch, JobView, LoginRequest, PaginatedResponse,
        RegisterRequest, UpdateJobRequest, UpdateStatusRequest,
    },
    services::{
        self, accounts,
        applications::{self, ApplicationFilter, Submission},
        dashboard, jobs, parse_id, parse_status,
    },
    storage::Document,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

const INVALID_JOB_ID: &str = "Invalid job ID format";
const INVALID_APPLICATION_ID: &str = "Invalid application ID format";
const INVALID_USER_ID: &str = "Invalid user ID format";

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

// --- Filter Structs ---

/// JobFilter
///
/// Query parameters for `GET /jobs`. Everything arrives as a string and is validated in
/// the service layer, so bad input gets the JSON validation envelope.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Page size (default 10).
    pub limit: Option<String>,
    /// Case-insensitive match on title, company and description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub employer_id: Option<String>,
}

/// ApplicationListFilter
///
/// Query parameters for `GET /applications`. `userId` only has an effect for admins.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListFilter {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub job_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<String>,
}

/// ApplicationForm
///
/// Documents the multipart body of `POST /applications`; the handler reads the parts
/// directly.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ApplicationForm {
    job_id: Uuid,
    #[schema(value_type = String, format = Binary)]
    resume: Vec<u8>,
    #[schema(value_type = String, format = Binary)]
    cover_letter: Vec<u8>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_id(raw: Option<String>, field: &str, message: &str) -> Result<Option<Uuid>, AppError> {
    non_blank(raw)
        .map(|v| parse_id(&v, field, message))
        .transpose()
}

// --- Health ---

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Job portal API is running"))
}

// --- Accounts ---

/// register
///
/// [Public Route] Creates a jobseeker or employer account and returns a session token.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthPayload),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> CreatedResult<AuthPayload> {
    let Json(req) = payload?;
    let auth = accounts::register(state.repo.as_ref(), &state.config, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered successfully", auth)),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthPayload),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthPayload> {
    let Json(req) = payload?;
    let auth = accounts::login(state.repo.as_ref(), &state.config, req).await?;
    Ok(Json(ApiResponse::success("User logged in successfully", auth)))
}

/// logout
///
/// Sessions are bearer tokens the server does not track, so this only acknowledges.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("User logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthPayload),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(actor: AuthenticatedActor, State(state): State<AppState>) -> ApiResult<AuthPayload> {
    let auth = accounts::current_user(state.repo.as_ref(), &state.config, &actor).await?;
    Ok(Json(ApiResponse::success("User retrieved successfully", auth)))
}

// --- Jobs ---

/// list_jobs
///
/// [Authenticated Route] Browse all postings, newest first.
#[utoipa::path(
    get,
    path = "/jobs",
    params(JobFilter),
    responses((status = 200, description = "Paginated jobs", body = [JobView]))
)]
pub async fn list_jobs(
    _actor: AuthenticatedActor,
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<PaginatedResponse<JobView>>, AppError> {
    let page = services::page_request(filter.page.as_deref(), filter.limit.as_deref())?;
    let search = JobSearch {
        search: non_blank(filter.search),
        category: non_blank(filter.category),
        location: non_blank(filter.location),
        job_type: non_blank(filter.job_type),
        employer_id: optional_id(filter.employer_id, "employerId", "Invalid employer ID format")?,
    };
    let page = jobs::list_jobs(state.repo.as_ref(), &search, page).await?;
    Ok(Json(PaginatedResponse::from_page(
        "Jobs retrieved successfully",
        page,
    )))
}

/// get_job
///
/// [Public Route] A single posting with its employer's name and company.
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Found", body = JobView),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<JobView> {
    let id = parse_id(&id, "id", INVALID_JOB_ID)?;
    let job = jobs::get_job(state.repo.as_ref(), id).await?;
    Ok(Json(ApiResponse::success("Job retrieved successfully", job)))
}

#[utoipa::path(
    post,
    path = "/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Created", body = Job),
        (status = 403, description = "Only employers can post jobs")
    )
)]
pub async fn create_job(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> CreatedResult<Job> {
    let Json(req) = payload?;
    let job = jobs::create_job(state.repo.as_ref(), &actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Job created successfully", job)),
    ))
}

/// update_job
///
/// [Authenticated Route] Owner or admin only.
#[utoipa::path(
    patch,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Updated", body = Job),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn update_job(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> ApiResult<Job> {
    let id = parse_id(&id, "id", INVALID_JOB_ID)?;
    let Json(req) = payload?;
    let job = jobs::update_job(state.repo.as_ref(), &actor, id, req).await?;
    Ok(Json(ApiResponse::success("Job updated successfully", job)))
}

#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn delete_job(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "id", INVALID_JOB_ID)?;
    jobs::delete_job(state.repo.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::message("Job deleted successfully")))
}

// --- Applications ---

/// list_applications
///
/// [Authenticated Route] Always restricted to the caller's scope: own applications for
/// jobseekers, applications to own postings for employers, everything for admins.
#[utoipa::path(
    get,
    path = "/applications",
    params(ApplicationListFilter),
    responses((status = 200, description = "Paginated applications", body = [ApplicationView]))
)]
pub async fn list_applications(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    Query(filter): Query<ApplicationListFilter>,
) -> Result<Json<PaginatedResponse<ApplicationView>>, AppError> {
    let page = services::page_request(filter.page.as_deref(), filter.limit.as_deref())?;
    let filter = ApplicationFilter {
        job_id: optional_id(filter.job_id, "jobId", INVALID_JOB_ID)?,
        user_id: optional_id(filter.user_id, "userId", INVALID_USER_ID)?,
        status: non_blank(filter.status)
            .map(|s| parse_status(&s))
            .transpose()?,
    };
    let page = applications::list_applications(state.repo.as_ref(), &actor, filter, page).await?;
    Ok(Json(PaginatedResponse::from_page(
        "Applications retrieved successfully",
        page,
    )))
}

/// applied_job_ids
///
/// [Authenticated Route] Ids of the jobs the caller has applied to.
#[utoipa::path(
    get,
    path = "/applications/applied-jobs",
    responses((status = 200, description = "Job ids", body = [Uuid]))
)]
pub async fn applied_job_ids(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
) -> ApiResult<Vec<Uuid>> {
    let ids = applications::applied_job_ids(state.repo.as_ref(), &actor).await?;
    Ok(Json(ApiResponse::success(
        "Applied jobs retrieved successfully",
        ids,
    )))
}

#[utoipa::path(
    get,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Found", body = ApplicationView),
        (status = 403, description = "Not authorized to view this application"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn get_application(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApplicationView> {
    let id = parse_id(&id, "id", INVALID_APPLICATION_ID)?;
    let view = applications::get_application(state.repo.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::success(
        "Application retrieved successfully",
        view,
    )))
}

/// create_application
///
/// [Authenticated Route] Multipart form with `jobId`, `resume` and `coverLetter`
/// (both PDF). Unknown parts are ignored.
#[utoipa::path(
    post,
    path = "/applications",
    request_body(content = ApplicationForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Submitted", body = Application),
        (status = 400, description = "Missing or invalid documents"),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Already applied")
    )
)]
pub async fn create_application(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> CreatedResult<Application> {
    let mut job_id = None;
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "jobId" => job_id = Some(field.text().await?),
            "resume" | "coverLetter" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let document = Document {
                    file_name,
                    content_type,
                    bytes: field.bytes().await?,
                };
                if name == "resume" {
                    submission.resume = Some(document);
                } else {
                    submission.cover_letter = Some(document);
                }
            }
            other => tracing::debug!(field = other, "ignoring unexpected multipart field"),
        }
    }

    let job_id = parse_id(job_id.as_deref().unwrap_or_default(), "jobId", INVALID_JOB_ID)?;
    let application = applications::create_application(
        state.repo.as_ref(),
        state.storage.as_ref(),
        &actor,
        job_id,
        submission,
        state.config.max_document_bytes,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Application submitted successfully",
            application,
        )),
    ))
}

/// update_application_status
///
/// [Authenticated Route] The employer who owns the job, or an admin.
#[utoipa::path(
    patch,
    path = "/applications/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Application),
        (status = 400, description = "Invalid status value"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn update_application_status(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Application> {
    let id = parse_id(&id, "id", INVALID_APPLICATION_ID)?;
    let Json(req) = payload?;
    let application =
        applications::update_application_status(state.repo.as_ref(), &actor, id, &req.status)
            .await?;
    Ok(Json(ApiResponse::success(
        "Application status updated successfully",
        application,
    )))
}

#[utoipa::path(
    delete,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn delete_application(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "id", INVALID_APPLICATION_ID)?;
    applications::delete_application(state.repo.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::message("Application deleted successfully")))
}

// --- Dashboard ---

#[utoipa::path(
    get,
    path = "/dashboard/stats",
    responses((status = 200, description = "Role-scoped counts", body = DashboardStats))
)]
pub async fn dashboard_stats(
    actor: AuthenticatedActor,
    State(state): State<AppState>,
) -> ApiResult<DashboardStats> {
    let stats = dashboard::dashboard_stats(state.repo.as_ref(), &actor).await?;
    Ok(Json(ApiResponse::success(
        "Dashboard stats retrieved successfully",
        stats,
    )))
}
