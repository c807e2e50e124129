use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Closed Enumerations (Mapped to Postgres enum types) ---

/// Role
///
/// The access-control role of an account. Registration only offers `Jobseeker` and
/// `Employer`; `Admin` accounts are seeded directly in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Jobseeker,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Jobseeker => "jobseeker",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ApplicationStatus
///
/// Flat status set of an application. Any status may be set from any other through the
/// explicit status-update operation; there is no terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[ts(export)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

// --- Stored Records ---

/// Account
///
/// A registered identity. The password hash lives in the same row but is never loaded
/// into this struct, so it cannot leak through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    // Lower-cased and trimmed before storage; unique.
    pub email: String,
    pub role: Role,
    // Required iff role = employer.
    pub company: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewAccount
///
/// Validated registration data ready for insertion.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub company: Option<String>,
    pub password_hash: String,
}

/// Job
///
/// A posting owned by exactly one employer account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Job {
    pub id: Uuid,
    // FK to accounts.id (Owner).
    pub employer_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    /// `type` is reserved in Rust; the column is `job_type`, the JSON key stays `type`.
    #[serde(rename = "type")]
    pub job_type: String,
    // Free text, e.g. "$80k - $100k".
    pub salary: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub category: String,
    #[ts(type = "string")]
    pub posted_date: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// JobView
///
/// A job joined with its employer's public details at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JobView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub job: Job,
    pub employer_name: Option<String>,
    pub employer_company: Option<String>,
}

/// Application
///
/// A jobseeker's submission against a posting. `job_id` may dangle once the posting
/// is deleted; applications are never cascaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    // FK to accounts.id (Applicant).
    pub user_id: Uuid,
    pub status: ApplicationStatus,
    // Set once at creation.
    #[ts(type = "string")]
    pub applied_date: DateTime<Utc>,
    // Opaque document references returned by the document store.
    pub resume: String,
    pub cover_letter: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewApplication
///
/// Insert payload built by the lifecycle layer after all preconditions hold.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub resume: String,
    pub cover_letter: String,
}

/// ApplicationView
///
/// An application joined with job and applicant details. The job fields are `None`
/// when the referenced posting no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApplicationView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub application: Application,
    pub job_title: Option<String>,
    pub job_company: Option<String>,
    pub applicant_name: Option<String>,
    pub applicant_email: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input for `POST /auth/register`. Missing text fields default to empty strings so that
/// they are reported through the validation envelope instead of a JSON rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<Role>,
    pub company: Option<String>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateJobRequest
///
/// Input for `POST /jobs`. Every field is required; `requirements` needs at least one entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub salary: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub category: String,
}

/// UpdateJobRequest
///
/// Partial update payload for `PATCH /jobs/{id}`; only provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateJobRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// UpdateStatusRequest
///
/// Input for `PATCH /applications/{id}/status`. Kept as a raw string so an unknown literal
/// is reported as a validation error on `status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// --- Listing Inputs ---

/// JobSearch
///
/// Filters applied to the job listing. All present filters are AND-ed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSearch {
    // Case-insensitive substring over title, company and description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub employer_id: Option<Uuid>,
}

/// ApplicationScope
///
/// Role-derived restriction on which applications an actor may see. Computed by the
/// policy and applied before any user-supplied filter.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationScope {
    /// Administrators see everything.
    All,
    /// A jobseeker sees only their own applications.
    Applicant(Uuid),
    /// An employer sees applications to the jobs they own.
    Employer(Uuid),
}

/// ApplicationQuery
///
/// Store-level conjunction of filters. `job_ids`, when present, restricts results to
/// that set; an empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationQuery {
    pub user_id: Option<Uuid>,
    pub job_ids: Option<Vec<Uuid>>,
    pub job_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

/// PageRequest
///
/// Validated pagination input: `page >= 1`, `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageRequest {
    /// Rows to skip. Saturates instead of overflowing; `page_request` already rejects
    /// pages past the addressable range.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit.max(1))
    }

    /// `ceil(total / limit)`, computed without the `total + limit - 1` overflow.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total - 1) / self.limit.max(1) + 1
        }
    }
}

/// Page
///
/// One page of a listing plus the total number of matching records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            request,
        }
    }

    pub fn total_pages(&self) -> i64 {
        self.request.total_pages(self.total)
    }
}

// --- Response Envelopes (Output Schemas) ---

/// ApiResponse
///
/// Success envelope: `{ status: "success", message, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

/// Pagination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pagination {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

/// PaginatedResponse
///
/// Listing envelope with `results` (items on this page) and pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub status: String,
    pub message: String,
    pub results: usize,
    pub pagination: Pagination,
    pub data: Vec<T>,
}

impl<T> PaginatedResponse<T> {
    pub fn from_page(message: impl Into<String>, page: Page<T>) -> Self {
        let pagination = Pagination {
            total_items: page.total,
            total_pages: page.total_pages(),
            current_page: page.request.page,
            limit: page.request.limit,
        };
        Self {
            status: "success".to_string(),
            message: message.into(),
            results: page.items.len(),
            pagination,
            data: page.items,
        }
    }
}

/// AuthPayload
///
/// Returned by register, login and `/auth/me`: the account plus a fresh session token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthPayload {
    pub user: Account,
    pub token: String,
}

/// StatusCounts
///
/// Per-status application counts within some scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StatusCounts {
    pub pending: i64,
    pub reviewed: i64,
    pub accepted: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: ApplicationStatus, n: i64) {
        match status {
            ApplicationStatus::Pending => self.pending += n,
            ApplicationStatus::Reviewed => self.reviewed += n,
            ApplicationStatus::Accepted => self.accepted += n,
            ApplicationStatus::Rejected => self.rejected += n,
        }
    }

    pub fn total(&self) -> i64 {
        self.pending + self.reviewed + self.accepted + self.rejected
    }
}

/// DashboardStats
///
/// Output of `GET /dashboard/stats`, scoped to the requesting actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub total_jobs: i64,
    pub total_applications: i64,
    pub applications_by_status: StatusCounts,
}
