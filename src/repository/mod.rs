use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        Account, Application, ApplicationQuery, ApplicationStatus, ApplicationView,
        CreateJobRequest, Job, JobSearch, JobView, NewAccount, NewApplication, Page,
        PageRequest, StatusCounts, UpdateJobRequest,
    },
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

pub const DUPLICATE_EMAIL: &str = "User with this email already exists";
pub const DUPLICATE_APPLICATION: &str = "You have already applied for this job";

/// Repository Trait
///
/// The persistence contract used by the lifecycle services and the auth extractor.
/// Implementations perform no authorization of their own; callers consult the policy
/// first. Uniqueness (account email, one application per job and applicant) is enforced
/// here, at the storage level, and reported as `AppError::Conflict`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, AppError>;
    /// Account plus its stored password hash, looked up by (lower-cased) email.
    async fn find_credentials(&self, email: &str) -> Result<Option<(Account, String)>, AppError>;
    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError>;

    // --- Jobs ---
    // Most recent posting first; ties in insertion order.
    async fn list_jobs(
        &self,
        search: &JobSearch,
        page: PageRequest,
    ) -> Result<Page<JobView>, AppError>;
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError>;
    async fn get_job_view(&self, id: Uuid) -> Result<Option<JobView>, AppError>;
    async fn create_job(&self, req: CreateJobRequest, employer_id: Uuid) -> Result<Job, AppError>;
    // Only `Some` fields change; `updated_at` is refreshed.
    async fn update_job(&self, id: Uuid, req: UpdateJobRequest) -> Result<Option<Job>, AppError>;
    // Permanent; applications referencing the job are left in place.
    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError>;
    async fn job_ids_for_employer(&self, employer_id: Uuid) -> Result<Vec<Uuid>, AppError>;
    async fn count_jobs(&self, employer_id: Option<Uuid>) -> Result<i64, AppError>;

    // --- Applications ---
    // Most recently applied first; ties in insertion order.
    async fn list_applications(
        &self,
        query: &ApplicationQuery,
        page: PageRequest,
    ) -> Result<Page<ApplicationView>, AppError>;
    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError>;
    async fn get_application_view(&self, id: Uuid) -> Result<Option<ApplicationView>, AppError>;
    async fn find_application(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError>;
    /// Inserts with status `pending`. A second application for the same job and
    /// applicant fails with `Conflict`, even when both inserts race.
    async fn create_application(&self, new: NewApplication) -> Result<Application, AppError>;
    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, AppError>;
    async fn delete_application(&self, id: Uuid) -> Result<bool, AppError>;
    async fn applied_job_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;
    async fn count_applications_by_status(
        &self,
        query: &ApplicationQuery,
    ) -> Result<StatusCounts, AppError>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
