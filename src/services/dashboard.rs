use crate::{
    auth::AuthenticatedActor,
    error::AppError,
    models::{DashboardStats, Role, StatusCounts},
    repository::Repository,
    services::applications::scoped_query,
};

/// dashboard_stats
///
/// Employers count their own postings; everyone else counts all postings. Application
/// counts use the same scope as the application listing.
pub async fn dashboard_stats(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
) -> Result<DashboardStats, AppError> {
    let job_owner = (actor.role == Role::Employer).then_some(actor.id);
    let total_jobs = repo.count_jobs(job_owner).await?;

    let applications_by_status = match scoped_query(repo, actor).await? {
        Some(query) => repo.count_applications_by_status(&query).await?,
        None => StatusCounts::default(),
    };

    Ok(DashboardStats {
        total_jobs,
        total_applications: applications_by_status.total(),
        applications_by_status,
    })
}
