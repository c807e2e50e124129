use uuid::Uuid;

use crate::{
    auth::AuthenticatedActor,
    error::{AppError, FieldError},
    models::{CreateJobRequest, Job, JobSearch, JobView, Page, PageRequest, UpdateJobRequest},
    policy::{self, Operation},
    repository::Repository,
};

pub const JOB_NOT_FOUND: &str = "Job not found";

fn required_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    message: &str,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, message));
    }
    trimmed.to_string()
}

fn optional_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<String>,
    message: &str,
) -> Option<String> {
    value.map(|v| required_text(errors, field, &v, message))
}

// Blank entries are dropped before the at-least-one check.
fn requirements(errors: &mut Vec<FieldError>, values: Vec<String>) -> Vec<String> {
    let kept: Vec<String> = values
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if kept.is_empty() {
        errors.push(FieldError::new(
            "requirements",
            "At least one requirement is required",
        ));
    }
    kept
}

fn validate_create(req: CreateJobRequest) -> Result<CreateJobRequest, AppError> {
    let mut errors = Vec::new();
    let validated = CreateJobRequest {
        title: required_text(&mut errors, "title", &req.title, "Job title is required"),
        company: required_text(&mut errors, "company", &req.company, "Company name is required"),
        location: required_text(&mut errors, "location", &req.location, "Job location is required"),
        job_type: required_text(&mut errors, "type", &req.job_type, "Job type is required"),
        salary: required_text(&mut errors, "salary", &req.salary, "Salary information is required"),
        description: required_text(
            &mut errors,
            "description",
            &req.description,
            "Job description is required",
        ),
        requirements: requirements(&mut errors, req.requirements),
        category: required_text(&mut errors, "category", &req.category, "Job category is required"),
    };
    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn validate_update(req: UpdateJobRequest) -> Result<UpdateJobRequest, AppError> {
    let mut errors = Vec::new();
    let validated = UpdateJobRequest {
        title: optional_text(&mut errors, "title", req.title, "Job title is required"),
        company: optional_text(&mut errors, "company", req.company, "Company name is required"),
        location: optional_text(&mut errors, "location", req.location, "Job location is required"),
        job_type: optional_text(&mut errors, "type", req.job_type, "Job type is required"),
        salary: optional_text(&mut errors, "salary", req.salary, "Salary information is required"),
        description: optional_text(
            &mut errors,
            "description",
            req.description,
            "Job description is required",
        ),
        requirements: req.requirements.map(|values| requirements(&mut errors, values)),
        category: optional_text(&mut errors, "category", req.category, "Job category is required"),
    };
    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(AppError::Validation(errors))
    }
}

async fn existing_job(repo: &dyn Repository, id: Uuid) -> Result<Job, AppError> {
    repo.get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))
}

pub async fn list_jobs(
    repo: &dyn Repository,
    search: &JobSearch,
    page: PageRequest,
) -> Result<Page<JobView>, AppError> {
    repo.list_jobs(search, page).await
}

pub async fn get_job(repo: &dyn Repository, id: Uuid) -> Result<JobView, AppError> {
    repo.get_job_view(id)
        .await?
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))
}

/// create_job
///
/// The policy runs before validation, so a jobseeker learns nothing about the payload.
pub async fn create_job(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    req: CreateJobRequest,
) -> Result<Job, AppError> {
    policy::authorize(actor, &Operation::CreateJob)?;
    let req = validate_create(req)?;
    let job = repo.create_job(req, actor.id).await?;
    tracing::info!(job_id = %job.id, employer_id = %job.employer_id, "job created");
    Ok(job)
}

pub async fn update_job(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    id: Uuid,
    req: UpdateJobRequest,
) -> Result<Job, AppError> {
    let req = validate_update(req)?;
    let job = existing_job(repo, id).await?;
    policy::authorize(
        actor,
        &Operation::UpdateJob {
            employer_id: job.employer_id,
        },
    )?;

    // The row can vanish between the lookup and the update.
    repo.update_job(id, req)
        .await?
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))
}

/// delete_job
///
/// Applications that reference the job are left untouched.
pub async fn delete_job(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    id: Uuid,
) -> Result<(), AppError> {
    let job = existing_job(repo, id).await?;
    policy::authorize(
        actor,
        &Operation::DeleteJob {
            employer_id: job.employer_id,
        },
    )?;

    if !repo.delete_job(id).await? {
        return Err(AppError::NotFound(JOB_NOT_FOUND.to_string()));
    }
    tracing::info!(job_id = %id, actor = %actor.id, "job deleted");
    Ok(())
}
