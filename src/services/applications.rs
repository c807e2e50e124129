use uuid::Uuid;

use crate::{
    auth::AuthenticatedActor,
    error::{AppError, FieldError},
    models::{
        Application, ApplicationQuery, ApplicationScope, ApplicationStatus, ApplicationView,
        NewApplication, Page, PageRequest, Role,
    },
    policy::{self, ApplicationOwners, Operation},
    repository::{DUPLICATE_APPLICATION, Repository},
    services::{jobs::JOB_NOT_FOUND, parse_status},
    storage::{Document, DocumentStore, document_key, validate_document},
};

pub const APPLICATION_NOT_FOUND: &str = "Application not found";

/// Uploaded documents for a new application, straight from the multipart form.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub resume: Option<Document>,
    pub cover_letter: Option<Document>,
}

/// User-supplied listing filters, before scoping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationFilter {
    pub job_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

fn check_document<'a>(
    errors: &mut Vec<FieldError>,
    field: &str,
    missing: &str,
    document: Option<&'a Document>,
    max_bytes: usize,
) -> Option<&'a Document> {
    match document {
        None => {
            errors.push(FieldError::new(field, missing));
            None
        }
        Some(doc) => match validate_document(field, doc, max_bytes) {
            Ok(()) => Some(doc),
            Err(e) => {
                errors.push(e);
                None
            }
        },
    }
}

async fn upload(
    storage: &dyn DocumentStore,
    field: &str,
    key: &str,
    document: &Document,
) -> Result<String, AppError> {
    storage
        .store_document(key, &document.content_type, document.bytes.clone())
        .await
        .map_err(|e| AppError::unknown(format!("failed to store {field}: {e}")))
}

/// Removes documents uploaded for a submission that was not recorded. Failures are
/// logged and do not replace the error being returned.
async fn discard(storage: &dyn DocumentStore, keys: &[&str]) {
    for key in keys {
        if let Err(e) = storage.delete_document(key).await {
            tracing::warn!(%key, error = %e, "failed to discard orphaned document");
        }
    }
}

async fn owners(
    repo: &dyn Repository,
    application: &Application,
) -> Result<ApplicationOwners, AppError> {
    let job_employer_id = repo
        .get_job(application.job_id)
        .await?
        .map(|job| job.employer_id);
    Ok(ApplicationOwners {
        applicant_id: application.user_id,
        job_employer_id,
    })
}

async fn existing_application(
    repo: &dyn Repository,
    id: Uuid,
) -> Result<Application, AppError> {
    repo.get_application(id)
        .await?
        .ok_or_else(|| AppError::NotFound(APPLICATION_NOT_FOUND.to_string()))
}

/// create_application
///
/// Order: documents valid, job exists, no prior application, actor is a jobseeker.
/// Only then are the documents uploaded and the record inserted as `pending`.
pub async fn create_application(
    repo: &dyn Repository,
    storage: &dyn DocumentStore,
    actor: &AuthenticatedActor,
    job_id: Uuid,
    submission: Submission,
    max_document_bytes: usize,
) -> Result<Application, AppError> {
    let mut errors = Vec::new();
    let resume = check_document(
        &mut errors,
        "resume",
        "Resume is required",
        submission.resume.as_ref(),
        max_document_bytes,
    );
    let cover_letter = check_document(
        &mut errors,
        "coverLetter",
        "Cover letter is required",
        submission.cover_letter.as_ref(),
        max_document_bytes,
    );
    let (Some(resume), Some(cover_letter)) = (resume, cover_letter) else {
        return Err(AppError::Validation(errors));
    };

    if repo.get_job(job_id).await?.is_none() {
        return Err(AppError::NotFound(JOB_NOT_FOUND.to_string()));
    }
    if repo.find_application(job_id, actor.id).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_APPLICATION.to_string()));
    }
    policy::authorize(actor, &Operation::CreateApplication)?;

    let resume_key = document_key("resume");
    let resume_url = upload(storage, "resume", &resume_key, resume).await?;

    let cover_letter_key = document_key("coverLetter");
    let cover_letter_url =
        match upload(storage, "coverLetter", &cover_letter_key, cover_letter).await {
            Ok(url) => url,
            Err(e) => {
                discard(storage, &[&resume_key]).await;
                return Err(e);
            }
        };

    // A concurrent duplicate can still lose the race at the unique constraint.
    let inserted = repo
        .create_application(NewApplication {
            job_id,
            user_id: actor.id,
            resume: resume_url,
            cover_letter: cover_letter_url,
        })
        .await;
    let application = match inserted {
        Ok(application) => application,
        Err(e) => {
            discard(storage, &[&resume_key, &cover_letter_key]).await;
            return Err(e);
        }
    };

    tracing::info!(
        application_id = %application.id,
        %job_id,
        applicant = %actor.id,
        "application submitted"
    );
    Ok(application)
}

/// scoped_query
///
/// Turns the actor's scope into a store query. `None` means the scope is provably
/// empty (an employer without postings) and the store need not be asked.
pub async fn scoped_query(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
) -> Result<Option<ApplicationQuery>, AppError> {
    let query = match policy::application_scope(actor) {
        ApplicationScope::All => ApplicationQuery::default(),
        ApplicationScope::Applicant(user_id) => ApplicationQuery {
            user_id: Some(user_id),
            ..ApplicationQuery::default()
        },
        ApplicationScope::Employer(employer_id) => {
            let job_ids = repo.job_ids_for_employer(employer_id).await?;
            if job_ids.is_empty() {
                return Ok(None);
            }
            ApplicationQuery {
                job_ids: Some(job_ids),
                ..ApplicationQuery::default()
            }
        }
    };
    Ok(Some(query))
}

/// list_applications
///
/// User filters narrow the actor's scope and never widen it. `user_id` is only
/// honoured for administrators.
pub async fn list_applications(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    filter: ApplicationFilter,
    page: PageRequest,
) -> Result<Page<ApplicationView>, AppError> {
    let Some(mut query) = scoped_query(repo, actor).await? else {
        return Ok(Page::empty(page));
    };

    if query.user_id.is_none() && actor.role == Role::Admin {
        query.user_id = filter.user_id;
    }
    query.job_id = filter.job_id;
    query.status = filter.status;

    repo.list_applications(&query, page).await
}

pub async fn get_application(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    id: Uuid,
) -> Result<ApplicationView, AppError> {
    let view = repo
        .get_application_view(id)
        .await?
        .ok_or_else(|| AppError::NotFound(APPLICATION_NOT_FOUND.to_string()))?;
    let owners = owners(repo, &view.application).await?;
    policy::authorize(actor, &Operation::ReadApplication(owners))?;
    Ok(view)
}

/// update_application_status
///
/// Any of the four statuses may replace any other.
pub async fn update_application_status(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    id: Uuid,
    status: &str,
) -> Result<Application, AppError> {
    let status = parse_status(status)?;
    let application = existing_application(repo, id).await?;
    let owners = owners(repo, &application).await?;
    policy::authorize(actor, &Operation::UpdateApplicationStatus(owners))?;

    let updated = repo
        .set_application_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(APPLICATION_NOT_FOUND.to_string()))?;
    tracing::info!(application_id = %id, status = status.as_str(), actor = %actor.id, "application status changed");
    Ok(updated)
}

pub async fn delete_application(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
    id: Uuid,
) -> Result<(), AppError> {
    let application = existing_application(repo, id).await?;
    let owners = owners(repo, &application).await?;
    policy::authorize(actor, &Operation::DeleteApplication(owners))?;

    if !repo.delete_application(id).await? {
        return Err(AppError::NotFound(APPLICATION_NOT_FOUND.to_string()));
    }
    tracing::info!(application_id = %id, actor = %actor.id, "application deleted");
    Ok(())
}

/// applied_job_ids
///
/// Jobs the actor has applied to. Empty for employers and admins, who never apply.
pub async fn applied_job_ids(
    repo: &dyn Repository,
    actor: &AuthenticatedActor,
) -> Result<Vec<Uuid>, AppError> {
    repo.applied_job_ids(actor.id).await
}
