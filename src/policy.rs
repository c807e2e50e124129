//! Access-control policy.
//!
//! Pure decisions over `(actor, operation)`. Callers resolve the records first
//! (existence before authorization) and describe them through [`Operation`];
//! nothing here touches storage.

use uuid::Uuid;

use crate::{
    auth::AuthenticatedActor,
    error::AppError,
    models::{ApplicationScope, Role},
};

/// The ownership facts of an application needed for a decision.
///
/// `job_employer_id` is `None` when the posting was deleted; no employer owns
/// such an application any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationOwners {
    pub applicant_id: Uuid,
    pub job_employer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateJob,
    ReadJob,
    UpdateJob { employer_id: Uuid },
    DeleteJob { employer_id: Uuid },
    CreateApplication,
    ReadApplication(ApplicationOwners),
    UpdateApplicationStatus(ApplicationOwners),
    DeleteApplication(ApplicationOwners),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts a denial into `AppError::Forbidden`.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::Forbidden(reason.to_string())),
        }
    }
}

fn allow_if(condition: bool, reason: &'static str) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

fn employs(actor: &AuthenticatedActor, owners: &ApplicationOwners) -> bool {
    owners.job_employer_id == Some(actor.id)
}

/// decide
///
/// The complete permission table. Matching on `(operation, role)` keeps it exhaustive:
/// adding a role or an operation fails to compile until every cell is filled in.
pub fn decide(actor: &AuthenticatedActor, operation: &Operation) -> Decision {
    use Operation::*;
    use Role::*;

    match (operation, actor.role) {
        (ReadJob, _) => Decision::Allow,

        (CreateJob, Employer | Admin) => Decision::Allow,
        (CreateJob, Jobseeker) => Decision::Deny("Only employers can post jobs"),

        (UpdateJob { employer_id }, Employer) => allow_if(
            *employer_id == actor.id,
            "Not authorized to update this job",
        ),
        (DeleteJob { employer_id }, Employer) => allow_if(
            *employer_id == actor.id,
            "Not authorized to delete this job",
        ),
        (UpdateJob { .. } | DeleteJob { .. }, Admin) => Decision::Allow,
        (UpdateJob { .. }, Jobseeker) => Decision::Deny("Not authorized to update this job"),
        (DeleteJob { .. }, Jobseeker) => Decision::Deny("Not authorized to delete this job"),

        (CreateApplication, Jobseeker) => Decision::Allow,
        (CreateApplication, Employer | Admin) => {
            Decision::Deny("Only jobseekers can apply for jobs")
        }

        (ReadApplication(owners), Jobseeker) => allow_if(
            owners.applicant_id == actor.id,
            "Not authorized to view this application",
        ),
        (ReadApplication(owners), Employer) => allow_if(
            employs(actor, owners),
            "Not authorized to view this application",
        ),
        (ReadApplication(_), Admin) => Decision::Allow,

        (UpdateApplicationStatus(_), Jobseeker) => {
            Decision::Deny("Not authorized to update application status")
        }
        (UpdateApplicationStatus(owners), Employer) => allow_if(
            employs(actor, owners),
            "Not authorized to update this application",
        ),
        (UpdateApplicationStatus(_), Admin) => Decision::Allow,

        (DeleteApplication(owners), Jobseeker) => allow_if(
            owners.applicant_id == actor.id,
            "Not authorized to delete this application",
        ),
        (DeleteApplication(owners), Employer) => allow_if(
            employs(actor, owners),
            "Not authorized to delete this application",
        ),
        (DeleteApplication(_), Admin) => Decision::Allow,
    }
}

/// authorize
///
/// `decide` followed by conversion of a denial into `AppError::Forbidden`.
pub fn authorize(actor: &AuthenticatedActor, operation: &Operation) -> Result<(), AppError> {
    let decision = decide(actor, operation);
    if let Decision::Deny(reason) = &decision {
        tracing::debug!(actor = %actor.id, role = %actor.role, ?operation, reason, "policy denied");
    }
    decision.into_result()
}

/// application_scope
///
/// Which applications an actor may list. Applied before user-supplied filters.
pub fn application_scope(actor: &AuthenticatedActor) -> ApplicationScope {
    match actor.role {
        Role::Jobseeker => ApplicationScope::Applicant(actor.id),
        Role::Employer => ApplicationScope::Employer(actor.id),
        Role::Admin => ApplicationScope::All,
    }
}
