use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{DUPLICATE_APPLICATION, DUPLICATE_EMAIL, Repository};
use crate::{
    error::AppError,
    models::{
        Account, Application, ApplicationQuery, ApplicationStatus, ApplicationView,
        CreateJobRequest, Job, JobSearch, JobView, NewAccount, NewApplication, Page,
        PageRequest, StatusCounts, UpdateJobRequest,
    },
};

struct StoredAccount {
    account: Account,
    password_hash: String,
}

// Each Vec is kept in insertion order, which doubles as the tie breaker for sorting.
#[derive(Default)]
struct Tables {
    accounts: Vec<StoredAccount>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

impl Tables {
    fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts
            .iter()
            .map(|stored| &stored.account)
            .find(|account| account.id == id)
    }

    fn job(&self, id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    fn job_view(&self, job: &Job) -> JobView {
        let employer = self.account(job.employer_id);
        JobView {
            job: job.clone(),
            employer_name: employer.map(|e| e.name.clone()),
            employer_company: employer.and_then(|e| e.company.clone()),
        }
    }

    fn application_view(&self, application: &Application) -> ApplicationView {
        let job = self.job(application.job_id);
        let applicant = self.account(application.user_id);
        ApplicationView {
            application: application.clone(),
            job_title: job.map(|j| j.title.clone()),
            job_company: job.map(|j| j.company.clone()),
            applicant_name: applicant.map(|a| a.name.clone()),
            applicant_email: applicant.map(|a| a.email.clone()),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn job_matches(job: &Job, search: &JobSearch) -> bool {
    search.search.as_ref().is_none_or(|term| {
        contains_ignore_case(&job.title, term)
            || contains_ignore_case(&job.company, term)
            || contains_ignore_case(&job.description, term)
    }) && search.category.as_ref().is_none_or(|c| &job.category == c)
        && search.location.as_ref().is_none_or(|l| &job.location == l)
        && search.job_type.as_ref().is_none_or(|t| &job.job_type == t)
        && search.employer_id.is_none_or(|id| job.employer_id == id)
}

fn application_matches(application: &Application, query: &ApplicationQuery) -> bool {
    query.user_id.is_none_or(|id| application.user_id == id)
        && query
            .job_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&application.job_id))
        && query.job_id.is_none_or(|id| application.job_id == id)
        && query.status.is_none_or(|s| application.status == s)
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
        .collect();
    Page {
        items,
        total,
        request: page,
    }
}

/// MemoryRepository
///
/// An in-process `Repository` for tests and `STORE=memory` demos. A single mutex
/// guards all tables, so the duplicate checks inside `create_account` and
/// `create_application` are atomic with their inserts, the same guarantee the
/// Postgres unique constraints give.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-written row behind, since
        // every mutation is a single push/assign/remove.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.tables().account(id).cloned())
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<(Account, String)>, AppError> {
        let email = email.to_lowercase();
        Ok(self
            .tables()
            .accounts
            .iter()
            .find(|stored| stored.account.email.to_lowercase() == email)
            .map(|stored| (stored.account.clone(), stored.password_hash.clone())))
    }

    async fn create_account(&self, new: NewAccount) -> Result<Account, AppError> {
        let mut tables = self.tables();
        let email = new.email.to_lowercase();
        if tables
            .accounts
            .iter()
            .any(|stored| stored.account.email.to_lowercase() == email)
        {
            return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            role: new.role,
            company: new.company,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(StoredAccount {
            account: account.clone(),
            password_hash: new.password_hash,
        });
        Ok(account)
    }

    async fn list_jobs(
        &self,
        search: &JobSearch,
        page: PageRequest,
    ) -> Result<Page<JobView>, AppError> {
        let tables = self.tables();
        let mut matching: Vec<&Job> = tables
            .jobs
            .iter()
            .filter(|job| job_matches(job, search))
            .collect();
        // Stable sort: equal timestamps keep insertion order.
        matching.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
        let views = matching.into_iter().map(|job| tables.job_view(job)).collect();
        Ok(paginate(views, page))
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        Ok(self.tables().job(id).cloned())
    }

    async fn get_job_view(&self, id: Uuid) -> Result<Option<JobView>, AppError> {
        let tables = self.tables();
        Ok(tables.job(id).map(|job| tables.job_view(job)))
    }

    async fn create_job(&self, req: CreateJobRequest, employer_id: Uuid) -> Result<Job, AppError> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            employer_id,
            title: req.title,
            company: req.company,
            location: req.location,
            job_type: req.job_type,
            salary: req.salary,
            description: req.description,
            requirements: req.requirements,
            category: req.category,
            posted_date: now,
            created_at: now,
            updated_at: now,
        };
        self.tables().jobs.push(job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, req: UpdateJobRequest) -> Result<Option<Job>, AppError> {
        let mut tables = self.tables();
        let Some(job) = tables.jobs.iter_mut().find(|job| job.id == id) else {
            return Ok(None);
        };

        if let Some(title) = req.title {
            job.title = title;
        }
        if let Some(company) = req.company {
            job.company = company;
        }
        if let Some(location) = req.location {
            job.location = location;
        }
        if let Some(job_type) = req.job_type {
            job.job_type = job_type;
        }
        if let Some(salary) = req.salary {
            job.salary = salary;
        }
        if let Some(description) = req.description {
            job.description = description;
        }
        if let Some(requirements) = req.requirements {
            job.requirements = requirements;
        }
        if let Some(category) = req.category {
            job.category = category;
        }
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables();
        let before = tables.jobs.len();
        tables.jobs.retain(|job| job.id != id);
        Ok(tables.jobs.len() < before)
    }

    async fn job_ids_for_employer(&self, employer_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .tables()
            .jobs
            .iter()
            .filter(|job| job.employer_id == employer_id)
            .map(|job| job.id)
            .collect())
    }

    async fn count_jobs(&self, employer_id: Option<Uuid>) -> Result<i64, AppError> {
        Ok(self
            .tables()
            .jobs
            .iter()
            .filter(|job| employer_id.is_none_or(|id| job.employer_id == id))
            .count() as i64)
    }

    async fn list_applications(
        &self,
        query: &ApplicationQuery,
        page: PageRequest,
    ) -> Result<Page<ApplicationView>, AppError> {
        let tables = self.tables();
        let mut matching: Vec<&Application> = tables
            .applications
            .iter()
            .filter(|application| application_matches(application, query))
            .collect();
        matching.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
        let views = matching
            .into_iter()
            .map(|application| tables.application_view(application))
            .collect();
        Ok(paginate(views, page))
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError> {
        Ok(self
            .tables()
            .applications
            .iter()
            .find(|application| application.id == id)
            .cloned())
    }

    async fn get_application_view(&self, id: Uuid) -> Result<Option<ApplicationView>, AppError> {
        let tables = self.tables();
        Ok(tables
            .applications
            .iter()
            .find(|application| application.id == id)
            .map(|application| tables.application_view(application)))
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        Ok(self
            .tables()
            .applications
            .iter()
            .find(|a| a.job_id == job_id && a.user_id == user_id)
            .cloned())
    }

    async fn create_application(&self, new: NewApplication) -> Result<Application, AppError> {
        let mut tables = self.tables();
        if tables
            .applications
            .iter()
            .any(|a| a.job_id == new.job_id && a.user_id == new.user_id)
        {
            return Err(AppError::Conflict(DUPLICATE_APPLICATION.to_string()));
        }

        let now = Utc::now();
        let application = Application {
            id: Uuid::new_v4(),
            job_id: new.job_id,
            user_id: new.user_id,
            status: ApplicationStatus::Pending,
            applied_date: now,
            resume: new.resume,
            cover_letter: new.cover_letter,
            created_at: now,
            updated_at: now,
        };
        tables.applications.push(application.clone());
        Ok(application)
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, AppError> {
        let mut tables = self.tables();
        Ok(tables
            .applications
            .iter_mut()
            .find(|application| application.id == id)
            .map(|application| {
                application.status = status;
                application.updated_at = Utc::now();
                application.clone()
            }))
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables();
        let before = tables.applications.len();
        tables.applications.retain(|application| application.id != id);
        Ok(tables.applications.len() < before)
    }

    async fn applied_job_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let tables = self.tables();
        let mut mine: Vec<&Application> = tables
            .applications
            .iter()
            .filter(|application| application.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
        Ok(mine.into_iter().map(|application| application.job_id).collect())
    }

    async fn count_applications_by_status(
        &self,
        query: &ApplicationQuery,
    ) -> Result<StatusCounts, AppError> {
        let mut counts = StatusCounts::default();
        for application in self
            .tables()
            .applications
            .iter()
            .filter(|application| application_matches(application, query))
        {
            counts.add(application.status, 1);
        }
        Ok(counts)
    }
}
