use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
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

const ACCOUNT_COLUMNS: &str = "id, name, email, role, company, created_at, updated_at";

const JOB_COLUMNS: &str = "id, employer_id, title, company, location, job_type, salary, \
     description, requirements, category, posted_date, created_at, updated_at";

const JOB_VIEW_SELECT: &str = r#"
    SELECT
        j.id, j.employer_id, j.title, j.company, j.location, j.job_type, j.salary,
        j.description, j.requirements, j.category, j.posted_date, j.created_at, j.updated_at,
        e.name AS employer_name, e.company AS employer_company
    FROM jobs j
    LEFT JOIN accounts e ON e.id = j.employer_id
"#;

const APPLICATION_COLUMNS: &str = "id, job_id, user_id, status, applied_date, resume, \
     cover_letter, created_at, updated_at";

// LEFT JOINs: a deleted job leaves the job columns NULL instead of hiding the row.
const APPLICATION_VIEW_SELECT: &str = r#"
    SELECT
        ap.id, ap.job_id, ap.user_id, ap.status, ap.applied_date, ap.resume,
        ap.cover_letter, ap.created_at, ap.updated_at,
        j.title AS job_title, j.company AS job_company,
        u.name AS applicant_name, u.email AS applicant_email
    FROM applications ap
    LEFT JOIN jobs j ON j.id = ap.job_id
    LEFT JOIN accounts u ON u.id = ap.user_id
"#;

#[derive(FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    account: Account,
    password_hash: String,
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Escapes `LIKE` metacharacters so a search term only ever matches itself.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends the `WHERE` clause for a job search. Expects the `jobs` table aliased `j`.
fn push_job_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &JobSearch) {
    builder.push(" WHERE TRUE");

    if let Some(term) = &search.search {
        // Case-insensitive literal substring across title, company and description.
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (j.title ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR j.company ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR j.description ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
    if let Some(category) = &search.category {
        builder.push(" AND j.category = ").push_bind(category.clone());
    }
    if let Some(location) = &search.location {
        builder.push(" AND j.location = ").push_bind(location.clone());
    }
    if let Some(job_type) = &search.job_type {
        builder.push(" AND j.job_type = ").push_bind(job_type.clone());
    }
    if let Some(employer_id) = search.employer_id {
        builder.push(" AND j.employer_id = ").push_bind(employer_id);
    }
}

/// Appends the `WHERE` clause for an application query. Expects `applications` aliased `ap`.
fn push_application_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ApplicationQuery) {
    builder.push(" WHERE TRUE");

    if let Some(user_id) = query.user_id {
        builder.push(" AND ap.user_id = ").push_bind(user_id);
    }
    if let Some(job_ids) = &query.job_ids {
        // An empty array matches nothing, which is the intended scope.
        builder.push(" AND ap.job_id = ANY(").push_bind(job_ids.clone()).push(")");
    }
    if let Some(job_id) = query.job_id {
        builder.push(" AND ap.job_id = ").push_bind(job_id);
    }
    if let Some(status) = query.status {
        builder.push(" AND ap.status = ").push_bind(status);
    }
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a `PgPool`. Queries are
/// checked at runtime, so building the crate does not need a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Unknown(Box::new(e)))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ACCOUNTS ---

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<(Account, String)>, AppError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE LOWER(email) = LOWER($1)"
        );
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| (r.account, r.password_hash)))
    }

    /// create_account
    ///
    /// The unique index on `LOWER(email)` turns a racing duplicate registration into
    /// `Conflict` instead of a second account.
    async fn create_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let sql = format!(
            "INSERT INTO accounts (id, name, email, role, password_hash, company, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(account.name)
            .bind(account.email)
            .bind(account.role)
            .bind(account.password_hash)
            .bind(account.company)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(DUPLICATE_EMAIL.to_string())
                } else {
                    e.into()
                }
            })
    }

    // --- JOBS ---

    /// list_jobs
    ///
    /// Count and page use the same `QueryBuilder` filter so `total` always matches the
    /// rows that pagination walks through.
    async fn list_jobs(
        &self,
        search: &JobSearch,
        page: PageRequest,
    ) -> Result<Page<JobView>, AppError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM jobs j");
        push_job_filters(&mut count, search);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(JOB_VIEW_SELECT);
        push_job_filters(&mut builder, search);
        builder
            .push(" ORDER BY j.posted_date DESC, j.seq ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = builder
            .build_query_as::<JobView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_job_view(&self, id: Uuid) -> Result<Option<JobView>, AppError> {
        let sql = format!("{JOB_VIEW_SELECT} WHERE j.id = $1");
        Ok(sqlx::query_as::<_, JobView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_job(&self, req: CreateJobRequest, employer_id: Uuid) -> Result<Job, AppError> {
        let sql = format!(
            "INSERT INTO jobs (id, employer_id, title, company, location, job_type, salary, \
             description, requirements, category, posted_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW(), NOW()) \
             RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(Uuid::new_v4())
            .bind(employer_id)
            .bind(req.title)
            .bind(req.company)
            .bind(req.location)
            .bind(req.job_type)
            .bind(req.salary)
            .bind(req.description)
            .bind(req.requirements)
            .bind(req.category)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_job
    ///
    /// `COALESCE` keeps the stored value for every field the request leaves out.
    async fn update_job(&self, id: Uuid, req: UpdateJobRequest) -> Result<Option<Job>, AppError> {
        let sql = format!(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                company = COALESCE($3, company),
                location = COALESCE($4, location),
                job_type = COALESCE($5, job_type),
                salary = COALESCE($6, salary),
                description = COALESCE($7, description),
                requirements = COALESCE($8, requirements),
                category = COALESCE($9, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.company)
            .bind(req.location)
            .bind(req.job_type)
            .bind(req.salary)
            .bind(req.description)
            .bind(req.requirements)
            .bind(req.category)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn job_ids_for_employer(&self, employer_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM jobs WHERE employer_id = $1")
                .bind(employer_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn count_jobs(&self, employer_id: Option<Uuid>) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE $1::uuid IS NULL OR employer_id = $1",
        )
        .bind(employer_id)
        .fetch_one(&self.pool)
        .await?)
    }

    // --- APPLICATIONS ---

    async fn list_applications(
        &self,
        query: &ApplicationQuery,
        page: PageRequest,
    ) -> Result<Page<ApplicationView>, AppError> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM applications ap");
        push_application_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(APPLICATION_VIEW_SELECT);
        push_application_filters(&mut builder, query);
        builder
            .push(" ORDER BY ap.applied_date DESC, ap.seq ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = builder
            .build_query_as::<ApplicationView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_application_view(&self, id: Uuid) -> Result<Option<ApplicationView>, AppError> {
        let sql = format!("{APPLICATION_VIEW_SELECT} WHERE ap.id = $1");
        Ok(sqlx::query_as::<_, ApplicationView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = $1 AND user_id = $2"
        );
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(job_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_application
    ///
    /// Relies on the `applications_job_user_key` constraint: when two submissions race
    /// past the service's existence check, the second insert fails here.
    async fn create_application(&self, new: NewApplication) -> Result<Application, AppError> {
        let sql = format!(
            "INSERT INTO applications (id, job_id, user_id, status, applied_date, resume, \
             cover_letter, created_at, updated_at) \
             VALUES ($1, $2, $3, 'pending', NOW(), $4, $5, NOW(), NOW()) \
             RETURNING {APPLICATION_COLUMNS}"
        );
        sqlx::query_as::<_, Application>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.job_id)
            .bind(new.user_id)
            .bind(new.resume)
            .bind(new.cover_letter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(DUPLICATE_APPLICATION.to_string())
                } else {
                    e.into()
                }
            })
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, AppError> {
        let sql = format!(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {APPLICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn applied_job_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT job_id FROM applications WHERE user_id = $1 ORDER BY applied_date DESC, seq ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_applications_by_status(
        &self,
        query: &ApplicationQuery,
    ) -> Result<StatusCounts, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT ap.status, COUNT(*) FROM applications ap");
        push_application_filters(&mut builder, query);
        builder.push(" GROUP BY ap.status");

        let rows = builder
            .build_query_as::<(ApplicationStatus, i64)>()
            .fetch_all(&self.pool)
            .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(status, n);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("rust"), "rust");
        assert_eq!(escape_like("100%"), r"100\%");
        assert_eq!(escape_like("snake_case"), r"snake\_case");
        assert_eq!(escape_like(r"C:\jobs"), r"C:\\jobs");
    }

    #[test]
    fn search_clause_escapes_every_column() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM jobs j");
        let search = JobSearch {
            search: Some("_".to_string()),
            ..JobSearch::default()
        };
        push_job_filters(&mut builder, &search);
        assert_eq!(builder.sql().matches(r"ESCAPE '\'").count(), 3);
    }
}
