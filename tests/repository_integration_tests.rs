//! Runs against a real Postgres when `DATABASE_URL` is set; every test is a no-op
//! otherwise so the suite stays green without a database.

use job_portal::{
    AppError, PostgresRepository,
    models::{
        ApplicationQuery, ApplicationStatus, CreateJobRequest, JobSearch, NewAccount,
        NewApplication, PageRequest, Role, UpdateJobRequest,
    },
    repository::Repository,
};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

async fn repo() -> Option<Arc<PostgresRepository>> {
    dotenv::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres repository test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to Postgres in tests");
    let repo = PostgresRepository::new(pool);
    repo.migrate().await.expect("migrations failed");
    Some(Arc::new(repo))
}

async fn account(repo: &PostgresRepository, role: Role) -> Uuid {
    repo.create_account(NewAccount {
        name: "Repo Test".to_string(),
        email: format!("{}@repo-test.example.com", Uuid::new_v4()),
        role,
        company: (role == Role::Employer).then(|| "Acme".to_string()),
        password_hash: "$argon2id$unused".to_string(),
    })
    .await
    .unwrap()
    .id
}

fn job_request(title: &str, category: &str) -> CreateJobRequest {
    CreateJobRequest {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        job_type: "Full-time".to_string(),
        salary: "100k".to_string(),
        description: "Repository integration".to_string(),
        requirements: vec!["SQL".to_string()],
        category: category.to_string(),
    }
}

fn new_application(job_id: Uuid, user_id: Uuid) -> NewApplication {
    NewApplication {
        job_id,
        user_id,
        resume: "http://localhost:9000/mock-bucket/r.pdf".to_string(),
        cover_letter: "http://localhost:9000/mock-bucket/c.pdf".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_is_conflict_case_insensitively() {
    let Some(repo) = repo().await else { return };
    let email = format!("{}@repo-test.example.com", Uuid::new_v4());
    let new = |email: String| NewAccount {
        name: "Dup".to_string(),
        email,
        role: Role::Jobseeker,
        company: None,
        password_hash: "x".to_string(),
    };

    repo.create_account(new(email.clone())).await.unwrap();
    let err = repo
        .create_account(new(email.to_uppercase()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let (found, hash) = repo
        .find_credentials(&email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.email, email);
    assert_eq!(hash, "x");
}

#[tokio::test]
#[serial]
async fn test_concurrent_applications_hit_the_unique_constraint() {
    let Some(repo) = repo().await else { return };
    let employer = account(&repo, Role::Employer).await;
    let seeker = account(&repo, Role::Jobseeker).await;
    let job = repo
        .create_job(job_request("Race", "Testing"), employer)
        .await
        .unwrap();
    let job_id = job.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create_application(new_application(job_id, seeker)).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
#[serial]
async fn test_job_update_and_search() {
    let Some(repo) = repo().await else { return };
    let employer = account(&repo, Role::Employer).await;
    let marker = Uuid::new_v4().simple().to_string();
    let job = repo
        .create_job(job_request(&format!("Needle {marker}"), "Haystack"), employer)
        .await
        .unwrap();

    let search = JobSearch {
        search: Some(marker.to_uppercase()),
        ..JobSearch::default()
    };
    let page = repo.list_jobs(&search, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].job.id, job.id);
    assert_eq!(page.items[0].employer_company.as_deref(), Some("Acme"));

    let updated = repo
        .update_job(
            job.id,
            UpdateJobRequest {
                salary: Some("150k".to_string()),
                ..UpdateJobRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.salary, "150k");
    assert_eq!(updated.title, job.title);
    assert!(updated.updated_at >= job.updated_at);

    assert!(repo.update_job(Uuid::new_v4(), UpdateJobRequest::default()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_deleted_job_leaves_dangling_application() {
    let Some(repo) = repo().await else { return };
    let employer = account(&repo, Role::Employer).await;
    let seeker = account(&repo, Role::Jobseeker).await;
    let job = repo
        .create_job(job_request("Ephemeral", "Testing"), employer)
        .await
        .unwrap();
    let application = repo
        .create_application(new_application(job.id, seeker))
        .await
        .unwrap();
    assert_eq!(application.status, ApplicationStatus::Pending);

    assert!(repo.delete_job(job.id).await.unwrap());
    assert!(!repo.delete_job(job.id).await.unwrap());

    let view = repo
        .get_application_view(application.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.application.job_id, job.id);
    assert!(view.job_title.is_none());
    assert!(view.applicant_email.is_some());

    let updated = repo
        .set_application_status(application.id, ApplicationStatus::Rejected)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, ApplicationStatus::Rejected);

    assert!(repo.delete_application(application.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn test_application_filters_and_counts() {
    let Some(repo) = repo().await else { return };
    let employer = account(&repo, Role::Employer).await;
    let seeker = account(&repo, Role::Jobseeker).await;
    let first = repo
        .create_job(job_request("First", "Testing"), employer)
        .await
        .unwrap();
    let second = repo
        .create_job(job_request("Second", "Testing"), employer)
        .await
        .unwrap();
    let a = repo
        .create_application(new_application(first.id, seeker))
        .await
        .unwrap();
    repo.create_application(new_application(second.id, seeker))
        .await
        .unwrap();
    repo.set_application_status(a.id, ApplicationStatus::Accepted)
        .await
        .unwrap();

    let mut job_ids = repo.job_ids_for_employer(employer).await.unwrap();
    job_ids.sort();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(job_ids, expected);

    let scoped = ApplicationQuery {
        job_ids: Some(job_ids),
        ..ApplicationQuery::default()
    };
    let page = repo
        .list_applications(&scoped, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    // Most recent first.
    assert_eq!(page.items[0].application.job_id, second.id);

    let counts = repo.count_applications_by_status(&scoped).await.unwrap();
    assert_eq!(counts.accepted, 1);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.total(), 2);

    let nothing = ApplicationQuery {
        job_ids: Some(vec![]),
        ..ApplicationQuery::default()
    };
    assert_eq!(
        repo.list_applications(&nothing, PageRequest::default())
            .await
            .unwrap()
            .total,
        0
    );

    let accepted_only = ApplicationQuery {
        user_id: Some(seeker),
        status: Some(ApplicationStatus::Accepted),
        ..ApplicationQuery::default()
    };
    let page = repo
        .list_applications(&accepted_only, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].application.id, a.id);

    assert_eq!(repo.count_jobs(Some(employer)).await.unwrap(), 2);
    let applied = repo.applied_job_ids(seeker).await.unwrap();
    assert_eq!(applied, vec![second.id, first.id]);
}

#[tokio::test]
#[serial]
async fn test_search_wildcards_match_literally() {
    let Some(repo) = repo().await else { return };
    let employer = account(&repo, Role::Employer).await;
    let marker = Uuid::new_v4().simple().to_string();
    let literal = repo
        .create_job(job_request(&format!("{marker} 100%_off"), "Wildcards"), employer)
        .await
        .unwrap();
    repo.create_job(job_request(&format!("{marker} 1000 off"), "Wildcards"), employer)
        .await
        .unwrap();

    // Unescaped, `%_` would also match the "1000 off" posting.
    let search = JobSearch {
        search: Some(format!("{marker} 100%_")),
        ..JobSearch::default()
    };
    let page = repo.list_jobs(&search, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].job.id, literal.id);
}
