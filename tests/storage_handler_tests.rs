use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use job_portal::{
    AppConfig, AppState, MemoryRepository, MockDocumentStore, create_router,
    auth::issue_token,
    models::{ApplicationQuery, CreateJobRequest, NewAccount, PageRequest, Role},
    repository::{Repository, RepositoryState},
    storage::StorageState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "storage-test-boundary";
const RESUME: &[u8] = b"%PDF resume";
const COVER: &[u8] = b"%PDF cover";

struct Fixture {
    router: Router,
    repo: Arc<MemoryRepository>,
    storage: MockDocumentStore,
    token: String,
    job_id: Uuid,
}

async fn fixture(storage: MockDocumentStore, max_document_bytes: usize) -> Fixture {
    let repo = Arc::new(MemoryRepository::new());
    let config = AppConfig {
        max_document_bytes,
        ..AppConfig::default()
    };

    let employer = repo
        .create_account(NewAccount {
            name: "Employer".to_string(),
            email: "employer@example.com".to_string(),
            role: Role::Employer,
            company: Some("Acme".to_string()),
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap();
    let seeker = repo
        .create_account(NewAccount {
            name: "Seeker".to_string(),
            email: "seeker@example.com".to_string(),
            role: Role::Jobseeker,
            company: None,
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap();
    let job = repo
        .create_job(
            CreateJobRequest {
                title: "Storage Engineer".to_string(),
                requirements: vec!["S3".to_string()],
                ..CreateJobRequest::default()
            },
            employer.id,
        )
        .await
        .unwrap();

    let token = issue_token(seeker.id, seeker.role, &config).unwrap();
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: Arc::new(storage.clone()) as StorageState,
        config,
    };

    Fixture {
        router: create_router(state),
        repo,
        storage,
        token,
        job_id: job.id,
    }
}

fn file_part(name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.pdf\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(bytes);
    part.extend_from_slice(b"\r\n");
    part
}

async fn submit(fixture: &Fixture, files: &[(&str, &str, &[u8])]) -> (StatusCode, Value) {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"jobId\"\r\n\r\n{}\r\n",
        fixture.job_id
    )
    .into_bytes();
    for (name, content_type, bytes) in files {
        body.extend(file_part(name, content_type, bytes));
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/applications")
        .header(header::AUTHORIZATION, format!("Bearer {}", fixture.token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = fixture.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn stored_applications(fixture: &Fixture) -> i64 {
    fixture
        .repo
        .list_applications(&ApplicationQuery::default(), PageRequest::default())
        .await
        .unwrap()
        .total
}

#[tokio::test]
async fn test_upload_failure_returns_generic_500_and_stores_nothing() {
    let fixture = fixture(MockDocumentStore::new_failing(), 1024).await;
    let (status, body) = submit(
        &fixture,
        &[
            ("resume", "application/pdf", RESUME),
            ("coverLetter", "application/pdf", COVER),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Something went wrong");
    assert_eq!(stored_applications(&fixture).await, 0);
}

#[tokio::test]
async fn test_partial_upload_failure_leaves_no_documents_behind() {
    let fixture = fixture(MockDocumentStore::failing_after(1), 1024).await;
    let (status, _) = submit(
        &fixture,
        &[
            ("resume", "application/pdf", RESUME),
            ("coverLetter", "application/pdf", COVER),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(fixture.storage.stored_keys().is_empty());
    assert_eq!(stored_applications(&fixture).await, 0);
}

#[tokio::test]
async fn test_oversized_document_is_rejected() {
    let fixture = fixture(MockDocumentStore::new(), 16).await;
    let big = [b'x'; 17];
    let (status, body) = submit(
        &fixture,
        &[
            ("resume", "application/pdf", RESUME),
            ("coverLetter", "application/pdf", &big[..]),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "coverLetter");
    assert_eq!(stored_applications(&fixture).await, 0);
}

#[tokio::test]
async fn test_missing_cover_letter_is_rejected() {
    let fixture = fixture(MockDocumentStore::new(), 1024).await;
    let (status, body) = submit(&fixture, &[("resume", "application/pdf", RESUME)]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "coverLetter");
    assert_eq!(body["errors"][0]["message"], "Cover letter is required");
}

#[tokio::test]
async fn test_successful_upload_records_mock_urls() {
    let fixture = fixture(MockDocumentStore::new(), 1024).await;
    let (status, body) = submit(
        &fixture,
        &[
            ("resume", "application/pdf", RESUME),
            ("coverLetter", "application/pdf", COVER),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let cover = body["data"]["coverLetter"].as_str().unwrap();
    assert!(cover.starts_with("http://localhost:9000/mock-bucket/job-applications/coverLetter-"));
    assert!(cover.ends_with(".pdf"));
    assert_eq!(stored_applications(&fixture).await, 1);
    assert_eq!(fixture.storage.stored_keys().len(), 2);
}
