use async_trait::async_trait;
use aws_sdk_s3 as s3;
use axum::body::Bytes;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::FieldError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// 1. DocumentStore Contract
/// DocumentStore
///
/// The abstract contract for persisting applicant documents. Handlers and services only
/// see this trait, so the S3 client used in production and the mock used in tests are
/// interchangeable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the configured bucket if it is missing. Only called in `Env::Local`
    /// against MinIO.
    async fn ensure_bucket_exists(&self);

    /// Uploads `bytes` under `key` and returns the public URL of the stored object.
    ///
    /// The URL is what the application record keeps; callers never parse it.
    ///
    /// # Arguments
    /// * `key`: Object key, e.g. `job-applications/resume-<uuid>.pdf`. Traversal
    ///   segments are stripped before use.
    /// * `content_type`: MIME type recorded on the object (always `application/pdf` here).
    /// * `bytes`: The whole document, already size-checked by `validate_document`.
    async fn store_document(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, String>;

    /// Removes the object stored under `key`. Used to discard uploads whose application
    /// was never recorded.
    async fn delete_document(&self, key: &str) -> Result<(), String>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3DocumentStore
///
/// The concrete implementation using the AWS SDK for S3. Due to S3 compatibility,
/// this client handles connections to:
/// - **Local:** a Dockerized MinIO instance (bucket created on startup).
/// - **Production:** any S3-compatible service named by `S3_ENDPOINT`.
///
/// `force_path_style(true)` is required by both, and stored URLs take the form
/// `{endpoint}/{bucket}/{key}`.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3DocumentStore {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket on an existing bucket fails harmlessly.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn store_document(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, String> {
        let key = sanitize_key(key);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        tracing::info!(bucket = %self.bucket_name, %key, size, "document stored");
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket_name, key))
    }

    async fn delete_document(&self, key: &str) -> Result<(), String> {
        let key = sanitize_key(key);

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        tracing::info!(bucket = %self.bucket_name, %key, "document deleted");
        Ok(())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never climb out of its prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// document_key
///
/// Object key for an uploaded application document, e.g.
/// `job-applications/resume-<uuid>.pdf`.
pub fn document_key(field: &str) -> String {
    format!("job-applications/{}-{}.pdf", field, uuid::Uuid::new_v4())
}

// 3. The Mock Implementation (For Tests)
/// MockDocumentStore
///
/// Returns deterministic local URLs without any network access and remembers which
/// keys are currently stored, so tests can assert that nothing was left behind.
///
/// Failure modes:
/// 1. `new_failing()` rejects every upload.
/// 2. `failing_after(n)` accepts the first `n` uploads and rejects the rest.
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    /// Number of uploads to accept before failing; `None` never fails.
    fail_after: Option<usize>,
    stored: Arc<Mutex<MockObjects>>,
}

#[derive(Default)]
struct MockObjects {
    uploads: usize,
    keys: Vec<String>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self::failing_after(0)
    }

    pub fn failing_after(uploads: usize) -> Self {
        Self {
            fail_after: Some(uploads),
            ..Self::default()
        }
    }

    /// Keys stored and not yet deleted, in upload order.
    pub fn stored_keys(&self) -> Vec<String> {
        self.objects().keys.clone()
    }

    fn objects(&self) -> MutexGuard<'_, MockObjects> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn ensure_bucket_exists(&self) {}

    async fn store_document(
        &self,
        key: &str,
        _content_type: &str,
        _bytes: Bytes,
    ) -> Result<String, String> {
        let key = sanitize_key(key);
        let mut objects = self.objects();
        if self.fail_after.is_some_and(|limit| objects.uploads >= limit) {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        objects.uploads += 1;
        objects.keys.push(key.clone());
        Ok(format!("http://localhost:9000/mock-bucket/{}", key))
    }

    async fn delete_document(&self, key: &str) -> Result<(), String> {
        let key = sanitize_key(key);
        self.objects().keys.retain(|stored| *stored != key);
        Ok(())
    }
}

/// Document
///
/// An uploaded file held in memory between multipart parsing and storage.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Document {
    pub fn pdf(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            bytes: bytes.into(),
        }
    }
}

/// validate_document
///
/// Only PDFs up to `max_bytes` are accepted.
pub fn validate_document(
    field: &str,
    document: &Document,
    max_bytes: usize,
) -> Result<(), FieldError> {
    if document.content_type != PDF_CONTENT_TYPE {
        return Err(FieldError::new(field, "Only PDF files are allowed"));
    }
    if document.bytes.is_empty() {
        return Err(FieldError::new(field, "File is empty"));
    }
    if document.bytes.len() > max_bytes {
        return Err(FieldError::new(
            field,
            format!("File exceeds the {} byte limit", max_bytes),
        ));
    }
    Ok(())
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn DocumentStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_strips_traversal() {
        assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_key("a//./b/../c.pdf"), "a/b/c.pdf");
    }

    #[test]
    fn document_key_is_namespaced_pdf() {
        let key = document_key("resume");
        assert!(key.starts_with("job-applications/resume-"));
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn non_pdf_is_rejected() {
        let doc = Document {
            file_name: "cv.docx".to_string(),
            content_type: "application/msword".to_string(),
            bytes: Bytes::from_static(b"data"),
        };
        let err = validate_document("resume", &doc, 1024).unwrap_err();
        assert_eq!(err.field, "resume");
        assert_eq!(err.message, "Only PDF files are allowed");
    }

    #[test]
    fn size_limit_is_inclusive() {
        let exact = Document::pdf("a.pdf", vec![0u8; 16]);
        assert!(validate_document("resume", &exact, 16).is_ok());

        let over = Document::pdf("a.pdf", vec![0u8; 17]);
        assert!(validate_document("resume", &over, 16).is_err());
    }

    #[tokio::test]
    async fn mock_store_returns_deterministic_url() {
        let store = MockDocumentStore::new();
        let url = store
            .store_document("job-applications/resume-1.pdf", PDF_CONTENT_TYPE, Bytes::new())
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:9000/mock-bucket/job-applications/resume-1.pdf");

        let failing = MockDocumentStore::new_failing();
        assert!(
            failing
                .store_document("k", PDF_CONTENT_TYPE, Bytes::new())
                .await
                .is_err()
        );
        assert!(failing.stored_keys().is_empty());
    }

    #[tokio::test]
    async fn mock_store_tracks_and_forgets_keys() {
        let store = MockDocumentStore::failing_after(2);
        for key in ["a.pdf", "b.pdf"] {
            store.store_document(key, PDF_CONTENT_TYPE, Bytes::new()).await.unwrap();
        }
        assert!(
            store
                .store_document("c.pdf", PDF_CONTENT_TYPE, Bytes::new())
                .await
                .is_err()
        );
        assert_eq!(store.stored_keys(), ["a.pdf", "b.pdf"]);

        store.delete_document("a.pdf").await.unwrap();
        assert_eq!(store.stored_keys(), ["b.pdf"]);
    }
}
