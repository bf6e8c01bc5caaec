use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::http::header;
use thiserror::Error;
use tracing::{debug, info};

/// Uploaded images are cached by clients and CDNs for a year.
pub const CACHE_CONTROL: &str = "max-age=31536000";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload of {object} rejected with status {status}: {body}")]
    Rejected {
        object: String,
        status: u16,
        body: String,
    },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable remote home for uploaded images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `contents` under `object`, replacing any existing object.
    async fn upload(&self, object: &str, contents: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Public URL an object is served from once uploaded.
    fn public_url(&self, object: &str) -> String;
}

/// Supabase-compatible storage REST API.
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, key: &str, bucket: &str) -> Self {
        info!("Object storage bucket '{}' at {}", bucket, base_url);
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, object: &str, contents: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, object);
        let size = contents.len();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header("x-upsert", "true")
            .header(header::CACHE_CONTROL, CACHE_CONTROL)
            .header(header::CONTENT_TYPE, content_type)
            .body(contents)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                object: object.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("Uploaded {} ({} bytes) to bucket {}", object, size, self.bucket);
        Ok(())
    }

    fn public_url(&self, object: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, object)
    }
}

/// In-process object storage for tests and offline development.
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl MemoryStorage {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Make every following upload fail, to exercise error paths.
    pub fn set_failing(&self, failing: bool) {
        self.fail_uploads.store(failing, Ordering::Relaxed);
    }

    /// Names of all stored objects, sorted.
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, object: &str, contents: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        if self.fail_uploads.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("uploads disabled".to_string()));
        }

        self.objects
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?
            .insert(object.to_string(), contents);
        Ok(())
    }

    fn public_url(&self, object: &str) -> String {
        format!("{}/{}", self.base_url, object)
    }
}
