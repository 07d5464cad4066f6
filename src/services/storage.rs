use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage returned error: {0}")]
    ApiError(String),
}

/// Client for the hosted object store (images, report template)
pub struct ObjectStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ObjectStore {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            urlencoding::encode(key)
        )
    }

    /// Public URL of a stored object (no request is made)
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            urlencoding::encode(key)
        )
    }

    /// Download an object by key
    pub async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.object_url(bucket, key);
        tracing::debug!("Downloading {}/{}", bucket, key);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            // the store answers 400 for unknown keys in some buckets
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                Err(StorageError::NotFound(format!("{}/{}", bucket, key)))
            }
            status => Err(StorageError::ApiError(format!(
                "Failed to download {}/{}: {}",
                bucket, key, status
            ))),
        }
    }

    /// Fetch an absolute URL (e.g. a stored public image link)
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(url.to_string())),
            status => Err(StorageError::ApiError(format!("Failed to fetch {}: {}", url, status))),
        }
    }

    /// Upload (or replace) an object
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.object_url(bucket, key))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::ApiError(format!(
                "Failed to upload {}/{}: {}",
                bucket,
                key,
                response.status()
            )));
        }

        tracing::info!("Uploaded {}/{}", bucket, key);
        Ok(self.public_url(bucket, key))
    }
}
