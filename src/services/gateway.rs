use crate::core::query::TableQuery;
use crate::models::Property;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Rows per page when reading a whole result set
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Errors that can occur when talking to the hosted data service
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Table names in the hosted database
#[derive(Debug, Clone)]
pub struct GatewayTables {
    pub properties: String,
    pub crm_interactions: String,
    pub property_images: String,
    pub access_requests: String,
}

/// REST client for the hosted tabular store
///
/// Handles all row-level communication with the backend:
/// - Filtered, paged reads and exact counts
/// - Inserts and single-row updates
/// - The property image lookup table
pub struct GatewayClient {
    base_url: String,
    api_key: String,
    client: Client,
    tables: GatewayTables,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct ImageLookupRow {
    image_url: Option<String>,
}

impl GatewayClient {
    pub fn new(
        base_url: String,
        api_key: String,
        tables: GatewayTables,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            tables,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn tables(&self) -> &GatewayTables {
        &self.tables
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Turn a non-success status into a typed error
    async fn check(response: Response, context: &str) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::error!("{} failed: {} - {}", context, status, body);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized,
            StatusCode::NOT_FOUND => GatewayError::NotFound(context.to_string()),
            _ => GatewayError::ApiError(format!("{}: {}", context, status)),
        })
    }

    /// One page (or an unbounded read, subject to the server's cap)
    pub async fn select<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>, GatewayError> {
        let url = self.rest_url(&query.table);
        tracing::debug!("Selecting from {} with {:?}", query.table, query.to_params());

        let response = self
            .authorized(self.client.get(&url))
            .query(&query.to_params())
            .send()
            .await?;

        let response = Self::check(response, &format!("select from {}", query.table)).await?;

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse {} rows: {}", query.table, e)))
    }

    /// Every matching row, fetched page by page until a short page
    pub async fn select_all<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>, GatewayError> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page_query = query.clone().page(offset, self.page_size);
            let page: Vec<T> = self.select(&page_query).await?;
            let fetched = page.len();
            rows.extend(page);

            if fetched < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        tracing::debug!("Read {} rows from {} in pages of {}", rows.len(), query.table, self.page_size);
        Ok(rows)
    }

    /// Exact row count for the query's predicates
    pub async fn count(&self, query: &TableQuery) -> Result<u64, GatewayError> {
        let url = self.rest_url(&query.table);
        let counting = TableQuery {
            select: "*".to_string(),
            order: Vec::new(),
            offset: None,
            limit: None,
            ..query.clone()
        };

        let response = self
            .authorized(self.client.head(&url))
            .header("Prefer", "count=exact")
            .query(&counting.to_params())
            .send()
            .await?;

        let response = Self::check(response, &format!("count {}", query.table)).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| GatewayError::InvalidResponse("Missing Content-Range header".into()))?;

        parse_content_range_total(range)
            .ok_or_else(|| GatewayError::InvalidResponse(format!("Unparseable Content-Range: {}", range)))
    }

    /// Insert one row and return the stored representation
    pub async fn insert<T, R>(&self, table: &str, row: &T) -> Result<R, GatewayError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        let response = Self::check(response, &format!("insert into {}", table)).await?;
        first_row(response, table).await
    }

    /// Patch the row whose `key_column` equals `key`
    pub async fn update<P, R>(&self, table: &str, key_column: &str, key: &str, patch: &P) -> Result<R, GatewayError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let filter = TableQuery::new(table).eq(key_column, key);
        let params: Vec<(String, String)> = filter.filters.iter().map(|(c, p)| (c.clone(), p.to_string())).collect();

        let response = self
            .authorized(self.client.patch(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .query(&params)
            .json(patch)
            .send()
            .await?;

        let response = Self::check(response, &format!("update {}", table)).await?;
        first_row(response, table)
            .await
            .map_err(|e| match e {
                GatewayError::NotFound(_) => GatewayError::NotFound(format!("{} {}={}", table, key_column, key)),
                other => other,
            })
    }

    /// Full rows for the given property ids, in id order
    pub async fn properties_by_ids(&self, ids: &[String]) -> Result<Vec<Property>, GatewayError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = TableQuery::new(&self.tables.properties)
            .in_text("property_id", ids.iter().cloned())
            .order("property_id", true);

        self.select_all(&query).await
    }

    /// Stored image URL from the auxiliary lookup table
    pub async fn image_url_for(&self, property_id: &str) -> Result<Option<String>, GatewayError> {
        let query = TableQuery::new(&self.tables.property_images)
            .select("image_url")
            .eq("property_id", property_id)
            .page(0, 1);

        let rows: Vec<ImageLookupRow> = self.select(&query).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.image_url)
            .filter(|url| !url.trim().is_empty()))
    }
}

async fn first_row<R: DeserializeOwned>(response: Response, table: &str) -> Result<R, GatewayError> {
    let rows: Vec<R> = response
        .json()
        .await
        .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse {} row: {}", table, e)))?;

    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::NotFound(format!("No row returned from {}", table)))
}

/// Total from `Content-Range: 0-24/3573` or `*/0`
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> GatewayTables {
        GatewayTables {
            properties: "properties".to_string(),
            crm_interactions: "crm_interactions".to_string(),
            property_images: "property_images".to_string(),
            access_requests: "access_requests".to_string(),
        }
    }

    #[test]
    fn test_gateway_client_creation() {
        let client = GatewayClient::new(
            "https://db.example.test/".to_string(),
            "test_key".to_string(),
            tables(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_page_size(0);

        assert_eq!(client.base_url, "https://db.example.test");
        assert_eq!(client.rest_url("properties"), "https://db.example.test/rest/v1/properties");
        assert_eq!(client.page_size(), 1);
    }

    #[test]
    fn test_content_range_parsing() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }
}
