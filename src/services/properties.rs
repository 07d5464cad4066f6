use crate::core::aggregation::{self, MapDefaults};
use crate::core::filters::{self, Dimension, FilterSelection};
use crate::models::{DashboardResponse, FilterOptionsResponse, Notice, Property};
use crate::services::cache::{CacheError, CacheKey, CacheManager};
use crate::services::gateway::{GatewayClient, GatewayError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

pub const NO_MATCHES_NOTICE: &str = "No properties match the selected filters";

#[derive(Debug, Deserialize)]
struct CityRow {
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZipRow {
    zip: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    combined_score: Option<i64>,
}

/// Filter-option lookups, counts and full reads over the properties table
pub struct PropertyQueries {
    gateway: Arc<GatewayClient>,
    cache: Arc<CacheManager>,
    map: MapDefaults,
}

impl PropertyQueries {
    pub fn new(gateway: Arc<GatewayClient>, cache: Arc<CacheManager>, map: MapDefaults) -> Self {
        Self { gateway, cache, map }
    }

    fn table(&self) -> &str {
        &self.gateway.tables().properties
    }

    /// Serve from cache, or run `fetch` and remember the result
    ///
    /// Cache failures never fail the query.
    async fn cached<T, F, Fut>(&self, key: String, fetch: F) -> Result<T, GatewayError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        match self.cache.get::<T>(&key).await {
            Ok(value) => return Ok(value),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let value = fetch().await?;

        if let Err(e) = self.cache.set(&key, &value).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
        Ok(value)
    }

    /// Distinct non-null cities, alphabetical
    pub async fn available_cities(&self) -> Result<Vec<String>, GatewayError> {
        self.cached(CacheKey::cities(), || async move {
            let query = filters::city_options_query(self.table());
            let rows: Vec<CityRow> = self.gateway.select_all(&query).await?;
            Ok(aggregation::distinct_strings(rows.into_iter().filter_map(|r| r.city)))
        })
        .await
    }

    /// Distinct zips within the selected cities (all cities when none selected)
    pub async fn available_zip_codes(&self, cities: &BTreeSet<String>) -> Result<Vec<i64>, GatewayError> {
        self.cached(CacheKey::zip_options(cities), || async move {
            let query = filters::zip_options_query(self.table(), cities);
            let rows: Vec<ZipRow> = self.gateway.select_all(&query).await?;
            Ok(aggregation::distinct_numbers(rows.into_iter().filter_map(|r| r.zip)))
        })
        .await
    }

    /// Distinct scores within the selected cities and zips
    pub async fn available_scores(
        &self,
        cities: &BTreeSet<String>,
        zips: &BTreeSet<String>,
    ) -> Result<Vec<i64>, GatewayError> {
        self.cached(CacheKey::score_options(cities, zips), || async move {
            let query = filters::score_options_query(self.table(), cities, zips);
            let rows: Vec<ScoreRow> = self.gateway.select_all(&query).await?;
            Ok(aggregation::distinct_numbers(
                rows.into_iter().filter_map(|r| r.combined_score),
            ))
        })
        .await
    }

    /// Options currently selectable on one dimension, as selection values
    pub async fn available_values(
        &self,
        dimension: Dimension,
        selection: &FilterSelection,
    ) -> Result<Vec<String>, GatewayError> {
        Ok(match dimension {
            Dimension::City => self.available_cities().await?,
            Dimension::Zip => to_strings(self.available_zip_codes(&selection.cities).await?),
            Dimension::Score => to_strings(
                self.available_scores(&selection.cities, &selection.zips)
                    .await?,
            ),
        })
    }

    pub async fn total_count(&self, selection: &FilterSelection) -> Result<u64, GatewayError> {
        self.cached(CacheKey::count(selection), || async move {
            self.gateway
                .count(&selection.property_query(self.table()))
                .await
        })
        .await
    }

    /// Every matching row
    pub async fn properties(&self, selection: &FilterSelection) -> Result<Vec<Property>, GatewayError> {
        self.gateway
            .select_all(&selection.property_query(self.table()))
            .await
    }

    /// Cities, zips and scores for the filter panel
    ///
    /// Each list is loaded on its own; a failed one comes back empty with a notice.
    pub async fn filter_options(&self, selection: &FilterSelection) -> FilterOptionsResponse {
        let (cities, zips, scores) = tokio::join!(
            self.available_cities(),
            self.available_zip_codes(&selection.cities),
            self.available_scores(&selection.cities, &selection.zips),
        );

        let mut notices = Vec::new();

        FilterOptionsResponse {
            cities: recover(cities, "cities", &mut notices).unwrap_or_default(),
            zip_codes: recover(zips, "zip codes", &mut notices).unwrap_or_default(),
            scores: recover(scores, "scores", &mut notices).unwrap_or_default(),
            notices,
        }
    }

    /// Everything the dashboard shows for one selection
    ///
    /// The five reads run concurrently. A failing read is logged and becomes
    /// a notice; the others are still returned.
    pub async fn dashboard(&self, selection: &FilterSelection) -> DashboardResponse {
        let (cities, zips, scores, count, properties) = tokio::join!(
            self.available_cities(),
            self.available_zip_codes(&selection.cities),
            self.available_scores(&selection.cities, &selection.zips),
            self.total_count(selection),
            self.properties(selection),
        );

        let mut notices = Vec::new();

        let cities = recover(cities, "cities", &mut notices).unwrap_or_default();
        let zip_codes = recover(zips, "zip codes", &mut notices).unwrap_or_default();
        let scores = recover(scores, "scores", &mut notices).unwrap_or_default();
        let total_count = recover(count, "property count", &mut notices);
        let properties = recover(properties, "properties", &mut notices);

        let properties = match properties {
            Some(rows) => {
                if rows.is_empty() {
                    notices.push(Notice::info(NO_MATCHES_NOTICE));
                }
                rows
            }
            None => Vec::new(),
        };

        let map = aggregation::map_view(&properties, &self.map);
        let stats = aggregation::summarize(&properties);

        tracing::debug!(
            "Dashboard: {} properties, {} cities, {} notices",
            properties.len(),
            cities.len(),
            notices.len()
        );

        DashboardResponse {
            selection: selection.clone(),
            cities,
            zip_codes,
            scores,
            total_count,
            properties,
            map,
            stats,
            notices,
        }
    }
}

fn recover<T>(result: Result<T, GatewayError>, what: &str, notices: &mut Vec<Notice>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Failed to load {}: {}", what, e);
            notices.push(Notice::error(format!("Failed to load {}", what)));
            None
        }
    }
}

fn to_strings(values: Vec<i64>) -> Vec<String> {
    values.into_iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoticeLevel;

    #[test]
    fn test_recover_records_notice() {
        let mut notices = Vec::new();
        let failed: Result<u64, GatewayError> = Err(GatewayError::Unauthorized);
        assert_eq!(recover(failed, "property count", &mut notices), None);
        assert_eq!(recover(Ok(3u64), "scores", &mut notices), Some(3));

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Failed to load property count");
    }

    #[test]
    fn test_to_strings() {
        assert_eq!(to_strings(vec![75201, 75034]), vec!["75201", "75034"]);
    }
}
