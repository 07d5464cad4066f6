use crate::core::query::TableQuery;
use crate::models::Property;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const DEFAULT_MIN_PRICE: f64 = 250_000.0;
pub const DEFAULT_MAX_PRICE: f64 = 2_500_000.0;

/// Sentinel value that toggles every available option at once
pub const ALL: &str = "all";

pub const CITY_COLUMN: &str = "city";
pub const ZIP_COLUMN: &str = "zip";
pub const SCORE_COLUMN: &str = "combined_score";
pub const PRICE_COLUMN: &str = "estimated_value";

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("minimum price {min} exceeds maximum price {max}")]
    InvalidPriceRange { min: f64, max: f64 },

    #[error("price must be a non-negative number, got {0}")]
    InvalidPrice(f64),
}

/// Inclusive estimated-value bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PRICE,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

impl PriceRange {
    /// The default range matches everything and is never sent as a predicate
    pub fn is_default(&self) -> bool {
        self.min == DEFAULT_MIN_PRICE && self.max == DEFAULT_MAX_PRICE
    }
}

/// Filter dimension that supports set selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    City,
    Zip,
    Score,
}

/// A user edit to the selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterAction {
    Toggle { dimension: Dimension, value: String },
    Remove { dimension: Dimension, value: String },
    SetMinPrice { value: f64 },
    SetMaxPrice { value: f64 },
    Reset,
}

/// Current filter selections
///
/// Plain state passed into the query builders below; the service never keeps
/// one between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub cities: BTreeSet<String>,
    #[serde(default)]
    pub zips: BTreeSet<String>,
    #[serde(default)]
    pub scores: BTreeSet<String>,
    #[serde(default)]
    pub price: PriceRange,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::City => &self.cities,
            Dimension::Zip => &self.zips,
            Dimension::Score => &self.scores,
        }
    }

    fn selected_mut(&mut self, dimension: Dimension) -> &mut BTreeSet<String> {
        match dimension {
            Dimension::City => &mut self.cities,
            Dimension::Zip => &mut self.zips,
            Dimension::Score => &mut self.scores,
        }
    }

    /// Toggle a value, or every `available` value when `value` is [`ALL`]
    ///
    /// "all" selects everything available unless everything is already
    /// selected, in which case it clears the dimension.
    pub fn toggle(&mut self, dimension: Dimension, value: &str, available: &[String]) {
        let selected = self.selected_mut(dimension);

        if value == ALL {
            let all_selected = available.iter().all(|v| selected.contains(v));
            if all_selected {
                selected.clear();
            } else {
                *selected = available.iter().cloned().collect();
            }
            return;
        }

        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    pub fn remove(&mut self, dimension: Dimension, value: &str) {
        self.selected_mut(dimension).remove(value);
    }

    pub fn set_min_price(&mut self, value: f64) -> Result<(), FilterError> {
        if !value.is_finite() || value < 0.0 {
            return Err(FilterError::InvalidPrice(value));
        }
        if value > self.price.max {
            return Err(FilterError::InvalidPriceRange {
                min: value,
                max: self.price.max,
            });
        }
        self.price.min = value;
        Ok(())
    }

    pub fn set_max_price(&mut self, value: f64) -> Result<(), FilterError> {
        if !value.is_finite() || value < 0.0 {
            return Err(FilterError::InvalidPrice(value));
        }
        if value < self.price.min {
            return Err(FilterError::InvalidPriceRange {
                min: self.price.min,
                max: value,
            });
        }
        self.price.max = value;
        Ok(())
    }

    /// Apply an action; `available` is only consulted for "all" toggles
    pub fn apply(&mut self, action: &FilterAction, available: &[String]) -> Result<(), FilterError> {
        match action {
            FilterAction::Toggle { dimension, value } => self.toggle(*dimension, value, available),
            FilterAction::Remove { dimension, value } => self.remove(*dimension, value),
            FilterAction::SetMinPrice { value } => self.set_min_price(*value)?,
            FilterAction::SetMaxPrice { value } => self.set_max_price(*value)?,
            FilterAction::Reset => *self = FilterSelection::default(),
        }
        Ok(())
    }

    /// Selected zips parsed to numbers; unparseable entries are dropped
    pub fn parsed_zips(&self) -> Vec<i64> {
        parse_numeric(&self.zips, "zip")
    }

    /// Selected scores parsed to numbers; unparseable entries are dropped
    pub fn parsed_scores(&self) -> Vec<i64> {
        parse_numeric(&self.scores, "score")
    }

    /// Full property read with every active predicate ANDed together
    pub fn property_query(&self, table: &str) -> TableQuery {
        let mut query = TableQuery::new(table);

        if !self.price.is_default() {
            query = query
                .gte(PRICE_COLUMN, self.price.min)
                .lte(PRICE_COLUMN, self.price.max);
        }

        query = with_city_filter(query, &self.cities);

        if !self.zips.is_empty() {
            query = query.in_number(ZIP_COLUMN, self.parsed_zips());
        }
        if !self.scores.is_empty() {
            query = query.in_number(SCORE_COLUMN, self.parsed_scores());
        }

        query.order("property_id", true)
    }

    /// In-memory equivalent of [`FilterSelection::property_query`]
    pub fn matches(&self, property: &Property) -> bool {
        if !self.price.is_default() {
            match property.estimated_value {
                Some(value) if value >= self.price.min && value <= self.price.max => {}
                _ => return false,
            }
        }

        if !self.cities.is_empty() {
            match &property.city {
                Some(city) if self.cities.contains(city) => {}
                _ => return false,
            }
        }

        if !self.zips.is_empty() {
            let zips = self.parsed_zips();
            match property.zip {
                Some(zip) if zips.contains(&zip) => {}
                _ => return false,
            }
        }

        if !self.scores.is_empty() {
            let scores = self.parsed_scores();
            match property.combined_score {
                Some(score) if scores.contains(&score) => {}
                _ => return false,
            }
        }

        true
    }
}

fn parse_numeric(values: &BTreeSet<String>, label: &str) -> Vec<i64> {
    values
        .iter()
        .filter_map(|v| match v.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!("Ignoring non-numeric {} filter value: {:?}", label, v);
                None
            }
        })
        .collect()
}

fn with_city_filter(query: TableQuery, cities: &BTreeSet<String>) -> TableQuery {
    if cities.is_empty() {
        query
    } else {
        query.in_text(CITY_COLUMN, cities.iter().cloned())
    }
}

/// Distinct-city read (one column, non-null)
pub fn city_options_query(table: &str) -> TableQuery {
    TableQuery::new(table)
        .select(CITY_COLUMN)
        .not_null(CITY_COLUMN)
        .order(CITY_COLUMN, true)
}

/// Zip read restricted to the selected cities (all cities when empty)
pub fn zip_options_query(table: &str, cities: &BTreeSet<String>) -> TableQuery {
    let query = TableQuery::new(table).select(ZIP_COLUMN).not_null(ZIP_COLUMN);
    with_city_filter(query, cities).order(ZIP_COLUMN, true)
}

/// Score read restricted to the selected cities and zips
pub fn score_options_query(
    table: &str,
    cities: &BTreeSet<String>,
    zips: &BTreeSet<String>,
) -> TableQuery {
    let query = TableQuery::new(table)
        .select(SCORE_COLUMN)
        .not_null(SCORE_COLUMN);
    let mut query = with_city_filter(query, cities);
    if !zips.is_empty() {
        query = query.in_number(ZIP_COLUMN, parse_numeric(zips, "zip"));
    }
    query.order(SCORE_COLUMN, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::Predicate;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_toggle_single_value() {
        let mut selection = FilterSelection::new();
        selection.toggle(Dimension::City, "Dallas", &[]);
        assert!(selection.cities.contains("Dallas"));

        selection.toggle(Dimension::City, "Dallas", &[]);
        assert!(selection.cities.is_empty());
    }

    #[test]
    fn test_toggle_all_twice_restores_selection() {
        let available = strings(&["Dallas", "Plano", "Frisco"]);

        let mut selection = FilterSelection::new();
        selection.toggle(Dimension::City, ALL, &available);
        assert_eq!(selection.cities.len(), 3);
        selection.toggle(Dimension::City, ALL, &available);
        assert!(selection.cities.is_empty());

        let mut full = FilterSelection::new();
        full.cities = available.iter().cloned().collect();
        let original = full.clone();
        full.toggle(Dimension::City, ALL, &available);
        full.toggle(Dimension::City, ALL, &available);
        assert_eq!(full, original);
    }

    #[test]
    fn test_toggle_all_from_partial_selects_everything() {
        let available = strings(&["75001", "75002"]);
        let mut selection = FilterSelection::new();
        selection.toggle(Dimension::Zip, "75001", &available);
        selection.toggle(Dimension::Zip, ALL, &available);
        assert_eq!(selection.zips.len(), 2);
    }

    #[test]
    fn test_dimensions_are_independent() {
        let mut selection = FilterSelection::new();
        selection.toggle(Dimension::Score, "3", &[]);
        assert!(selection.cities.is_empty());
        assert!(selection.zips.is_empty());
        assert_eq!(selection.scores.len(), 1);
    }

    #[test]
    fn test_price_bounds_enforce_order() {
        let mut selection = FilterSelection::new();
        assert!(selection.set_min_price(3_000_000.0).is_err());
        assert_eq!(selection.price.min, DEFAULT_MIN_PRICE);

        assert!(selection.set_max_price(100_000.0).is_err());
        assert!(selection.set_min_price(-1.0).is_err());

        selection.set_min_price(500_000.0).unwrap();
        selection.set_max_price(500_000.0).unwrap();
        assert_eq!(selection.price, PriceRange { min: 500_000.0, max: 500_000.0 });
    }

    #[test]
    fn test_default_price_range_is_not_sent() {
        let query = FilterSelection::new().property_query("properties");
        assert!(query.filters.iter().all(|(column, _)| column != PRICE_COLUMN));

        let mut selection = FilterSelection::new();
        selection.set_max_price(1_000_000.0).unwrap();
        let query = selection.property_query("properties");
        assert!(query
            .filters
            .contains(&(PRICE_COLUMN.to_string(), Predicate::Gte("250000".to_string()))));
        assert!(query
            .filters
            .contains(&(PRICE_COLUMN.to_string(), Predicate::Lte("1000000".to_string()))));
    }

    #[test]
    fn test_zip_and_score_filters_are_numeric() {
        let mut selection = FilterSelection::new();
        selection.toggle(Dimension::Zip, "75024", &[]);
        selection.toggle(Dimension::Zip, "not-a-zip", &[]);
        selection.toggle(Dimension::Score, "2", &[]);

        let query = selection.property_query("properties");
        assert!(query
            .filters
            .contains(&(ZIP_COLUMN.to_string(), Predicate::InNumber(vec![75024]))));
        assert!(query
            .filters
            .contains(&(SCORE_COLUMN.to_string(), Predicate::InNumber(vec![2]))));
    }

    #[test]
    fn test_in_memory_match_mirrors_query() {
        let mut selection = FilterSelection::new();
        selection.toggle(Dimension::City, "Plano", &[]);
        selection.set_min_price(400_000.0).unwrap();

        let hit = Property {
            property_id: "a".to_string(),
            city: Some("Plano".to_string()),
            estimated_value: Some(450_000.0),
            ..Default::default()
        };
        let wrong_city = Property {
            city: Some("Dallas".to_string()),
            ..hit.clone()
        };
        let too_cheap = Property {
            estimated_value: Some(300_000.0),
            ..hit.clone()
        };

        assert!(selection.matches(&hit));
        assert!(!selection.matches(&wrong_city));
        assert!(!selection.matches(&too_cheap));
    }

    #[test]
    fn test_apply_action_reports_price_errors() {
        let mut selection = FilterSelection::new();
        let result = selection.apply(&FilterAction::SetMinPrice { value: 9e9 }, &[]);
        assert!(matches!(result, Err(FilterError::InvalidPriceRange { .. })));

        selection.apply(&FilterAction::Toggle { dimension: Dimension::City, value: "Allen".into() }, &[]).unwrap();
        selection.apply(&FilterAction::Reset, &[]).unwrap();
        assert_eq!(selection, FilterSelection::default());
    }

    #[test]
    fn test_zip_options_restricted_to_cities() {
        let cities: BTreeSet<String> = ["Plano".to_string()].into_iter().collect();
        let query = zip_options_query("properties", &cities);
        assert_eq!(query.select, ZIP_COLUMN);
        assert!(query
            .filters
            .contains(&(CITY_COLUMN.to_string(), Predicate::InText(vec!["Plano".to_string()]))));

        let unrestricted = zip_options_query("properties", &BTreeSet::new());
        assert!(unrestricted.filters.iter().all(|(column, _)| column != CITY_COLUMN));
    }
}
