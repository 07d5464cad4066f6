use crate::models::{LatLng, MapView, Property};
use geo::{Centroid, MultiPoint, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Viewport used when there is nothing to show
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 39.8283,
    lng: -98.5795,
};
pub const DEFAULT_ZOOM: u8 = 4;
pub const ZOOMED_IN: u8 = 12;

/// Map viewport rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapDefaults {
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub zoomed_in: u8,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            zoomed_in: ZOOMED_IN,
        }
    }
}

/// Client-side aggregates over one property set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyStats {
    pub property_count: usize,
    pub unique_zip_count: usize,
    /// combined_score -> number of properties
    pub score_distribution: BTreeMap<i64, usize>,
    pub total_estimated_value: f64,
}

/// Distinct values, alphabetical
pub fn distinct_strings<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct values, numeric ascending
pub fn distinct_numbers<I>(values: I) -> Vec<i64>
where
    I: IntoIterator<Item = i64>,
{
    values
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Arithmetic mean of all known coordinates
pub fn centroid(properties: &[Property]) -> Option<LatLng> {
    let points: Vec<Point<f64>> = properties
        .iter()
        .filter_map(Property::coordinates)
        .map(|(lat, lng)| Point::new(lng, lat))
        .collect();

    if points.is_empty() {
        return None;
    }

    MultiPoint::from(points).centroid().map(|p| LatLng {
        lat: p.y(),
        lng: p.x(),
    })
}

/// Viewport for a fetched property set
///
/// Zooms in on the centroid when any property has coordinates, otherwise
/// falls back to the default view.
pub fn map_view(properties: &[Property], defaults: &MapDefaults) -> MapView {
    match centroid(properties) {
        Some(center) => MapView {
            center,
            zoom: defaults.zoomed_in,
        },
        None => MapView {
            center: defaults.default_center,
            zoom: defaults.default_zoom,
        },
    }
}

pub fn summarize(properties: &[Property]) -> PropertyStats {
    let mut score_distribution = BTreeMap::new();
    for score in properties.iter().filter_map(|p| p.combined_score) {
        *score_distribution.entry(score).or_insert(0) += 1;
    }

    let unique_zip_count = properties
        .iter()
        .filter_map(|p| p.zip)
        .collect::<BTreeSet<_>>()
        .len();

    PropertyStats {
        property_count: properties.len(),
        unique_zip_count,
        score_distribution,
        total_estimated_value: properties.iter().filter_map(|p| p.estimated_value).sum(),
    }
}
