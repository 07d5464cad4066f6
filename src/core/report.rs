//! Text content of a property report, independent of the PDF backend.

use crate::models::Property;
use chrono::{DateTime, NaiveDate};

pub const REPORT_TITLE: &str = "Wind Damage Assessment Report";

/// Characters per narrative line at the report's body font size
pub const NARRATIVE_WIDTH: usize = 90;

pub const CONTACT_FOOTER: [&str; 3] = [
    "Questions about this report? Contact our assessment team:",
    "(214) 555-0142  |  reports@roofscope.io",
    "Roofscope Property Intelligence",
];

/// Every piece of text placed on a report page
#[derive(Debug, Clone, PartialEq)]
pub struct ReportText {
    pub title: String,
    pub details: Vec<String>,
    pub narrative: Vec<String>,
    pub gust_heading: String,
    pub gust_lines: Vec<String>,
    pub footer: Vec<String>,
}

impl ReportText {
    pub fn for_property(property: &Property) -> Self {
        Self {
            title: REPORT_TITLE.to_string(),
            details: detail_lines(property),
            narrative: wrap(&narrative(property), NARRATIVE_WIDTH),
            gust_heading: "Recorded wind gusts:".to_string(),
            gust_lines: gust_lines(property),
            footer: CONTACT_FOOTER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Right-column fields, only those present
pub fn detail_lines(property: &Property) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(address) = non_empty(&property.formatted_address) {
        lines.push(format!("Address: {}", address));
    }
    if let Some(city) = non_empty(&property.city) {
        lines.push(format!("City: {}", city));
    }
    if let Some(zip) = property.zip {
        lines.push(format!("Zip: {}", zip));
    }
    if let Some(year) = property.year_built {
        lines.push(format!("Year Built: {}", year));
    }
    if let Some(roof) = non_empty(&property.roof_type) {
        lines.push(format!("Roof Type: {}", roof));
    }
    if let Some(owner) = non_empty(&property.owner_name) {
        lines.push(format!("Owner: {}", owner));
    }

    lines
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn narrative(property: &Property) -> String {
    let count = property.count_gusts.unwrap_or(0);
    let events = if count == 1 { "event" } else { "events" };
    format!(
        "Our records show this property has been exposed to {} high-wind {} strong enough \
         to cause roof damage. Storm damage is often invisible from the ground, and most \
         insurance policies limit how long after an event a claim can be filed. We recommend \
         a professional inspection to document the current condition of the roof.",
        count, events
    )
}

/// Numbered gust lines: `N. {gust:.1} mph (DD/MM/YYYY)`
///
/// Incomplete slots are dropped before numbering, so slots 1 and 3 render as
/// lines 1 and 2.
pub fn gust_lines(property: &Property) -> Vec<String> {
    property
        .gusts()
        .iter()
        .enumerate()
        .map(|(idx, gust)| {
            format!(
                "{}. {:.1} mph ({})",
                idx + 1,
                gust.gust_mph,
                format_gust_date(&gust.date)
            )
        })
        .collect()
}

/// `DD/MM/YYYY` for ISO dates or timestamps; anything else is shown as stored
pub fn format_gust_date(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format("%d/%m/%Y").to_string();
    }

    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Deterministic file name for a property's report
pub fn report_filename(property_id: &str) -> String {
    let safe: String = property_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("report_{}.pdf", safe)
}
