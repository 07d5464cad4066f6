//! Roofscope - dashboard API for wind-damage property leads
//!
//! Serves filter options, filtered property listings with map and score
//! aggregates, CRM interaction tracking, PDF/ZIP/CSV report export and the
//! public access-request form, all on top of a hosted REST data service and
//! object store.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{FilterAction, FilterSelection, ReportText};
pub use models::{CrmInteraction, CrmStatus, Property};
