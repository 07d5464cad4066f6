// Core exports
pub mod aggregation;
pub mod crm;
pub mod csv;
pub mod filters;
pub mod query;
pub mod report;

pub use aggregation::{map_view, summarize, MapDefaults, PropertyStats};
pub use filters::{Dimension, FilterAction, FilterError, FilterSelection, PriceRange};
pub use query::{Predicate, TableQuery};
pub use report::ReportText;
