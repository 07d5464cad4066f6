//! Gateway read description, rendered to PostgREST-style query parameters.
//!
//! Building a query is pure; `services::gateway` is the only place that sends one.

use std::fmt;

/// Column predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String),
    Gte(String),
    Lte(String),
    /// Inclusion over string values (quoted on the wire)
    InText(Vec<String>),
    /// Inclusion over numeric values
    InNumber(Vec<i64>),
    NotNull,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(v) => write!(f, "eq.{}", v),
            Predicate::Gte(v) => write!(f, "gte.{}", v),
            Predicate::Lte(v) => write!(f, "lte.{}", v),
            Predicate::InText(values) => {
                let quoted = values
                    .iter()
                    .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "in.({})", quoted)
            }
            Predicate::InNumber(values) => {
                let joined = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "in.({})", joined)
            }
            Predicate::NotNull => write!(f, "not.is.null"),
        }
    }
}

/// A filtered read against one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub select: String,
    pub filters: Vec<(String, Predicate)>,
    pub order: Vec<(String, bool)>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.filters.push((column.into(), predicate));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Predicate::Eq(value.to_string()))
    }

    pub fn gte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Predicate::Gte(value.to_string()))
    }

    pub fn lte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Predicate::Lte(value.to_string()))
    }

    pub fn in_text<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(column, Predicate::InText(values))
    }

    pub fn in_number<I>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        self.filter(column, Predicate::InNumber(values.into_iter().collect()))
    }

    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.filter(column, Predicate::NotNull)
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push((column.into(), ascending));
        self
    }

    /// Restrict to the page `[offset, offset + limit)`
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Query-string parameters for this read
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];

        for (column, predicate) in &self.filters {
            params.push((column.clone(), predicate.to_string()));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, asc)| format!("{}.{}", column, if *asc { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_predicates_in_order() {
        let query = TableQuery::new("properties")
            .select("city")
            .gte("estimated_value", 300000)
            .in_text("city", ["Dallas", "Fort Worth"])
            .in_number("zip", [75001, 75002])
            .not_null("combined_score")
            .order("city", true)
            .page(1000, 1000);

        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "city".to_string()),
                ("estimated_value".to_string(), "gte.300000".to_string()),
                ("city".to_string(), "in.(\"Dallas\",\"Fort Worth\")".to_string()),
                ("zip".to_string(), "in.(75001,75002)".to_string()),
                ("combined_score".to_string(), "not.is.null".to_string()),
                ("order".to_string(), "city.asc".to_string()),
                ("offset".to_string(), "1000".to_string()),
                ("limit".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let predicate = Predicate::InText(vec!["O\"Fallon".to_string()]);
        assert_eq!(predicate.to_string(), "in.(\"O\\\"Fallon\")");
    }
}
