//! Fetched query results.
//!
//! A [`ResultSet`] wraps every row a query returned, in fetch order, and offers
//! indexed access, first/last shortcuts, column projection and JSON export.

use crate::error::{DbError, DbResult};
use crate::models::{Row, Value};
use serde::Serialize;

/// Projection of one column across a result.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues<'a> {
    /// The result has exactly one row: that row's value, if the column exists.
    Scalar(Option<&'a Value>),
    /// Any other row count: one entry per row, `None` where the column is missing.
    List(Vec<Option<&'a Value>>),
}

impl<'a> ColumnValues<'a> {
    pub fn as_scalar(&self) -> Option<&'a Value> {
        match self {
            Self::Scalar(v) => *v,
            Self::List(_) => None,
        }
    }

    /// Flatten into an aligned list regardless of variant.
    pub fn into_list(self) -> Vec<Option<&'a Value>> {
        match self {
            Self::Scalar(v) => vec![v],
            Self::List(values) => values,
        }
    }
}

/// Ordered, immutable collection of fetched rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Row at `index`.
    pub fn get(&self, index: usize) -> DbResult<&Row> {
        self.rows
            .get(index)
            .ok_or_else(|| DbError::index_out_of_range(index, self.rows.len()))
    }

    /// Value of `column` in the row at `index`; `Ok(None)` if the row lacks the column.
    pub fn get_value(&self, index: usize, column: &str) -> DbResult<Option<&Value>> {
        Ok(self.get(index)?.get(column))
    }

    pub fn first(&self) -> DbResult<&Row> {
        self.get(0)
    }

    pub fn first_value(&self, column: &str) -> DbResult<Option<&Value>> {
        self.get_value(0, column)
    }

    pub fn last(&self) -> DbResult<&Row> {
        self.get(self.last_index())
    }

    pub fn last_value(&self, column: &str) -> DbResult<Option<&Value>> {
        self.get_value(self.last_index(), column)
    }

    // An empty result maps to index 0, which then reports out of range.
    fn last_index(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Project `column`: a scalar for a single-row result, an aligned list otherwise.
    pub fn pluck(&self, column: &str) -> ColumnValues<'_> {
        match self.rows.as_slice() {
            [row] => ColumnValues::Scalar(row.get(column)),
            rows => ColumnValues::List(rows.iter().map(|row| row.get(column)).collect()),
        }
    }

    /// Values of `column` for every row, aligned to row order.
    pub fn column(&self, column: &str) -> Vec<Option<&Value>> {
        self.rows.iter().map(|row| row.get(column)).collect()
    }

    /// Column names of the first row; empty when there are no rows.
    pub fn column_names(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.columns().collect())
            .unwrap_or_default()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn all(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Fully materialized copy of the rows.
    pub fn to_array(&self) -> Vec<Row> {
        self.rows.clone()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.rows
                .iter()
                .map(|row| serde_json::Value::Object(row.to_json_map()))
                .collect(),
        )
    }

    /// Serialize as a JSON array of row objects.
    pub fn to_json(&self) -> DbResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> DbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<Vec<Row>> for ResultSet {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
