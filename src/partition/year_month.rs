//! Year-month date partitions.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use crate::error::{StoreError, StoreResult};
use crate::value::Value;

use super::{range_by_key, PartitionRange, Partitioner};

/// Coerces a non-`Date` index value into an instant.
pub type DateCoercion = Arc<dyn Fn(&Value) -> Option<DateTime<Utc>> + Send + Sync>;

/// Buckets `Date` indices into `"YYYY-MM"` partitions in UTC.
///
/// An optional coercion lets stores whose index is date-like but not a
/// `Date` (say, a `Number` of epoch seconds) reuse the calendar layout.
#[derive(Clone)]
pub struct YearMonthPartitioner {
    coerce: Option<DateCoercion>,
}

impl YearMonthPartitioner {
    /// Create a partitioner over `Date` indices.
    #[must_use]
    pub fn new() -> Self {
        Self { coerce: None }
    }

    /// Create a partitioner that first coerces index values through `f`.
    #[must_use]
    pub fn with_coercion(f: DateCoercion) -> Self {
        Self { coerce: Some(f) }
    }

    fn instant(&self, index: &Value) -> StoreResult<DateTime<Utc>> {
        if let Value::Date(d) = index {
            return Ok(*d);
        }
        if let Some(coerce) = &self.coerce {
            if let Some(d) = coerce(index) {
                return Ok(d);
            }
        }
        Err(StoreError::unsupported(format!(
            "year-month partitioner needs a Date index, found {index:?}"
        )))
    }
}

impl Default for YearMonthPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for YearMonthPartitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YearMonthPartitioner")
            .field("coerce", &self.coerce.is_some())
            .finish()
    }
}

/// Sort key: `year * 12 + month`, unparsable names sort first.
fn month_ordinal(name: &str) -> i64 {
    let mut parts = name.splitn(2, '-');
    let year = parts.next().and_then(|y| y.parse::<i64>().ok());
    let month = parts.next().and_then(|m| m.parse::<i64>().ok());
    match (year, month) {
        (Some(y), Some(m)) => y * 12 + m,
        _ => i64::MIN,
    }
}

impl Partitioner for YearMonthPartitioner {
    fn partition(&self, index: &Value) -> StoreResult<String> {
        let d = self.instant(index)?;
        Ok(format!("{:04}-{:02}", d.year(), d.month()))
    }

    fn range(&self, names: &[String]) -> Option<PartitionRange> {
        if names.is_empty() {
            return None;
        }
        range_by_key(names, month_ordinal)
    }
}
