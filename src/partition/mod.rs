//! Partitioners.
//!
//! A partitioner is a pure mapping from an index value to a partition name,
//! plus the ability to pick the first and last populated partition out of a
//! name list under its natural order. Partitioners never touch the storage
//! adapter.

mod fixed_size;
mod single;
mod year_month;

use crate::error::StoreResult;
use crate::value::Value;

pub use fixed_size::FixedSizePartitioner;
pub use single::SinglePartitioner;
pub use year_month::{DateCoercion, YearMonthPartitioner};

// =============================================================================
// Partitioner Trait
// =============================================================================

/// First and last populated partition under a partitioner's natural order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRange {
    /// Name that sorts first
    pub first: String,
    /// Name that sorts last
    pub last: String,
}

/// Maps index values to partition names.
pub trait Partitioner: Send + Sync {
    /// Partition name for one index value.
    ///
    /// Total within the partitioner's declared index kind.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnsupportedType`](crate::StoreError::UnsupportedType)
    /// on a mismatched kind.
    fn partition(&self, index: &Value) -> StoreResult<String>;

    /// First and last of the given populated partition names, or `None`
    /// when the list is empty.
    ///
    /// Names comparing equal under the natural order fall back to
    /// lexicographic order on the raw string.
    fn range(&self, names: &[String]) -> Option<PartitionRange>;
}

/// Pick first/last by a numeric sort key with lexicographic tie-break.
pub(crate) fn range_by_key<K, F>(names: &[String], key: F) -> Option<PartitionRange>
where
    K: PartialOrd,
    F: Fn(&str) -> K,
{
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort_by(|a, b| {
        key(a)
            .partial_cmp(&key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(b))
    });
    Some(PartitionRange {
        first: (*sorted.first()?).clone(),
        last: (*sorted.last()?).clone(),
    })
}
