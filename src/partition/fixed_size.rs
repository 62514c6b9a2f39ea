//! Fixed-size numeric partitions.

use crate::error::{StoreError, StoreResult};
use crate::value::Value;

use super::{range_by_key, PartitionRange, Partitioner};

/// Buckets `Number` indices into ranges of a fixed width.
///
/// `partition(i) = i - (i mod size)`, rendered as a decimal. The range
/// sorts names numerically.
#[derive(Debug, Clone)]
pub struct FixedSizePartitioner {
    size: f64,
}

impl FixedSizePartitioner {
    /// Create a partitioner with the given bucket width.
    #[must_use]
    pub fn new(size: f64) -> Self {
        assert!(size.is_finite() && size > 0.0, "size must be positive");
        Self { size }
    }
}

impl Partitioner for FixedSizePartitioner {
    fn partition(&self, index: &Value) -> StoreResult<String> {
        let Value::Number(n) = index else {
            return Err(StoreError::unsupported(format!(
                "fixed-size partitioner needs a Number index, found {index:?}"
            )));
        };
        Ok((n - (n % self.size)).to_string())
    }

    fn range(&self, names: &[String]) -> Option<PartitionRange> {
        if names.is_empty() {
            return None;
        }
        range_by_key(names, |name| name.parse::<f64>().unwrap_or(f64::NAN))
    }
}
