//! Everything in one partition.

use crate::error::StoreResult;
use crate::value::Value;

use super::{PartitionRange, Partitioner};

/// Maps every index value to one fixed partition name.
#[derive(Debug, Clone)]
pub struct SinglePartitioner {
    name: String,
}

impl SinglePartitioner {
    /// Create a partitioner that always answers `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Partitioner for SinglePartitioner {
    fn partition(&self, _index: &Value) -> StoreResult<String> {
        Ok(self.name.clone())
    }

    fn range(&self, _names: &[String]) -> Option<PartitionRange> {
        Some(PartitionRange {
            first: self.name.clone(),
            last: self.name.clone(),
        })
    }
}
