//! Per-partition write serialization.
//!
//! Each partition name owns one slot; a drain holds the slot for the whole
//! append-or-rewrite decision and emit. Waiters acquire in FIFO order, so
//! concurrent `put` calls on the same partition serialize in enqueue order
//! while distinct partitions drain concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One write slot per partition name.
#[derive(Debug, Default)]
pub(crate) struct PartitionQueues {
    slots: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PartitionQueues {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the slot for `name`, waiting behind earlier writers.
    pub(crate) async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(name.to_string()).or_default())
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_same_partition_serializes() {
        let queues = Arc::new(PartitionQueues::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let queues = Arc::clone(&queues);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                let _guard = queues.acquire("p").await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_partitions_do_not_block() {
        let queues = PartitionQueues::new();
        let _a = queues.acquire("a").await;
        let _b = queues.acquire("b").await;
    }
}
