//! Worker pool dispatcher
//!
//! Fans the work set out across a bounded number of in-flight tasks and
//! merges every per-item update into one keyed batch. Workers share nothing;
//! the merge happens as results complete, in whatever order they finish.

use std::future::Future;

use futures::{stream, StreamExt};

use crate::types::{BatchResult, FieldUpdate};

/// Default number of requests in flight simultaneously.
pub const DEFAULT_POOL_SIZE: usize = 25;

/// Run `process` over every item with at most `pool_size` invocations in
/// flight, and return the merged result keyed by record id. One entry per
/// input item, empty updates included; completion order does not matter.
pub async fn dispatch_all<T, F, Fut>(items: Vec<T>, pool_size: usize, mut process: F) -> BatchResult
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = FieldUpdate>,
{
    stream::iter(items)
        .map(|item| process(item))
        .buffer_unordered(pool_size.max(1))
        .fold(BatchResult::new(), |mut merged, update| async move {
            merged.insert(update.id.clone(), update);
            merged
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn items(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[tokio::test]
    async fn returns_one_entry_per_item_including_empty_ones() {
        let results = dispatch_all(items(10), 3, |i| async move {
            let mut update = FieldUpdate::new(format!("R{}", i));
            if i % 2 == 0 {
                update.set("Field__c", i as i64);
            }
            update
        })
        .await;

        assert_eq!(results.len(), 10);
        assert!(results["R3"].is_empty());
        assert!(!results["R4"].is_empty());
    }

    #[tokio::test]
    async fn merge_is_order_independent() {
        let process = |i: usize| async move {
            let mut update = FieldUpdate::new(format!("R{}", i));
            update.set("Field__c", i as i64);
            update
        };

        let forward = dispatch_all(items(8), 2, process).await;
        let reversed = dispatch_all(items(8).into_iter().rev().collect(), 2, process).await;

        assert_eq!(forward, reversed);
    }

    #[tokio::test(start_paused = true)]
    async fn bounds_in_flight_work_to_pool_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let results = dispatch_all(items(20), 4, |i| {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                FieldUpdate::new(format!("R{}", i))
            }
        })
        .await;

        assert_eq!(results.len(), 20);
        assert!(max_seen.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn zero_pool_size_is_clamped_to_one() {
        let results = dispatch_all(items(3), 0, |i| async move {
            FieldUpdate::new(format!("R{}", i))
        })
        .await;
        assert_eq!(results.len(), 3);
    }
}
