use crate::{
    stat::{BucketWrap, LeapArray, MetricTrait},
    Result,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Per-bucket counter of a breaker. `target` counts the
/// errors or the slow requests, depending on the strategy.
#[derive(Debug, Default)]
pub struct Counter {
    pub(crate) target: AtomicU64,
    pub(crate) total: AtomicU64,
}

impl Counter {
    pub fn target(&self) -> u64 {
        self.target.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}

impl MetricTrait for Counter {
    fn reset(&self) {
        self.target.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
    }
}

pub type CounterLeapArray = LeapArray<Counter>;

impl CounterLeapArray {
    pub fn current_counter(&self) -> Result<Arc<BucketWrap<Counter>>> {
        self.current_bucket()
    }

    pub fn all_counter(&self) -> Vec<Arc<BucketWrap<Counter>>> {
        self.get_current_values()
    }

    /// Records one completed request in the current bucket.
    pub fn add_count(&self, is_target: bool) -> Result<()> {
        let counter = self.current_counter()?;
        if is_target {
            counter.value().target.fetch_add(1, Ordering::SeqCst);
        }
        counter.value().total.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Returns `(target, total)` over the valid buckets.
    pub fn sums(&self) -> (u64, u64) {
        self.all_counter().iter().fold((0, 0), |(target, total), bucket| {
            (
                target + bucket.value().target(),
                total + bucket.value().total(),
            )
        })
    }
}
