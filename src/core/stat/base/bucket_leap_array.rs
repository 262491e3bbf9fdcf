use super::{LeapArray, MetricBucket};
use crate::base::{MetricEvent, WriteStat, DEFAULT_STATISTIC_MAX_RT};
use crate::logging;
use crate::utils::curr_time_millis;
use crate::Result;

/// a specialization of `LeapArray<T>` with `MetricBucket`
pub type BucketLeapArray = LeapArray<MetricBucket>;

impl WriteStat for BucketLeapArray {
    fn add_count(&self, event: MetricEvent, count: u64) {
        if let Err(err) = self.add_count_with_time(curr_time_millis(), event, count) {
            logging::FREQUENT_ERROR_ONCE.call_once(|| {
                logging::error!(
                    "[BucketLeapArray add_count] Fail to add count, event: {:?}, error: {:?}",
                    event,
                    err
                );
            });
        }
    }
}

impl BucketLeapArray {
    pub fn add_count_with_time(&self, now: u64, event: MetricEvent, count: u64) -> Result<()> {
        let bucket = self.get_bucket_of_time(now)?;
        bucket.value().add(event, count);
        Ok(())
    }

    pub fn update_concurrency(&self, concurrency: u32) {
        if let Ok(bucket) = self.current_bucket() {
            bucket.value().update_concurrency(concurrency);
        }
    }

    pub fn count(&self, event: MetricEvent) -> u64 {
        self.count_with_time(curr_time_millis(), event)
    }

    pub fn count_with_time(&self, now: u64, event: MetricEvent) -> u64 {
        self.get_valid_values(now)
            .iter()
            .map(|b| b.value().get(event))
            .sum()
    }

    pub fn min_rt(&self) -> u64 {
        self.get_current_values()
            .iter()
            .map(|b| b.value().min_rt())
            .fold(DEFAULT_STATISTIC_MAX_RT, u64::min)
    }

    pub fn max_concurrency(&self) -> u32 {
        self.get_current_values()
            .iter()
            .map(|b| b.value().max_concurrency())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // 20 buckets of 500ms
    const SAMPLE_COUNT: u32 = 20;
    const INTERVAL_MS: u32 = 10_000;

    #[test]
    fn add_count() {
        let arr = BucketLeapArray::new(SAMPLE_COUNT, INTERVAL_MS).unwrap();
        arr.add_count(MetricEvent::Pass, 3);
        arr.add_count(MetricEvent::Block, 1);
        assert_eq!(arr.count(MetricEvent::Pass), 3);
        assert_eq!(arr.count(MetricEvent::Block), 1);
        assert_eq!(arr.count(MetricEvent::Complete), 0);
    }

    #[test]
    fn min_rt_and_concurrency() {
        let arr = BucketLeapArray::new(SAMPLE_COUNT, INTERVAL_MS).unwrap();
        assert_eq!(arr.min_rt(), DEFAULT_STATISTIC_MAX_RT);
        assert_eq!(arr.max_concurrency(), 0);
        arr.add_count(MetricEvent::Rt, 100);
        arr.update_concurrency(3);
        arr.update_concurrency(1);
        assert_eq!(arr.min_rt(), 100);
        assert_eq!(arr.max_concurrency(), 3);
    }

    #[test]
    fn expired_buckets_are_skipped() {
        let arr = BucketLeapArray::new(SAMPLE_COUNT, INTERVAL_MS).unwrap();
        let start = 1_600_000_000_000u64;
        arr.add_count_with_time(start, MetricEvent::Pass, 5).unwrap();
        arr.add_count_with_time(start + 4_000, MetricEvent::Pass, 7)
            .unwrap();
        assert_eq!(arr.count_with_time(start + 9_999, MetricEvent::Pass), 12);
        // the first bucket still counts when it started exactly one interval ago
        assert_eq!(arr.count_with_time(start + 10_000, MetricEvent::Pass), 12);
        assert_eq!(arr.count_with_time(start + 10_001, MetricEvent::Pass), 7);
        assert_eq!(arr.count_with_time(start + 14_500, MetricEvent::Pass), 0);
    }

    #[test]
    fn concurrent_writers() {
        let arr = Arc::new(BucketLeapArray::new(SAMPLE_COUNT, INTERVAL_MS).unwrap());
        let start = 1_600_000_000_000u64;
        let handles: Vec<_> = (0..50u64)
            .map(|i| {
                let arr = Arc::clone(&arr);
                thread::spawn(move || {
                    for j in 0..20u64 {
                        let offset = (i * 37 + j * 500) % INTERVAL_MS as u64;
                        arr.add_count_with_time(start + offset, MetricEvent::Pass, 1)
                            .unwrap();
                        arr.add_count_with_time(start + offset, MetricEvent::Rt, 10)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let now = start + INTERVAL_MS as u64 - 1;
        assert_eq!(arr.count_with_time(now, MetricEvent::Pass), 1000);
        assert_eq!(arr.count_with_time(now, MetricEvent::Rt), 10_000);
    }
}
