use super::{BucketLeapArray, BucketWrap, MetricBucket};
use crate::base::{check_validity_for_reuse_statistic, MetricEvent, ReadStat, DEFAULT_STATISTIC_MAX_RT};
use crate::utils::curr_time_millis;
use crate::Result;
use std::sync::Arc;

/// SlidingWindowMetric is a read-only view over a `BucketLeapArray`.
///
/// The inner array is owned by the resource node and is written by the statistic slot,
/// several views with different (but compatible) windows may be built on the same array,
/// e.g., the default one used by the flow rules and the per-rule ones.
#[derive(Debug)]
pub struct SlidingWindowMetric {
    bucket_len_ms: u32,
    sample_count: u32,
    interval_ms: u32,
    inner: Arc<BucketLeapArray>,
}

impl SlidingWindowMetric {
    pub fn new(sample_count: u32, interval_ms: u32, inner: Arc<BucketLeapArray>) -> Result<Self> {
        check_validity_for_reuse_statistic(
            sample_count,
            interval_ms,
            inner.sample_count(),
            inner.interval_ms(),
        )?;
        Ok(SlidingWindowMetric {
            bucket_len_ms: interval_ms / sample_count,
            sample_count,
            interval_ms,
            inner,
        })
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn bucket_len_ms(&self) -> u32 {
        self.bucket_len_ms
    }

    /// Get the start time range of the inner buckets covered by the window at `t_ms`.
    /// The actual time span is: [start, end + inner bucket length).
    pub(crate) fn bucket_start_range(&self, t_ms: u64) -> (u64, u64) {
        let end = self.inner.calculate_start_stamp(t_ms);
        let start = (end + self.inner.bucket_len_ms() as u64)
            .saturating_sub(self.interval_ms as u64);
        (start, end)
    }

    pub(crate) fn satisfied_buckets(&self, now: u64) -> Vec<Arc<BucketWrap<MetricBucket>>> {
        let (start, end) = self.bucket_start_range(now);
        self.inner
            .get_valid_values_conditional(now, &move |curr: u64| start <= curr && curr <= end)
    }

    pub fn interval_s(&self) -> f64 {
        self.interval_ms as f64 / 1000.0
    }

    pub fn sum_with_time(&self, now: u64, event: MetricEvent) -> u64 {
        self.satisfied_buckets(now)
            .iter()
            .map(|b| b.value().get(event))
            .sum()
    }

    pub fn qps_with_time(&self, now: u64, event: MetricEvent) -> f64 {
        self.sum_with_time(now, event) as f64 / self.interval_s()
    }

    /// The largest count of `event` in a single inner bucket, scaled to a per second rate.
    pub fn max_avg(&self, event: MetricEvent) -> f64 {
        let max = self
            .satisfied_buckets(curr_time_millis())
            .iter()
            .map(|b| b.value().get(event))
            .max()
            .unwrap_or(0);
        max as f64 * 1000.0 / self.inner.bucket_len_ms() as f64
    }

    pub fn max_concurrency(&self) -> u32 {
        self.satisfied_buckets(curr_time_millis())
            .iter()
            .map(|b| b.value().max_concurrency())
            .max()
            .unwrap_or(0)
    }
}

impl ReadStat for SlidingWindowMetric {
    fn qps(&self, event: MetricEvent) -> f64 {
        self.qps_with_time(curr_time_millis(), event)
    }

    fn qps_previous(&self, event: MetricEvent) -> f64 {
        self.qps_with_time(curr_time_millis() - self.bucket_len_ms as u64, event)
    }

    fn sum(&self, event: MetricEvent) -> u64 {
        self.sum_with_time(curr_time_millis(), event)
    }

    fn min_rt(&self) -> f64 {
        self.satisfied_buckets(curr_time_millis())
            .iter()
            .map(|b| b.value().min_rt())
            .fold(DEFAULT_STATISTIC_MAX_RT, u64::min) as f64
    }

    fn avg_rt(&self) -> f64 {
        let now = curr_time_millis();
        let completed = self.sum_with_time(now, MetricEvent::Complete);
        if completed == 0 {
            0f64
        } else {
            self.sum_with_time(now, MetricEvent::Rt) as f64 / completed as f64
        }
    }
}
