use super::{BucketLeapArray, SlidingWindowMetric};
use crate::{
    base::{ConcurrencyStat, MetricEvent, ReadStat, ResourceType, StatNode, WriteStat},
    config::StatConfig,
    Result,
};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// ResourceNode accumulates the statistics of one resource, or of one (resource, origin) pair.
/// The leap array keeps the longest window, the default metric is a view over it.
#[derive(Debug)]
pub struct ResourceNode {
    pub(crate) res_name: String,
    pub(crate) resource_type: ResourceType,
    pub(crate) concurrency: AtomicU32,
    pub(crate) arr: Arc<BucketLeapArray>,
    pub(crate) metric: Arc<SlidingWindowMetric>,
}

impl ResourceNode {
    pub fn new(res_name: String, resource_type: ResourceType, stat: &StatConfig) -> Result<Self> {
        let arr = Arc::new(BucketLeapArray::new(
            stat.sample_count_total,
            stat.interval_ms_total,
        )?);
        let metric = Arc::new(SlidingWindowMetric::new(
            stat.sample_count,
            stat.interval_ms,
            Arc::clone(&arr),
        )?);
        Ok(ResourceNode {
            res_name,
            resource_type,
            concurrency: AtomicU32::new(0),
            arr,
            metric,
        })
    }

    pub fn res_name(&self) -> &str {
        &self.res_name
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn default_metric(&self) -> Arc<dyn ReadStat> {
        self.metric.clone()
    }

    pub fn max_avg(&self, event: MetricEvent) -> f64 {
        self.metric.max_avg(event)
    }

    pub fn max_concurrency(&self) -> u32 {
        self.metric.max_concurrency()
    }

    /// Clears all the statistics.
    pub fn reset(&self) {
        self.arr.reset_all();
        self.concurrency.store(0, Ordering::SeqCst);
    }
}

impl ReadStat for ResourceNode {
    fn qps(&self, event: MetricEvent) -> f64 {
        self.metric.qps(event)
    }
    fn qps_previous(&self, event: MetricEvent) -> f64 {
        self.metric.qps_previous(event)
    }
    fn sum(&self, event: MetricEvent) -> u64 {
        self.metric.sum(event)
    }
    fn min_rt(&self) -> f64 {
        self.metric.min_rt()
    }
    fn avg_rt(&self) -> f64 {
        self.metric.avg_rt()
    }
}

impl WriteStat for ResourceNode {
    fn add_count(&self, event: MetricEvent, count: u64) {
        self.arr.add_count(event, count);
    }
}

impl ConcurrencyStat for ResourceNode {
    fn current_concurrency(&self) -> u32 {
        self.concurrency.load(Ordering::SeqCst)
    }

    fn increase_concurrency(&self) {
        let concurrency = self.concurrency.fetch_add(1, Ordering::SeqCst) + 1;
        self.arr.update_concurrency(concurrency);
    }

    fn decrease_concurrency(&self) {
        // never goes below zero, e.g., after a reset while entries are in flight
        let _ = self
            .concurrency
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1));
    }
}

impl StatNode for ResourceNode {
    fn generate_read_stat(&self, sample_count: u32, interval_ms: u32) -> Result<Arc<dyn ReadStat>> {
        let stat = SlidingWindowMetric::new(sample_count, interval_ms, Arc::clone(&self.arr))?;
        Ok(Arc::new(stat))
    }
}
