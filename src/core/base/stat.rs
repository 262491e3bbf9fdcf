//! Statistic traits implemented by the resource nodes and the sliding windows,
//! and the compatibility rules between a window and the window it is derived from.
use crate::{utils::AsAny, Error, Result};
use enum_map::Enum;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Filters the buckets by their start timestamps.
pub type TimePredicate = dyn Fn(u64) -> bool;

/// The events counted by the buckets.
/// `Pass + Block` is the count of all the entries.
#[derive(Debug, Clone, Copy, PartialEq, Enum)]
pub enum MetricEvent {
    /// passed all the rule checking slots
    Pass,
    /// blocked by one of the rule checking slots
    Block,
    /// a passed entry exited
    Complete,
    /// a business error recorded on a passed entry
    Error,
    /// accumulated response time, in ms
    Rt,
}

pub const ILLEGAL_GLOBAL_STATISTIC_PARAMS_ERROR: &str =
    "illegal global statistic window: interval must be a positive multiple of the sample count";
pub const ILLEGAL_STATISTIC_PARAMS_ERROR: &str =
    "illegal statistic window: interval must be a positive multiple of the sample count";
pub const GLOBAL_STATISTIC_NON_REUSABLE_ERROR: &str =
    "statistic window can not be derived from the global statistic window";

pub trait ReadStat: Send + Sync + fmt::Debug {
    fn qps(&self, _event: MetricEvent) -> f64 {
        0f64
    }
    /// QPS of the window right before the current one.
    fn qps_previous(&self, _event: MetricEvent) -> f64 {
        0f64
    }
    fn sum(&self, _event: MetricEvent) -> u64 {
        0u64
    }
    fn min_rt(&self) -> f64 {
        0f64
    }
    fn avg_rt(&self) -> f64 {
        0f64
    }
}

pub trait WriteStat: Send + Sync + fmt::Debug {
    fn add_count(&self, _event: MetricEvent, _count: u64) {}
}

pub trait ConcurrencyStat: Send + Sync + fmt::Debug {
    fn current_concurrency(&self) -> u32;
    fn increase_concurrency(&self);
    fn decrease_concurrency(&self);
}

/// StatNode holds real-time statistics for resources.
pub trait StatNode: ReadStat + WriteStat + ConcurrencyStat + Any + AsAny {
    /// Builds a read-only view over the node's statistic with another window,
    /// which must be compatible with the node's own window.
    fn generate_read_stat(&self, sample_count: u32, interval_ms: u32) -> Result<Arc<dyn ReadStat>>;
}

/// A window of `sample_count` buckets spanning `interval_ms`.
#[derive(Debug, Clone, Copy)]
struct StatWindow {
    sample_count: u32,
    interval_ms: u32,
}

impl StatWindow {
    fn checked(sample_count: u32, interval_ms: u32, error_msg: &'static str) -> Result<Self> {
        if sample_count == 0 || interval_ms == 0 || interval_ms % sample_count != 0 {
            return Err(Error::msg(error_msg));
        }
        Ok(StatWindow {
            sample_count,
            interval_ms,
        })
    }

    fn bucket_len_ms(&self) -> u32 {
        self.interval_ms / self.sample_count
    }

    /// A window is derivable from the parent if it covers a divisor of the parent's interval,
    /// and each of its buckets is made of whole parent buckets.
    fn derivable_from(&self, parent: &StatWindow) -> bool {
        parent.interval_ms % self.interval_ms == 0
            && self.bucket_len_ms() % parent.bucket_len_ms() == 0
    }
}

pub fn check_validity_for_statistic(
    sample_count: u32,
    interval_ms: u32,
    error_msg: &'static str,
) -> Result<()> {
    StatWindow::checked(sample_count, interval_ms, error_msg).map(|_| ())
}

/// Checks whether a read-only window of (`sample_count`, `interval_ms`) can be built upon
/// the global window of (`parent_sample_count`, `parent_interval_ms`) of a resource.
pub fn check_validity_for_reuse_statistic(
    sample_count: u32,
    interval_ms: u32,
    parent_sample_count: u32,
    parent_interval_ms: u32,
) -> Result<()> {
    let window = StatWindow::checked(sample_count, interval_ms, ILLEGAL_STATISTIC_PARAMS_ERROR)?;
    let parent = StatWindow::checked(
        parent_sample_count,
        parent_interval_ms,
        ILLEGAL_GLOBAL_STATISTIC_PARAMS_ERROR,
    )?;
    if !window.derivable_from(&parent) {
        return Err(Error::msg(GLOBAL_STATISTIC_NON_REUSABLE_ERROR));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) use test::*;
