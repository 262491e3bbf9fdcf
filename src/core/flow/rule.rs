use crate::{base::SentinelRule, logging, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

pub type Id = String;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Hash, Eq)]
pub enum ControlStrategy {
    /// Calls over the threshold of the window fail right away.
    Reject,
    /// Calls are spaced evenly, a call may wait up to `max_queueing_time_ms` for its turn.
    RateLimiter,
}

impl Default for ControlStrategy {
    fn default() -> ControlStrategy {
        ControlStrategy::Reject
    }
}

/// A flow control rule of one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Generated when absent.
    pub id: Id,
    pub resource: String,
    /// Only the calls from this origin are checked, empty checks every call.
    pub limit_origin: String,
    pub control_strategy: ControlStrategy,
    /// `Reject`: passed calls allowed per `stat_interval_ms`.
    /// `RateLimiter`: calls allowed per second.
    pub threshold: f64,
    /// `RateLimiter` only. With 0, a call arriving before its turn is refused.
    pub max_queueing_time_ms: u32,
    /// Window of a `Reject` rule, 0 reads the default window of the resource.
    /// Any other value must be derivable from the global window.
    pub stat_interval_ms: u32,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            resource: String::default(),
            limit_origin: String::default(),
            control_strategy: ControlStrategy::default(),
            threshold: 0.0,
            max_queueing_time_ms: 0,
            stat_interval_ms: 0,
        }
    }
}

// the id is not part of the identity of a rule
impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.limit_origin.hash(state);
        self.control_strategy.hash(state);
        self.max_queueing_time_ms.hash(state);
        self.stat_interval_ms.hash(state);
    }
}

impl Rule {
    pub fn need_statistic(&self) -> bool {
        self.control_strategy == ControlStrategy::Reject
    }

    /// Whether the rule applies to the calls from `origin`.
    pub fn matches_origin(&self, origin: &str) -> bool {
        self.limit_origin.is_empty() || self.limit_origin == origin
    }
}

impl SentinelRule for Rule {
    fn resource_name(&self) -> String {
        self.resource.clone()
    }

    fn is_valid(&self) -> crate::Result<()> {
        if self.resource.is_empty() {
            return Err(Error::msg("empty resource name"));
        }
        if self.threshold < 0.0 {
            return Err(Error::msg("negative threshold"));
        }
        if self.stat_interval_ms > 10 * 60 * 1000 {
            logging::info!(
                "[Flow is_valid] stat_interval_ms is longer than 10 minutes, rule: {:?}",
                self
            )
        }
        Ok(())
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
            && self.limit_origin == other.limit_origin
            && self.control_strategy == other.control_strategy
            && self.threshold == other.threshold
            && self.max_queueing_time_ms == other.max_queueing_time_ms
            && self.stat_interval_ms == other.stat_interval_ms
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flow rule {{resource: {}, origin: {:?}, strategy: {:?}, threshold: {}, stat_interval_ms: {}, max_queueing_time_ms: {}}}",
            self.resource,
            self.limit_origin,
            self.control_strategy,
            self.threshold,
            self.stat_interval_ms,
            self.max_queueing_time_ms
        )
    }
}
