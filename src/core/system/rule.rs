use crate::{base::SentinelRule, logging, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The system metric a rule guards.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// 1-minute load average of the host
    Load,
    /// average response time of the inbound calls, in ms
    AvgRT,
    /// inbound calls in flight
    Concurrency,
    /// passed inbound calls per second
    InboundQPS,
    /// CPU usage ratio of the host
    CpuUsage,
}

impl Default for MetricType {
    fn default() -> MetricType {
        MetricType::Load
    }
}

/// How a `Load` or `CpuUsage` rule reacts once its threshold is exceeded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptiveStrategy {
    NoAdaptive,
    /// Still let a call through while the concurrency stays under
    /// `max completed QPS * min RT / 1000`, the estimated capacity.
    BBR,
}

impl Default for AdaptiveStrategy {
    fn default() -> AdaptiveStrategy {
        AdaptiveStrategy::NoAdaptive
    }
}

/// A threshold on one system metric, checked against the inbound traffic as a whole.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Rule {
    /// unique id
    pub id: String,
    pub metric_type: MetricType,
    /// the maximum value of the metric, a ratio in [0, 1] for `CpuUsage`
    pub threshold: f64,
    pub strategy: AdaptiveStrategy,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            metric_type: MetricType::default(),
            threshold: 0.0,
            strategy: AdaptiveStrategy::default(),
        }
    }
}

impl SentinelRule for Rule {
    fn resource_name(&self) -> String {
        format!("{:?}", self.metric_type)
    }

    fn is_valid(&self) -> Result<()> {
        if self.threshold < 0.0 {
            return Err(Error::msg("negative threshold"));
        }
        if self.metric_type == MetricType::CpuUsage && self.threshold > 1.0 {
            return Err(Error::msg("invalid CpuUsage threshold (valid range: [0.0, 1.0])"));
        }
        if self.strategy == AdaptiveStrategy::BBR
            && self.metric_type != MetricType::Load
            && self.metric_type != MetricType::CpuUsage
        {
            logging::info!(
                "[System is_valid] BBR only takes effect on Load and CpuUsage rules, rule: {:?}",
                self
            );
        }
        Ok(())
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.metric_type == other.metric_type
            && self.threshold == other.threshold
            && self.strategy == other.strategy
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.metric_type.hash(state);
        self.threshold.to_bits().hash(state);
        self.strategy.hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system rule {{metric: {:?}, threshold: {}, strategy: {:?}}}",
            self.metric_type, self.threshold, self.strategy
        )
    }
}
