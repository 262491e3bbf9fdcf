use super::*;
use crate::{base::SentinelRule, logging, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

pub const DEFAULT_STAT_INTERVAL_MS: u32 = 1000;

/// A circuit breaking rule. Each rule owns one breaker,
/// the breaker of an unchanged rule survives a reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub id: String,
    pub resource: String,
    pub strategy: BreakerStrategy,
    /// How long an open breaker refuses every call before it lets a probe through.
    pub time_window_sec: u32,
    /// The breaker does not trip while the window holds fewer completed calls than this.
    pub min_request_amount: u64,
    /// Length of the breaker's own sliding window.
    pub stat_interval_ms: u32,
    /// Buckets of that window. 0, or a count not dividing `stat_interval_ms`, means 1.
    pub stat_sliding_window_bucket_count: u32,
    /// Calls slower than this are slow calls. Only read by `SlowRequestRatio`.
    pub max_allowed_rt_ms: u64,
    /// A ratio in [0, 1] for `SlowRequestRatio` and `ErrorRatio`,
    /// an amount of errors for `ErrorCount`.
    pub threshold: f64,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            id: uuid::Uuid::new_v4().to_string(),
            resource: String::default(),
            strategy: BreakerStrategy::default(),
            time_window_sec: 0,
            min_request_amount: 0,
            stat_interval_ms: DEFAULT_STAT_INTERVAL_MS,
            stat_sliding_window_bucket_count: 0,
            max_allowed_rt_ms: 0,
            threshold: 0.0,
        }
    }
}

impl Rule {
    pub fn retry_timeout_ms(&self) -> u64 {
        self.time_window_sec as u64 * 1000
    }

    pub fn is_stat_reusable(&self, other: &Self) -> bool {
        self.resource == other.resource
            && self.strategy == other.strategy
            && self.stat_interval_ms == other.stat_interval_ms
            && self.stat_sliding_window_bucket_count == other.stat_sliding_window_bucket_count
    }

    pub fn get_rule_stat_sliding_window_bucket_count(&self) -> u32 {
        match self.stat_sliding_window_bucket_count {
            0 => 1,
            count if self.stat_interval_ms % count != 0 => 1,
            count => count,
        }
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
        if self.stat_interval_ms == 0 {
            return Err(Error::msg("invalid stat_interval_ms"));
        }
        if self.time_window_sec == 0 {
            return Err(Error::msg("invalid time_window_sec"));
        }
        if self.threshold < 0.0 {
            return Err(Error::msg("invalid threshold"));
        }
        if self.strategy != BreakerStrategy::ErrorCount && self.threshold > 1.0 {
            return Err(Error::msg(format!(
                "invalid {:?} ratio threshold (valid range: [0.0, 1.0])",
                self.strategy
            )));
        }
        if self.stat_sliding_window_bucket_count != 0
            && self.stat_interval_ms % self.stat_sliding_window_bucket_count != 0
        {
            logging::warn!(
                "[CircuitBreaker is_valid] stat_interval_ms is not a multiple of stat_sliding_window_bucket_count, a single bucket is used, rule: {:?}",
                self
            );
        }
        Ok(())
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        let basic_eq = self.resource == other.resource
            && self.strategy == other.strategy
            && self.time_window_sec == other.time_window_sec
            && self.min_request_amount == other.min_request_amount
            && self.stat_interval_ms == other.stat_interval_ms
            && self.stat_sliding_window_bucket_count == other.stat_sliding_window_bucket_count
            && self.threshold == other.threshold;
        match self.strategy {
            BreakerStrategy::SlowRequestRatio => {
                basic_eq && self.max_allowed_rt_ms == other.max_allowed_rt_ms
            }
            _ => basic_eq,
        }
    }
}

impl Eq for Rule {}

// consistent with `eq`: the id is left out, as is the threshold since it is a float
impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.strategy.hash(state);
        self.time_window_sec.hash(state);
        self.min_request_amount.hash(state);
        self.stat_interval_ms.hash(state);
        self.stat_sliding_window_bucket_count.hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "circuit breaker rule {{resource: {}, strategy: {:?}, threshold: {}, min_request_amount: {}, window: {}ms/{} buckets, retry after {}s}}",
            self.resource,
            self.strategy,
            self.threshold,
            self.min_request_amount,
            self.stat_interval_ms,
            self.get_rule_stat_sliding_window_bucket_count(),
            self.time_window_sec
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    fn valid_rule() -> Rule {
        Rule {
            resource: "abc".into(),
            strategy: BreakerStrategy::ErrorRatio,
            time_window_sec: 3,
            min_request_amount: 10,
            stat_interval_ms: 10000,
            threshold: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn validity() {
        assert!(valid_rule().is_valid().is_ok());
        let cases = vec![
            (
                Rule {
                    resource: "".into(),
                    ..valid_rule()
                },
                "empty resource name",
            ),
            (
                Rule {
                    stat_interval_ms: 0,
                    ..valid_rule()
                },
                "invalid stat_interval_ms",
            ),
            (
                Rule {
                    time_window_sec: 0,
                    ..valid_rule()
                },
                "invalid time_window_sec",
            ),
            (
                Rule {
                    threshold: -1.0,
                    ..valid_rule()
                },
                "invalid threshold",
            ),
            (
                Rule {
                    threshold: 1.1,
                    ..valid_rule()
                },
                "invalid ErrorRatio ratio threshold (valid range: [0.0, 1.0])",
            ),
        ];
        for (rule, msg) in cases {
            assert_eq!(rule.is_valid().unwrap_err().to_string(), msg);
        }
        // the count threshold is not a ratio
        let rule = Rule {
            strategy: BreakerStrategy::ErrorCount,
            threshold: 10.0,
            ..valid_rule()
        };
        assert!(rule.is_valid().is_ok());
    }

    #[test]
    fn time_window_in_ms() {
        assert_eq!(valid_rule().retry_timeout_ms(), 3000);
    }

    #[test]
    fn bucket_count() {
        let rule = Rule {
            stat_sliding_window_bucket_count: 3,
            ..valid_rule()
        };
        assert_eq!(rule.get_rule_stat_sliding_window_bucket_count(), 1);
        let rule = Rule {
            stat_sliding_window_bucket_count: 4,
            ..valid_rule()
        };
        assert_eq!(rule.get_rule_stat_sliding_window_bucket_count(), 4);
        assert_eq!(valid_rule().get_rule_stat_sliding_window_bucket_count(), 1);
    }

    #[test]
    fn equality() {
        let r1 = valid_rule();
        // max_allowed_rt_ms only matters for the slow request strategy
        let r2 = Rule {
            max_allowed_rt_ms: 100,
            ..valid_rule()
        };
        assert_eq!(r1, r2);
        let r3 = Rule {
            strategy: BreakerStrategy::SlowRequestRatio,
            ..r1.clone()
        };
        let r4 = Rule {
            strategy: BreakerStrategy::SlowRequestRatio,
            ..r2.clone()
        };
        assert_ne!(r3, r4);
        assert!(r1.is_stat_reusable(&Rule {
            threshold: 0.8,
            ..valid_rule()
        }));
        assert!(!r1.is_stat_reusable(&r3));
    }

    #[test]
    fn equal_rules_share_a_hash_slot() {
        let mut rules = HashSet::new();
        rules.insert(valid_rule());
        rules.insert(Rule {
            max_allowed_rt_ms: 100,
            ..valid_rule()
        });
        assert_eq!(rules.len(), 1);
        rules.insert(Rule {
            threshold: 0.8,
            ..valid_rule()
        });
        assert_eq!(rules.len(), 2);
    }
}
