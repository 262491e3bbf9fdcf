use super::{Checker, Rule};
use crate::core::base::{BlockType, MetricEvent, ReadStat, TokenResult};
use std::sync::Arc;

pub const BLOCK_MSG_REJECT: &str = "flow reject check blocked";

/// Directly rejects the requests once the passed count within the statistic window reaches the threshold.
#[derive(Debug)]
pub struct RejectChecker {
    rule: Arc<Rule>,
    metric: Arc<dyn ReadStat>,
}

impl RejectChecker {
    pub fn new(rule: Arc<Rule>, metric: Arc<dyn ReadStat>) -> Self {
        RejectChecker { rule, metric }
    }
}

impl Checker for RejectChecker {
    fn do_check(&self, batch_count: u32, threshold: f64) -> TokenResult {
        let cur_count = self.metric.sum(MetricEvent::Pass) as f64;
        if cur_count + batch_count as f64 > threshold {
            TokenResult::new_blocked_with_cause(
                BlockType::Flow,
                BLOCK_MSG_REJECT.into(),
                self.rule.clone(),
                Arc::new(cur_count),
            )
        } else {
            TokenResult::new_pass()
        }
    }
}
