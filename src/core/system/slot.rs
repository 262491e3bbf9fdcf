use super::*;
use crate::{
    base::{
        BaseSlot, BlockError, BlockType, ConcurrencyStat, ContextPtr, MetricEvent, ProcessorSlot,
        ReadStat, SlotCursor, Snapshot, TrafficType,
    },
    stat::{NodeStorage, ResourceNode},
    system_metric::SystemMetrics,
};
use std::sync::Arc;

pub const SYSTEM_SLOT_ORDER: u32 = 6000;

/// A ProcessorSlot for system adaptive protection.
/// Only the inbound traffic is checked, against the global inbound node and the system metrics.
pub struct AdaptiveSlot {
    manager: Arc<RuleManager>,
    storage: Arc<NodeStorage>,
    metrics: Arc<SystemMetrics>,
}

impl AdaptiveSlot {
    pub fn new(
        manager: Arc<RuleManager>,
        storage: Arc<NodeStorage>,
        metrics: Arc<SystemMetrics>,
    ) -> Self {
        AdaptiveSlot {
            manager,
            storage,
            metrics,
        }
    }

    /// `Err` carries the block message and the triggered value.
    fn can_pass_check(&self, rule: &Rule) -> Result<(), (&'static str, Arc<Snapshot>)> {
        let inbound = self.storage.inbound_node();
        let threshold = rule.threshold;
        match rule.metric_type {
            MetricType::InboundQPS => {
                let qps = inbound.qps(MetricEvent::Pass);
                if qps >= threshold {
                    return Err(("system qps check blocked", Arc::new(qps) as Arc<Snapshot>));
                }
            }
            MetricType::Concurrency => {
                let n = inbound.current_concurrency() as f64;
                if n >= threshold {
                    return Err(("system concurrency check blocked", Arc::new(n) as Arc<Snapshot>));
                }
            }
            MetricType::AvgRT => {
                let rt = inbound.avg_rt();
                if rt >= threshold {
                    return Err(("system avg rt check blocked", Arc::new(rt) as Arc<Snapshot>));
                }
            }
            MetricType::Load => {
                let l = self.metrics.current_load();
                if l > threshold
                    && (rule.strategy != AdaptiveStrategy::BBR || !check_bbr_simple(&inbound))
                {
                    return Err(("system load check blocked", Arc::new(l) as Arc<Snapshot>));
                }
            }
            MetricType::CpuUsage => {
                let c = self.metrics.current_cpu_usage() as f64;
                if c > threshold
                    && (rule.strategy != AdaptiveStrategy::BBR || !check_bbr_simple(&inbound))
                {
                    return Err(("system cpu usage check blocked", Arc::new(c) as Arc<Snapshot>));
                }
            }
        }
        Ok(())
    }
}

/// The concurrency is under the capacity estimated from the max completion rate and the min rt.
fn check_bbr_simple(inbound: &ResourceNode) -> bool {
    let concurrency = inbound.current_concurrency() as f64;
    let min_rt = inbound.min_rt();
    let max_complete = inbound.max_avg(MetricEvent::Complete);
    !(concurrency > 1.0 && concurrency > max_complete * min_rt / 1000.0)
}

impl BaseSlot for AdaptiveSlot {
    fn order(&self) -> u32 {
        SYSTEM_SLOT_ORDER
    }
}

impl ProcessorSlot for AdaptiveSlot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let traffic_type = *ctx.read().unwrap().resource().traffic_type();
        if traffic_type == TrafficType::Inbound {
            for rule in self.manager.get_rules() {
                if let Err((msg, snapshot)) = self.can_pass_check(&rule) {
                    return Err(BlockError::new_with_cause(
                        BlockType::SystemFlow,
                        msg.into(),
                        rule,
                        snapshot,
                    ));
                }
            }
        }
        next.fire_entry(ctx)
    }
}
