use crate::{
    authority,
    base::SlotChain,
    circuitbreaker, flow, log,
    stat::{ClusterBuilderSlot, NodeSelectorSlot, NodeStorage, StatisticSlot},
    system,
    system_metric::SystemMetrics,
};
use std::sync::Arc;

/// The parts a slot chain is assembled from.
pub struct SlotChainParts {
    pub storage: Arc<NodeStorage>,
    pub metrics: Arc<SystemMetrics>,
    pub log_slot: Arc<log::Slot>,
    pub authority: Arc<authority::RuleManager>,
    pub system: Arc<system::RuleManager>,
    pub flow: Arc<flow::RuleManager>,
    pub circuit_breaker: Arc<circuitbreaker::RuleManager>,
}

/// build_slot_chain assembles the complete chain, the slots sort themselves by their orders:
/// node selector, cluster builder, log, statistic, authority, system, flow and circuit breaking.
pub fn build_slot_chain(parts: SlotChainParts) -> SlotChain {
    let mut sc = SlotChain::new();
    sc.add_slot(Arc::new(NodeSelectorSlot::new(Arc::clone(&parts.storage)))); // 1000
    sc.add_slot(Arc::new(ClusterBuilderSlot::new(Arc::clone(&parts.storage)))); // 2000
    sc.add_slot(parts.log_slot); // 3000
    sc.add_slot(Arc::new(StatisticSlot::new(Arc::clone(&parts.storage)))); // 4000
    sc.add_slot(Arc::new(authority::Slot::new(parts.authority))); // 5000
    sc.add_slot(Arc::new(system::AdaptiveSlot::new(
        parts.system,
        parts.storage,
        parts.metrics,
    ))); // 6000
    sc.add_slot(Arc::new(flow::Slot::new(parts.flow))); // 7000
    sc.add_slot(Arc::new(circuitbreaker::Slot::new(parts.circuit_breaker))); // 8000
    sc
}
