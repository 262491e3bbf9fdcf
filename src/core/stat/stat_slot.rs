use super::NodeStorage;
use crate::{
    base::{
        BaseSlot, BlockError, ContextPtr, MetricEvent, ProcessorSlot, SlotCursor, StatNode,
        TrafficType,
    },
    utils::curr_time_millis,
};
use std::sync::Arc;

pub const STAT_SLOT_ORDER: u32 = 4000;

/// StatisticSlot records the outcome of the calls.
/// On entry it lets the rule checking slots run first and records pass or block afterwards,
/// on exit it records the completion of the passed calls.
pub struct StatisticSlot {
    storage: Arc<NodeStorage>,
}

impl StatisticSlot {
    pub fn new(storage: Arc<NodeStorage>) -> Self {
        StatisticSlot { storage }
    }

    fn nodes_of(&self, ctx: &ContextPtr) -> Vec<Arc<dyn StatNode>> {
        let ctx = ctx.read().unwrap();
        let mut nodes = Vec::with_capacity(3);
        if let Some(stat_node) = ctx.stat_node() {
            nodes.push(stat_node);
        }
        if let Some(origin_node) = ctx.origin_node() {
            nodes.push(origin_node);
        }
        if *ctx.resource().traffic_type() == TrafficType::Inbound {
            nodes.push(self.storage.inbound_node());
        }
        nodes
    }

    fn record_pass_for(node: &Arc<dyn StatNode>, count: u32) {
        node.increase_concurrency();
        node.add_count(MetricEvent::Pass, count as u64);
    }

    fn record_block_for(node: &Arc<dyn StatNode>, count: u32) {
        node.add_count(MetricEvent::Block, count as u64)
    }

    fn record_complete_for(node: &Arc<dyn StatNode>, count: u32, round_trip: u64, has_err: bool) {
        node.add_count(MetricEvent::Rt, round_trip);
        node.add_count(MetricEvent::Complete, count as u64);
        if has_err {
            node.add_count(MetricEvent::Error, count as u64);
        }
        node.decrease_concurrency();
    }
}

impl BaseSlot for StatisticSlot {
    fn order(&self) -> u32 {
        STAT_SLOT_ORDER
    }
}

impl ProcessorSlot for StatisticSlot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        let res = next.fire_entry(ctx);
        let batch_count = ctx.read().unwrap().input().batch_count();
        let nodes = self.nodes_of(ctx);
        match &res {
            Ok(_) => nodes
                .iter()
                .for_each(|node| Self::record_pass_for(node, batch_count)),
            Err(_) => nodes
                .iter()
                .for_each(|node| Self::record_block_for(node, batch_count)),
        }
        #[cfg(feature = "exporter")]
        crate::exporter::add_handled_counter(
            batch_count,
            ctx.read().unwrap().resource().name(),
            res.is_ok(),
        );
        res
    }

    fn exit(&self, ctx: &ContextPtr, next: SlotCursor<'_>) {
        let blocked = ctx.read().unwrap().is_blocked();
        if !blocked {
            let (batch_count, round_trip, has_err) = {
                let mut ctx = ctx.write().unwrap();
                ctx.set_complete_time(curr_time_millis());
                let round_trip = ctx.response_time();
                ctx.set_round_trip(round_trip);
                (
                    ctx.input().batch_count(),
                    round_trip,
                    ctx.get_err().is_some(),
                )
            };
            for node in self.nodes_of(ctx) {
                Self::record_complete_for(&node, batch_count, round_trip, has_err);
            }
        }
        next.fire_exit(ctx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{
        BlockType, ConcurrencyStat, EntryContext, ReadStat, ResourceType, ResourceWrapper,
        SlotChain,
    };
    use crate::config::StatConfig;
    use crate::stat::NodeSelectorSlot;
    use crate::Error;
    use std::sync::RwLock;

    struct BlockSlot;
    impl BaseSlot for BlockSlot {
        fn order(&self) -> u32 {
            STAT_SLOT_ORDER + 1
        }
    }
    impl ProcessorSlot for BlockSlot {
        fn entry(&self, _ctx: &ContextPtr, _next: SlotCursor<'_>) -> Result<(), BlockError> {
            Err(BlockError::new(BlockType::Flow))
        }
    }

    fn build(storage: &Arc<NodeStorage>, block: bool) -> SlotChain {
        let mut sc = SlotChain::new();
        sc.add_slot(Arc::new(NodeSelectorSlot::new(Arc::clone(storage))));
        sc.add_slot(Arc::new(StatisticSlot::new(Arc::clone(storage))));
        if block {
            sc.add_slot(Arc::new(BlockSlot));
        }
        sc
    }

    fn new_ctx(traffic_type: TrafficType) -> ContextPtr {
        let mut ctx = EntryContext::new();
        ctx.set_resource(ResourceWrapper::new(
            "abc".into(),
            ResourceType::Common,
            traffic_type,
        ));
        Arc::new(RwLock::new(ctx))
    }

    #[test]
    fn pass_and_complete() {
        let storage = Arc::new(NodeStorage::new(StatConfig::default()).unwrap());
        let sc = build(&storage, false);
        let ctx = new_ctx(TrafficType::Inbound);
        sc.entry(&ctx).unwrap();
        let node = storage.get_resource_node("abc").unwrap();
        assert_eq!(node.sum(MetricEvent::Pass), 1);
        assert_eq!(node.current_concurrency(), 1);
        assert_eq!(storage.inbound_node().sum(MetricEvent::Pass), 1);

        ctx.write().unwrap().set_err(Error::msg("biz error"));
        sc.exit(&ctx);
        assert_eq!(node.sum(MetricEvent::Complete), 1);
        assert_eq!(node.sum(MetricEvent::Error), 1);
        assert_eq!(node.current_concurrency(), 0);
        assert!(ctx.read().unwrap().complete_time().is_some());
    }

    #[test]
    fn block() {
        let storage = Arc::new(NodeStorage::new(StatConfig::default()).unwrap());
        let sc = build(&storage, true);
        let ctx = new_ctx(TrafficType::Outbound);
        assert!(sc.entry(&ctx).is_err());
        sc.exit(&ctx);
        let node = storage.get_resource_node("abc").unwrap();
        assert_eq!(node.sum(MetricEvent::Pass), 0);
        assert_eq!(node.sum(MetricEvent::Block), 1);
        assert_eq!(node.sum(MetricEvent::Complete), 0);
        assert_eq!(node.current_concurrency(), 0);
        // outbound traffic is not counted by the inbound node
        assert_eq!(storage.inbound_node().sum(MetricEvent::Block), 0);
    }
}
