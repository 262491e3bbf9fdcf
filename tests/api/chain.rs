use super::new_sentinel;
use sentinel_guard::{
    base::{
        BaseSlot, BlockError, BlockType, ConcurrencyStat, ContextPtr, EntryOutcome, MetricEvent,
        ProcessorSlot, ReadStat, SlotChain, SlotCursor, TrafficType,
    },
    build_slot_chain,
    log, system, SlotChainParts,
};
use std::sync::{Arc, Mutex};

type Trace = Arc<Mutex<Vec<String>>>;

/// Records the entries and exits, and blocks when asked to.
struct TraceSlot {
    order: u32,
    block: bool,
    trace: Trace,
}

impl BaseSlot for TraceSlot {
    fn order(&self) -> u32 {
        self.order
    }
}

impl ProcessorSlot for TraceSlot {
    fn entry(&self, ctx: &ContextPtr, next: SlotCursor<'_>) -> Result<(), BlockError> {
        self.trace
            .lock()
            .unwrap()
            .push(format!("entry:{}", self.order));
        if self.block {
            return Err(BlockError::new(BlockType::Other(1)));
        }
        next.fire_entry(ctx)
    }

    fn exit(&self, ctx: &ContextPtr, next: SlotCursor<'_>) {
        self.trace.lock().unwrap().push(format!("exit:{}", self.order));
        next.fire_exit(ctx)
    }
}

fn traced_chain(block_at: Option<u32>) -> (Arc<SlotChain>, Trace) {
    let sentinel = new_sentinel();
    let trace = Trace::default();
    let mut sc = build_slot_chain(SlotChainParts {
        storage: Arc::clone(sentinel.storage()),
        metrics: Arc::clone(sentinel.system_metrics()),
        log_slot: Arc::new(log::Slot::new()),
        authority: Arc::clone(sentinel.authority()),
        system: Arc::clone(sentinel.system()),
        flow: Arc::clone(sentinel.flow()),
        circuit_breaker: Arc::clone(sentinel.circuit_breaker()),
    });
    for order in &[1500, 4500, 9000] {
        sc.add_slot(Arc::new(TraceSlot {
            order: *order,
            block: block_at == Some(*order),
            trace: Arc::clone(&trace),
        }));
    }
    (Arc::new(sc), trace)
}

#[test]
fn exit_mirrors_entry() {
    for block_at in &[None, Some(1500), Some(4500), Some(9000)] {
        let (sc, trace) = traced_chain(*block_at);
        let sentinel = new_sentinel();
        let res = sentinel
            .entry_builder("chain_symmetry_test")
            .with_slot_chain(sc)
            .build();
        match res {
            Ok(entry) => entry.exit(),
            Err(err) => assert_eq!(err.block_type(), BlockType::Other(1)),
        }
        let trace = trace.lock().unwrap();
        let entered: Vec<String> = trace
            .iter()
            .filter_map(|t| t.strip_prefix("entry:").map(String::from))
            .collect();
        let exited: Vec<String> = trace
            .iter()
            .filter_map(|t| t.strip_prefix("exit:").map(String::from))
            .collect();
        assert_eq!(entered, exited, "block at {:?}", block_at);
    }
}

#[test]
fn statistics_of_entries() {
    let sentinel = new_sentinel();
    for _ in 0..3 {
        let entry = sentinel
            .entry_builder("chain_stat_test")
            .with_traffic_type(TrafficType::Inbound)
            .build()
            .unwrap();
        assert_eq!(entry.outcome(), EntryOutcome::Success);
        entry.exit();
    }
    let node = sentinel
        .storage()
        .get_resource_node("chain_stat_test")
        .unwrap();
    assert_eq!(node.sum(MetricEvent::Pass), 3);
    assert_eq!(node.sum(MetricEvent::Complete), 3);
    assert_eq!(node.current_concurrency(), 0);
}

#[test]
fn system_rules_guard_inbound_only() {
    let sentinel = new_sentinel();
    sentinel.system().load_rules(vec![Arc::new(system::Rule {
        metric_type: system::MetricType::Concurrency,
        threshold: 1.0,
        ..Default::default()
    })]);
    let outer = sentinel
        .entry_builder("system_outer_test")
        .with_traffic_type(TrafficType::Inbound)
        .build()
        .unwrap();
    let err = sentinel
        .entry_builder("system_inner_test")
        .with_traffic_type(TrafficType::Inbound)
        .build()
        .unwrap_err();
    assert_eq!(err.block_type(), BlockType::SystemFlow);
    // outbound traffic is not checked
    sentinel
        .entry_builder("system_inner_test")
        .with_traffic_type(TrafficType::Outbound)
        .build()
        .unwrap()
        .exit();
    outer.exit();
    assert!(sentinel.blocked_count() >= 1);
}
